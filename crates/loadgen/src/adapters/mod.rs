// Rust guideline compliant 2026-07-20

//! Adapters (secondary ports) for the load-generator binary.
//!
//! Each sub-module implements one of the hexagonal port traits defined in
//! the `domain` crate, or wraps an on-disk resource. Adapters are
//! intentionally isolated from generation and dispatch logic.

pub mod mysql_link;
pub mod progress_file;
