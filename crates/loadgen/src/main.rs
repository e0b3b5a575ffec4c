// Rust guideline compliant 2026-07-20

//! Load-generator entry point.
//!
//! Parses the sectioned command line, then hands the validated configuration
//! to the orchestrator. Validation failures print one `ERROR: ...` line and
//! exit 1 before any server contact.
//!
//! # Usage
//!
//! ```text
//! # One insert workload, sweeping thread counts
//! manticore-load --drop \
//!   --init "CREATE TABLE t(id bigint, name text)" \
//!   --threads=1,4,8 --batch-size=1000 --total=1000000 \
//!   --load "INSERT INTO t VALUES(<increment>,'<text/10/100>')"
//!
//! # A writer and a reader in parallel
//! manticore-load --quiet \
//!   --load "INSERT INTO t VALUES(<increment>,'<text/10/100>')" --together \
//!   --load "SELECT * FROM t WHERE MATCH('<text/1/2>')"
//! ```

mod adapters;
mod cli;
mod orchestrator;
mod progress;
mod runner;

use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize the log facade before any async work.
    env_logger::init();

    let config = match cli::parse(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };
    orchestrator::run(config).await
}
