// Rust guideline compliant 2026-07-20

//! Per-workload progress file: append-only JSON lines, removed on exit.
//!
//! The orchestrator consumes snapshots over the in-process watch channel;
//! the file exists so external tooling can tail the latest line of a running
//! load. Readers must only trust complete, newline-terminated lines.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use domain::ProgressSnapshot;
use rand::Rng as _;

/// Append-only progress file under the system temp directory, named
/// `manticore_load_progress_<pid>_<hex8>`. The file is removed when the
/// writer is dropped, including on error and interrupt paths.
#[derive(Debug)]
pub struct ProgressFile {
    path: PathBuf,
    file: std::fs::File,
}

impl ProgressFile {
    /// Create the progress file for this process in the system temp dir.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file cannot be created.
    pub fn create() -> std::io::Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    /// Create the progress file under `dir` (tests).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file cannot be created.
    pub fn create_in(dir: &Path) -> std::io::Result<Self> {
        let suffix: u32 = rand::rng().random();
        let path = dir.join(format!(
            "manticore_load_progress_{}_{suffix:08x}",
            std::process::id()
        ));
        let file = std::fs::File::create(&path)?;
        Ok(Self { path, file })
    }

    /// Append one snapshot as a JSON line and flush it, so a concurrent
    /// reader only ever sees whole lines plus at most one partial tail.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error on write failure.
    pub fn append(&mut self, snapshot: &ProgressSnapshot) -> std::io::Result<()> {
        let line = serde_json::to_string(snapshot).map_err(std::io::Error::other)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()
    }

    /// Where the file lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProgressFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("progress_file.cleanup.failed: path={} error={e}", self.path.display());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
