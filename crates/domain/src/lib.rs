// Rust guideline compliant 2026-07-20

//! Shared domain types for the load-generation pipeline.
//!
//! Defines [`WorkloadSpec`], the hexagonal ports ([`ServerLink`],
//! [`Connector`], [`TickSink`]), the inter-workload coordination primitives
//! ([`StopFlag`], [`StartGate`]), and [`ProgressSnapshot`]. All pipeline
//! crates depend on this crate; no other workspace crate is imported here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Barrier;

// ---------------------------------------------------------------------------
// WorkloadSpec
// ---------------------------------------------------------------------------

/// One independent load specification, as produced by CLI validation.
///
/// `threads` and `batch_size` are lists: the workload runner iterates their
/// Cartesian product (outer threads, inner batch size). Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSpec {
    /// Connection-pool sizes to sweep.
    pub threads: Vec<u32>,
    /// Batch sizes to sweep (rows per statement for insert-like templates).
    pub batch_size: Vec<u32>,
    /// Number of template expansions (rows) to generate per combination.
    pub total: u64,
    /// How many times the generated statement sequence is replayed.
    pub iterations: u32,
    /// One or more parametric SQL templates.
    pub load_templates: Vec<String>,
    /// Per-template selection weights; normalized by the generator.
    /// Empty means an even split.
    pub load_distribution: Vec<f64>,
    /// Semicolon-separated statements executed before the load phase.
    pub init_commands: Option<String>,
    /// Drop the target table (and its data directory if needed) first.
    pub drop: bool,
    /// Minimum wall-clock spacing between two submissions on one connection.
    pub delay: Duration,
    /// Optional `(name, value)` column prepended to quiet/JSON reports.
    pub column: Option<(String, String)>,
}

impl WorkloadSpec {
    /// A spec driving `total` expansions of a single template with one
    /// connection and no batching. Sweep lists and flags use their defaults.
    #[must_use]
    pub fn single(template: &str, total: u64) -> Self {
        Self {
            threads: vec![1],
            batch_size: vec![1],
            total,
            iterations: 1,
            load_templates: vec![template.to_owned()],
            load_distribution: vec![],
            init_commands: None,
            drop: false,
            delay: Duration::ZERO,
            column: None,
        }
    }

    /// True when the first template starts with `insert` or `replace`
    /// (case-insensitive) -- such workloads are batch-compatible and report
    /// document counts.
    #[must_use]
    pub fn insert_mode(&self) -> bool {
        self.load_templates.first().is_some_and(|t| {
            let keyword: String = t
                .trim_start()
                .chars()
                .take_while(char::is_ascii_alphabetic)
                .collect();
            keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace")
        })
    }
}

// ---------------------------------------------------------------------------
// LinkError + server ports
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`ServerLink`] or [`Connector`] implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    /// The connection could not be established. Fatal to the workload.
    #[error("connect failed: {message}")]
    Connect {
        /// Server or transport diagnostic.
        message: String,
    },
    /// The server rejected a query. Fatal to the workload when raised
    /// outside the init phase.
    #[error("query failed: {message}")]
    Query {
        /// The server's error message, verbatim.
        message: String,
    },
}

/// Hexagonal port: one persistent connection to the target server.
///
/// Implementations live outside the pipeline crates (the binary provides a
/// MySQL-wire adapter; tests provide fakes). One statement is in flight per
/// link at a time; the dispatcher enforces sequential submission per link.
pub trait ServerLink: Send {
    /// Submit `statement` and wait for the reply. Returns rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Query`] with the server's message on rejection.
    fn execute(
        &mut self,
        statement: &str,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<u64, LinkError>> + Send + '_>>;

    /// Run a status-style query returning one `(first column, last column)`
    /// pair per row: key/value for `SHOW TABLE ... STATUS` and
    /// `SHOW SETTINGS`, level/message for `SHOW WARNINGS`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Query`] on rejection.
    fn key_values(
        &mut self,
        statement: &str,
    ) -> std::pin::Pin<
        Box<dyn Future<Output = Result<Vec<(String, String)>, LinkError>> + Send + '_>,
    >;

    /// Close the connection. Best effort; errors are for logging only.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Query`] if the server-side close fails.
    fn close(self) -> impl Future<Output = Result<(), LinkError>> + Send;
}

/// Hexagonal port: factory for [`ServerLink`]s against one endpoint.
pub trait Connector {
    /// The connection type produced by this connector.
    type Link: ServerLink;

    /// Open one persistent connection.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Connect`] when the endpoint is unreachable.
    fn connect(&self) -> impl Future<Output = Result<Self::Link, LinkError>> + Send;
}

// ---------------------------------------------------------------------------
// Dispatch tick port
// ---------------------------------------------------------------------------

/// Per-second progress data handed from the dispatch loop to its observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInfo {
    /// Statements reaped so far.
    pub completed_statements: u64,
    /// Statements in the full sequence.
    pub total_statements: u64,
    /// Rows (documents) covered by the reaped statements.
    pub completed_rows: u64,
    /// Statements reaped during the last full second.
    pub qps_last_second: u64,
    /// Wall time since the dispatch loop started.
    pub elapsed: Duration,
}

/// Hexagonal port: receives one [`TickInfo`] per second of dispatching.
///
/// The workload runner's implementation probes server status, publishes a
/// [`ProgressSnapshot`], and appends the progress-file line.
pub trait TickSink {
    /// Observe one progress tick. Must not block longer than a tick.
    fn tick(&mut self, info: &TickInfo) -> impl Future<Output = ()> + Send;
}

/// Sink that discards all ticks.
#[derive(Debug, Default)]
pub struct NullTickSink;

impl TickSink for NullTickSink {
    async fn tick(&mut self, _info: &TickInfo) {}
}

// ---------------------------------------------------------------------------
// StopFlag
// ---------------------------------------------------------------------------

/// Shared cancellation flag, set once on interrupt and polled by every phase.
///
/// Readers may race the setter; visibility within about a second is
/// sufficient, so relaxed ordering is enough.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    inner: Arc<AtomicBool>,
}

impl StopFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn set(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    /// True once cancellation has been requested.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// StartGate
// ---------------------------------------------------------------------------

/// Start was aborted: another workload failed (or an interrupt arrived)
/// before all workloads were ready.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("start aborted before all workloads were ready")]
pub struct StartAborted;

/// Rendezvous that lets every workload begin timing at the same instant.
///
/// Each workload task must call [`wait`](Self::wait) exactly once, even on
/// its failure path (after setting the [`StopFlag`]); this keeps the barrier
/// count intact so no sibling deadlocks, and siblings observe the stop as
/// [`StartAborted`] when released.
#[derive(Debug)]
pub struct StartGate {
    barrier: Barrier,
    stop: StopFlag,
}

impl StartGate {
    /// Gate for `workloads` participants sharing `stop`.
    #[must_use]
    pub fn new(workloads: usize, stop: StopFlag) -> Self {
        Self {
            barrier: Barrier::new(workloads),
            stop,
        }
    }

    /// Arrive at the gate and block until every workload has arrived.
    ///
    /// # Errors
    ///
    /// Returns [`StartAborted`] when the stop flag was set before release,
    /// i.e. a sibling failed during setup or an interrupt arrived early.
    pub async fn wait(&self) -> Result<(), StartAborted> {
        self.barrier.wait().await;
        if self.stop.is_set() {
            log::info!("gate.release.aborted: stop flag set before go");
            return Err(StartAborted);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProgressSnapshot
// ---------------------------------------------------------------------------

/// One per-workload progress line, overwritten each tick.
///
/// Serialized as a JSON line into the workload's progress file and published
/// on the workload's watch channel for the orchestrator's combined display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Owning process id.
    pub pid: u32,
    /// Wall-clock time of the tick, `HH:MM:SS`.
    pub time: String,
    /// Seconds since the workload's dispatch loop started.
    pub elapsed: f64,
    /// Percentage of the statement sequence completed, `[0, 100]`.
    pub progress: f64,
    /// Statements completed during the last second.
    pub qps: u64,
    /// Rows covered during the last second (`qps x batch size` for inserts).
    pub dps: u64,
    /// Host CPU utilisation percentage; `None` when the host exposes none.
    pub cpu: Option<f64>,
    /// Server worker thread count.
    pub threads: u32,
    /// Disk chunk count of the target table.
    pub chunks: u64,
    /// True while the server reports an optimize in progress.
    pub optimizing: bool,
    /// Table size on disk, bytes.
    pub disk_bytes: u64,
    /// Table size in RAM, bytes.
    pub ram_bytes: u64,
    /// Documents the server reports as indexed.
    pub indexed_documents: u64,
    /// Target table name, when known. Lets the aggregator take the per-table
    /// maximum of `indexed_documents` instead of double-counting writers
    /// sharing a table.
    pub table: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
