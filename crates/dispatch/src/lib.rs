// Rust guideline compliant 2026-07-20

//! Worker dispatcher -- drives a fixed pool of server connections through one
//! statement sequence, measuring per-query latency.
//!
//! Entry point: [`Dispatcher::run`]. One cooperative loop owns every
//! connection: each link carries at most one in-flight round trip, pooled in
//! a `FuturesUnordered`, so the latency tracker and counters need no locks.
//! A one-second interval drives stop-flag checks and progress ticks.

use std::time::Duration;

use domain::{Connector, LinkError, ServerLink, StopFlag, TickInfo, TickSink};
use futures::StreamExt as _;
use futures::stream::FuturesUnordered;
use stats::{LatencyTracker, QpsSamples};
use tokio::time::{Instant, MissedTickBehavior};

// ---------------------------------------------------------------------------
// DispatchError / Outcome / DispatchSummary
// ---------------------------------------------------------------------------

/// Errors that abort one workload's dispatch phase.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Opening the connection pool failed. Fatal before any timing starts.
    #[error("connection pool setup failed: {0}")]
    Connect(#[source] LinkError),
    /// The server rejected a load statement; the workload stops with the
    /// server's message. Sibling workloads are unaffected.
    #[error("server rejected statement: {0}")]
    Server(#[source] LinkError),
}

/// How the dispatch phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The statement sequence was exhausted and every reply reaped.
    Completed,
    /// The stop flag was observed; outstanding replies were drained.
    Stopped,
}

/// Figures of one finished dispatch phase.
#[derive(Debug)]
pub struct DispatchSummary {
    /// How the phase ended.
    pub outcome: Outcome,
    /// Statements submitted and reaped.
    pub completed_statements: u64,
    /// Rows covered by the reaped statements.
    pub completed_rows: u64,
    /// Wall time from first submission to last reap.
    pub elapsed: Duration,
    /// One completed-statement count per elapsed second.
    pub qps: QpsSamples,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Dispatch plan for one workload combination.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    statements: &'a [String],
    thread_count: u32,
    delay: Duration,
    /// Rows per full statement -- the batch size for insert-like workloads,
    /// 1 otherwise.
    rows_per_statement: u64,
    total_rows: u64,
}

impl<'a> Dispatcher<'a> {
    /// Plan a dispatch of `statements` over `thread_count` connections.
    #[must_use]
    pub fn new(
        statements: &'a [String],
        thread_count: u32,
        delay: Duration,
        rows_per_statement: u64,
        total_rows: u64,
    ) -> Self {
        Self {
            statements,
            thread_count: thread_count.max(1),
            delay,
            rows_per_statement: rows_per_statement.max(1),
            total_rows,
        }
    }

    /// Run the dispatch loop to completion, stop, or server error.
    ///
    /// Opens the pool, keeps one round trip in flight per connection, records
    /// one latency sample per reaped reply (the configured delay never counts
    /// toward latency), emits one [`TickInfo`] per second, and polls the stop
    /// flag at the same cadence. On stop or exhaustion every outstanding
    /// reply is drained before returning; connections are closed on all exit
    /// paths.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Connect`] when the pool cannot be opened and
    /// [`DispatchError::Server`] when the server rejects a statement.
    pub async fn run<C: Connector, S: TickSink>(
        &self,
        connector: &C,
        latency: &mut LatencyTracker,
        stop: &StopFlag,
        sink: &mut S,
    ) -> Result<DispatchSummary, DispatchError> {
        let mut pool = Vec::with_capacity(self.thread_count as usize);
        for _ in 0..self.thread_count {
            match connector.connect().await {
                Ok(link) => pool.push(link),
                Err(e) => {
                    close_all(pool).await;
                    return Err(DispatchError::Connect(e));
                }
            }
        }
        log::debug!(
            "dispatch.pool.open: connections={} statements={}",
            self.thread_count,
            self.statements.len()
        );

        let mut inflight = FuturesUnordered::new();
        let mut parked: Vec<C::Link> = Vec::new();
        let mut next = 0usize;
        let started = Instant::now();

        // Prime: one statement per connection, as far as the sequence allows.
        for link in pool {
            if next < self.statements.len() {
                inflight.push(round_trip(link, self.statements[next].clone(), self.delay));
                next += 1;
            } else {
                parked.push(link);
            }
        }

        let mut qps = QpsSamples::new();
        let mut completed = 0u64;
        let mut last_second = 0u64;
        let mut stopped = false;
        let mut ticker =
            tokio::time::interval_at(started + Duration::from_secs(1), Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !inflight.is_empty() {
            tokio::select! {
                done = inflight.next() => {
                    let Some((link, result)) = done else { break };
                    match result {
                        Err(e) => {
                            log::error!("dispatch.query.failed: error={e}");
                            let _ = link.close().await;
                            // Reap everything still in flight, then bail.
                            while let Some((link, _)) = inflight.next().await {
                                let _ = link.close().await;
                            }
                            close_all(parked).await;
                            return Err(DispatchError::Server(e));
                        }
                        Ok(latency_ms) => {
                            latency.add(latency_ms);
                            completed += 1;
                            last_second += 1;
                            if !stopped && next < self.statements.len() {
                                inflight.push(round_trip(
                                    link,
                                    self.statements[next].clone(),
                                    self.delay,
                                ));
                                next += 1;
                            } else {
                                parked.push(link);
                            }
                        }
                    }
                }
                _ = ticker.tick() => {
                    qps.add(last_second);
                    sink.tick(&self.tick_info(completed, last_second, started)).await;
                    last_second = 0;
                    if stop.is_set() && !stopped {
                        log::info!("dispatch.stop.observed: draining in-flight replies");
                        stopped = true;
                    }
                }
            }
        }

        let elapsed = started.elapsed();
        if last_second > 0 {
            // Final partial second still contributes a sample.
            qps.add(last_second);
        }
        sink.tick(&self.tick_info(completed, last_second, started)).await;
        close_all(parked).await;

        log::info!(
            "dispatch.done: outcome={:?} completed={completed} elapsed={:.2}s",
            if stopped { Outcome::Stopped } else { Outcome::Completed },
            elapsed.as_secs_f64()
        );
        Ok(DispatchSummary {
            outcome: if stopped {
                Outcome::Stopped
            } else {
                Outcome::Completed
            },
            completed_statements: completed,
            completed_rows: self.rows_done(completed),
            elapsed,
            qps,
        })
    }

    fn tick_info(&self, completed: u64, last_second: u64, started: Instant) -> TickInfo {
        TickInfo {
            completed_statements: completed,
            total_statements: self.statements.len() as u64,
            completed_rows: self.rows_done(completed),
            qps_last_second: last_second,
            elapsed: started.elapsed(),
        }
    }

    fn rows_done(&self, completed: u64) -> u64 {
        (completed * self.rows_per_statement).min(self.total_rows)
    }
}

/// One submit-and-reap cycle on one connection.
///
/// The latency clock and the pacing delay both start at submission; latency
/// is read at reply time, then the remaining delay elapses before the link
/// is handed back for reuse. This keeps wall time between two submissions on
/// one connection at or above the configured delay without inflating the
/// latency sample.
async fn round_trip<L: ServerLink>(
    mut link: L,
    statement: String,
    delay: Duration,
) -> (L, Result<f64, LinkError>) {
    let submitted = Instant::now();
    let pacing = tokio::time::sleep(delay);
    let result = link.execute(&statement).await;
    let latency_ms = submitted.elapsed().as_secs_f64() * 1000.0;
    pacing.await;
    (link, result.map(|_| latency_ms))
}

/// Close a set of links, logging failures.
async fn close_all<L: ServerLink>(links: Vec<L>) {
    for link in links {
        if let Err(e) = link.close().await {
            log::warn!("dispatch.close.failed: error={e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
