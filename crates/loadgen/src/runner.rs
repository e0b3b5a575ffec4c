// Rust guideline compliant 2026-07-20

//! Workload runner -- drives one workload spec end to end.
//!
//! Iterates the `threads x batch_size` Cartesian product; per combination:
//! drop step, init commands, query generation, start-gate rendezvous (first
//! combination only), dispatch, optional optimize-wait, final report. Emits
//! one progress snapshot per second through the watch channel and the
//! on-disk progress file.

use std::sync::Arc;
use std::time::Duration;

use domain::{
    Connector, LinkError, ProgressSnapshot, ServerLink, StartGate, StopFlag, TickInfo, TickSink,
    WorkloadSpec,
};
use dispatch::{DispatchError, Dispatcher};
use generator::{GeneratedLoad, GeneratorError, QueryGenerator};
use monitor::{CpuMeter, StatusProbe};
use stats::{LatencyTracker, RunContext, RunSummary};
use tokio::sync::watch;

use crate::adapters::progress_file::ProgressFile;

// ---------------------------------------------------------------------------
// WorkloadError
// ---------------------------------------------------------------------------

/// Errors that fail one workload. Sibling workloads are only affected when
/// the failure happens before the start gate clears.
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    /// Query generation failed (bad template, cache I/O).
    #[error("{0}")]
    Generate(#[from] GeneratorError),
    /// The dispatch phase failed (pool setup or server rejection).
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
    /// The admin connection for drop/init could not be opened.
    #[error("connect failed: {0}")]
    Connect(LinkError),
    /// The drop step failed.
    #[error("drop table failed: {message}")]
    DropTable {
        /// Server or filesystem diagnostic.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Output options
// ---------------------------------------------------------------------------

/// Reporting knobs shared by all workloads, copied out of the CLI config.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Echo init/load commands in the summary block.
    pub verbose: bool,
    /// Quiet semicolon rows instead of verbose blocks.
    pub quiet: bool,
    /// JSON objects instead of quiet rows.
    pub json: bool,
    /// Poll the server after dispatch until optimize finishes.
    pub wait: bool,
    /// Histogram latency tracking (false selects exact samples).
    pub latency_histograms: bool,
}

// ---------------------------------------------------------------------------
// WorkloadRunner
// ---------------------------------------------------------------------------

/// One workload's execution state, owned by its task.
#[derive(Debug)]
pub struct WorkloadRunner<C: Connector> {
    spec: WorkloadSpec,
    index: usize,
    connector: C,
    options: RunOptions,
    stop: StopFlag,
    gate: Arc<StartGate>,
    progress: watch::Sender<Option<ProgressSnapshot>>,
    progress_file: Option<ProgressFile>,
    gate_pending: bool,
}

impl<C: Connector> WorkloadRunner<C> {
    /// Build the runner for workload number `index`.
    #[must_use]
    pub fn new(
        spec: WorkloadSpec,
        index: usize,
        connector: C,
        options: RunOptions,
        stop: StopFlag,
        gate: Arc<StartGate>,
        progress: watch::Sender<Option<ProgressSnapshot>>,
    ) -> Self {
        Self {
            spec,
            index,
            connector,
            options,
            stop,
            gate,
            progress,
            progress_file: None,
            gate_pending: true,
        }
    }

    /// Run every `threads x batch_size` combination of this workload.
    ///
    /// A stop observed anywhere finishes cleanly with `Ok`; whatever was
    /// measured so far has already been reported per combination.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkloadError`] of a combination. Before the
    /// start gate clears this also sets the shared stop flag so sibling
    /// workloads shut down.
    pub async fn run(mut self) -> Result<(), WorkloadError> {
        self.progress_file = match ProgressFile::create() {
            Ok(file) => Some(file),
            Err(e) => {
                log::warn!("runner.progress_file.failed: error={e}");
                None
            }
        };

        for ti in 0..self.spec.threads.len() {
            for bi in 0..self.spec.batch_size.len() {
                let threads = self.spec.threads[ti];
                let batch_size = self.spec.batch_size[bi];
                if self.stop.is_set() {
                    self.arrive_if_pending().await;
                    return Ok(());
                }
                log::info!(
                    "runner.combination.start: workload={} threads={threads} batch={batch_size}",
                    self.index
                );
                match self.run_combination(threads, batch_size).await {
                    Ok(()) => {}
                    Err(e) => {
                        self.arrive_if_pending().await;
                        return Err(e);
                    }
                }
            }
        }
        self.arrive_if_pending().await;
        Ok(())
    }

    /// Arrive at the start gate once, even on failure and stop paths, so the
    /// barrier count stays intact for the siblings.
    async fn arrive_if_pending(&mut self) {
        if self.gate_pending {
            self.gate_pending = false;
            let _ = self.gate.wait().await;
        }
    }

    async fn run_combination(
        &mut self,
        threads: u32,
        batch_size: u32,
    ) -> Result<(), WorkloadError> {
        let prepared = self.prepare(batch_size).await;

        if self.gate_pending {
            self.gate_pending = false;
            if prepared.is_err() {
                // Terminate the siblings before they start timing.
                self.stop.set();
            }
            let released = self.gate.wait().await;
            if released.is_err() {
                // A sibling failed (or an interrupt arrived) during setup.
                return match prepared {
                    Err(e) => Err(e),
                    Ok(Some(p)) => {
                        self.progress_file = p.sink.shutdown().await;
                        Ok(())
                    }
                    Ok(None) => Ok(()),
                };
            }
        }

        let Some(mut prepared) = prepared? else {
            // Generation observed the stop flag; nothing to dispatch.
            return Ok(());
        };

        if self.index == 1 {
            apply_start_delay().await;
        }

        let rows_per_statement = if prepared.load.insert_mode {
            u64::from(batch_size)
        } else {
            1
        };
        let dispatcher = Dispatcher::new(
            &prepared.load.statements,
            threads,
            self.spec.delay,
            rows_per_statement,
            prepared.load.total_rows,
        );
        let dispatched = dispatcher
            .run(
                &self.connector,
                &mut prepared.latency,
                &self.stop,
                &mut prepared.sink,
            )
            .await;
        let summary = match dispatched {
            Ok(summary) => summary,
            Err(e) => {
                self.progress_file = prepared.sink.shutdown().await;
                return Err(e.into());
            }
        };

        if self.options.wait {
            wait_for_optimize(&mut prepared.sink.probe, &self.stop).await;
        }

        let report = RunSummary::compute(
            RunContext {
                threads,
                batch_size,
                insert_mode: prepared.load.insert_mode,
                // The init echo is verbose-only detail.
                init_commands: if self.options.verbose {
                    self.spec.init_commands.clone()
                } else {
                    None
                },
                load_command: self.spec.load_templates.join("; "),
                column: self.spec.column.clone(),
            },
            summary.elapsed,
            summary.completed_statements,
            summary.completed_rows,
            &summary.qps,
            &prepared.latency,
        );
        self.report(&report);
        self.progress_file = prepared.sink.shutdown().await;
        Ok(())
    }

    /// Pre-gate setup: drop step, init commands, probe, query generation,
    /// latency tracker. Returns `Ok(None)` when generation observed the
    /// stop flag.
    async fn prepare(
        &mut self,
        batch_size: u32,
    ) -> Result<Option<Prepared<C::Link>>, WorkloadError> {
        let mut admin = self
            .connector
            .connect()
            .await
            .map_err(WorkloadError::Connect)?;

        let table = self
            .spec
            .init_commands
            .as_deref()
            .and_then(generator::table_from_create)
            .or_else(|| {
                self.spec
                    .load_templates
                    .first()
                    .and_then(|t| generator::table_from_template(t))
            });

        if self.spec.drop
            && let Some(table) = &table
        {
            drop_table(&mut admin, table).await?;
        }

        if let Some(init) = &self.spec.init_commands {
            for statement in generator::split_statements(init) {
                if let Err(e) = admin.execute(&statement).await {
                    // Init failures are warnings; the load may still apply.
                    log::warn!("runner.init.failed: statement={statement} error={e}");
                    if !self.options.quiet {
                        eprintln!("WARNING: init command failed: {e}");
                    }
                }
            }
        }

        // Generation is CPU-bound and polls the stop flag itself; run it off
        // the cooperative runtime so sibling workloads and the interrupt
        // handler keep making progress.
        let generation = {
            let spec = self.spec.clone();
            let index = self.index;
            let stop = self.stop.clone();
            tokio::task::spawn_blocking(move || {
                QueryGenerator::new(&spec, index).generate(batch_size, &stop)
            })
        };
        let generated = match generation.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Runtime shutdown mid-generation: behave like a stop request.
            Err(_) => Err(GeneratorError::Interrupted),
        };
        let load = match generated {
            Ok(load) => load,
            Err(GeneratorError::Interrupted) => {
                let _ = admin.close().await;
                return Ok(None);
            }
            Err(e) => {
                let _ = admin.close().await;
                return Err(e.into());
            }
        };

        let latency = if self.options.latency_histograms {
            LatencyTracker::histogram()
        } else {
            LatencyTracker::exact()
        };
        let sink = ProgressSink {
            probe: StatusProbe::new(admin, table),
            cpu: CpuMeter::new(),
            tx: self.progress.clone(),
            file: self.progress_file.take(),
            insert_mode: load.insert_mode,
            batch_size: u64::from(batch_size),
        };
        Ok(Some(Prepared {
            load,
            latency,
            sink,
        }))
    }

    /// Write the final summary in the configured mode, in one call.
    fn report(&self, summary: &RunSummary) {
        if self.options.json {
            println!("{}", summary.render_json());
        } else if self.options.quiet {
            println!("{}", summary.quiet_block());
        } else {
            print!("{}", summary.render_verbose());
        }
    }
}

/// Everything a combination needs after the gate: the statement sequence,
/// its latency tracker, and the per-second progress sink.
#[derive(Debug)]
struct Prepared<L: ServerLink> {
    load: GeneratedLoad,
    latency: LatencyTracker,
    sink: ProgressSink<L>,
}

// ---------------------------------------------------------------------------
// Drop step
// ---------------------------------------------------------------------------

/// `DROP TABLE IF EXISTS`, plus data-directory cleanup when the server
/// warns that the directory is not empty.
async fn drop_table<L: ServerLink>(admin: &mut L, table: &str) -> Result<(), WorkloadError> {
    admin
        .execute(&format!("DROP TABLE IF EXISTS {table}"))
        .await
        .map_err(|e| WorkloadError::DropTable {
            message: e.to_string(),
        })?;

    let warnings = admin.key_values("SHOW WARNINGS").await.unwrap_or_default();
    let dir_warning = warnings
        .iter()
        .any(|(_, text)| text.contains("not empty") || text.contains("data dir"));
    if !dir_warning {
        return Ok(());
    }

    let settings = admin.key_values("SHOW SETTINGS").await.unwrap_or_default();
    let Some((_, data_dir)) = settings
        .iter()
        .find(|(key, _)| key == "searchd.data_dir")
    else {
        log::warn!("runner.drop.no_data_dir: table={table}");
        return Ok(());
    };
    let path = std::path::Path::new(data_dir).join(table);
    log::info!("runner.drop.remove_dir: path={}", path.display());
    match std::fs::remove_dir_all(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WorkloadError::DropTable {
            message: format!("cannot remove {}: {e}", path.display()),
        }),
    }
}

// ---------------------------------------------------------------------------
// Wait phase / start delay
// ---------------------------------------------------------------------------

/// Poll table status once a second until the optimize finishes or a stop is
/// requested.
async fn wait_for_optimize<L: ServerLink>(probe: &mut StatusProbe<L>, stop: &StopFlag) {
    loop {
        if stop.is_set() {
            return;
        }
        let status = probe.sample().await;
        if !status.optimizing {
            return;
        }
        log::debug!("runner.wait.optimizing: chunks={}", status.disk_chunks);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

/// Honor `PROCESS_1_DELAY`: the second workload starts this many seconds
/// after the gate releases.
async fn apply_start_delay() {
    if let Ok(value) = std::env::var("PROCESS_1_DELAY")
        && let Ok(secs) = value.parse::<f64>()
        && secs > 0.0
    {
        log::info!("runner.start_delay: seconds={secs}");
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

// ---------------------------------------------------------------------------
// ProgressSink
// ---------------------------------------------------------------------------

/// Per-second progress observer: probes server status, publishes the
/// snapshot on the watch channel, and appends the progress-file line.
#[derive(Debug)]
struct ProgressSink<L: ServerLink> {
    probe: StatusProbe<L>,
    cpu: CpuMeter,
    tx: watch::Sender<Option<ProgressSnapshot>>,
    file: Option<ProgressFile>,
    insert_mode: bool,
    batch_size: u64,
}

impl<L: ServerLink> ProgressSink<L> {
    /// Close the probe connection and hand the progress file back.
    async fn shutdown(self) -> Option<ProgressFile> {
        if let Err(e) = self.probe.close().await {
            log::warn!("runner.probe.close_failed: error={e}");
        }
        self.file
    }
}

impl<L: ServerLink> TickSink for ProgressSink<L> {
    async fn tick(&mut self, info: &TickInfo) {
        let status = self.probe.sample().await;
        let threads = self.probe.server_threads().await;
        let progress = if info.total_statements > 0 {
            info.completed_statements as f64 / info.total_statements as f64 * 100.0
        } else {
            100.0
        };
        let dps = if self.insert_mode {
            info.qps_last_second * self.batch_size
        } else {
            info.qps_last_second
        };
        let snapshot = ProgressSnapshot {
            pid: std::process::id(),
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            elapsed: info.elapsed.as_secs_f64(),
            progress,
            qps: info.qps_last_second,
            dps,
            cpu: self.cpu.sample(),
            threads,
            chunks: status.disk_chunks,
            optimizing: status.optimizing,
            disk_bytes: status.disk_bytes,
            ram_bytes: status.ram_bytes,
            indexed_documents: status.indexed_documents,
            table: self.probe.table().map(str::to_owned),
        };
        if let Some(file) = &mut self.file
            && let Err(e) = file.append(&snapshot)
        {
            log::warn!("runner.progress.append_failed: error={e}");
        }
        let _ = self.tx.send(Some(snapshot));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
