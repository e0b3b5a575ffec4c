// Rust guideline compliant 2026-07-20

//! Orchestrator -- spawns one task per workload, wires the start gate and
//! the interrupt handler, and drives the combined live progress until every
//! workload finishes.

use std::io::IsTerminal as _;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use domain::{StartGate, StopFlag};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::adapters::mysql_link::MysqlConnector;
use crate::cli::Config;
use crate::progress::Aggregator;
use crate::runner::{RunOptions, WorkloadRunner};

/// Run every configured workload to completion.
///
/// Exit code 0 when all workloads finished (or accepted a stop request);
/// 1 when any workload failed or panicked.
pub async fn run(config: Config) -> ExitCode {
    let stop = StopFlag::new();
    let gate = Arc::new(StartGate::new(config.workloads.len(), stop.clone()));
    let connector = MysqlConnector::new(&config.host, config.port);
    let options = RunOptions {
        verbose: config.verbose,
        quiet: config.quiet,
        json: config.json,
        wait: config.wait,
        latency_histograms: config.latency_histograms,
    };

    // Interrupt -> stop flag; every phase polls it at >= 1 Hz.
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("orchestrator.interrupt: stop requested");
                stop.set();
            }
        });
    }

    let mut tasks = JoinSet::new();
    let mut receivers = Vec::with_capacity(config.workloads.len());
    for (index, spec) in config.workloads.iter().enumerate() {
        let (tx, rx) = watch::channel(None);
        receivers.push(rx);
        let runner = WorkloadRunner::new(
            spec.clone(),
            index,
            connector.clone(),
            options,
            stop.clone(),
            Arc::clone(&gate),
            tx,
        );
        tasks.spawn(async move { (index, runner.run().await) });
    }

    let color = !config.no_color && std::io::stdout().is_terminal();
    let show_progress = !config.quiet;
    let mut aggregator = Aggregator::new(receivers, color);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut failed = false;
    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                None => break,
                Some(Ok((index, Ok(())))) => {
                    log::info!("orchestrator.workload.done: workload={index}");
                }
                Some(Ok((index, Err(e)))) => {
                    failed = true;
                    eprintln!("ERROR: workload {} failed: {e}", index + 1);
                }
                Some(Err(e)) => {
                    failed = true;
                    log::error!("orchestrator.workload.panicked: error={e}");
                }
            },
            _ = ticker.tick() => {
                if show_progress {
                    aggregator.tick();
                }
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
