// Rust guideline compliant 2026-07-20

//! Combined live progress: merges the latest per-workload snapshots into one
//! terminal line per second.

use std::collections::HashMap;

use domain::ProgressSnapshot;
use monitor::{CpuMeter, DiskGrowth};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Combined figures
// ---------------------------------------------------------------------------

/// Server-wide figures folded from all workload snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combined {
    /// Server worker threads (the workloads observe one server: max).
    pub threads: u32,
    /// Sum of disk chunk counts.
    pub chunks: u64,
    /// Sum of on-disk table bytes.
    pub disk_bytes: u64,
    /// True when any workload observes an optimize in progress.
    pub optimizing: bool,
    /// Indexed documents: max per table, summed across distinct tables, so
    /// two writers sharing a table are not double-counted.
    pub indexed_documents: u64,
}

/// Fold the latest snapshot of each workload.
#[must_use]
pub fn combine(snapshots: &[(usize, ProgressSnapshot)]) -> Combined {
    let mut per_table: HashMap<String, u64> = HashMap::new();
    let mut combined = Combined {
        threads: 0,
        chunks: 0,
        disk_bytes: 0,
        optimizing: false,
        indexed_documents: 0,
    };
    for (index, snap) in snapshots {
        combined.threads = combined.threads.max(snap.threads);
        combined.chunks += snap.chunks;
        combined.disk_bytes += snap.disk_bytes;
        combined.optimizing |= snap.optimizing;
        let table = snap
            .table
            .clone()
            .unwrap_or_else(|| format!("#workload-{index}"));
        let entry = per_table.entry(table).or_insert(0);
        *entry = (*entry).max(snap.indexed_documents);
    }
    combined.indexed_documents = per_table.values().sum();
    combined
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Once-a-second combined display fed from the per-workload watch channels.
#[derive(Debug)]
pub struct Aggregator {
    receivers: Vec<watch::Receiver<Option<ProgressSnapshot>>>,
    cpu: CpuMeter,
    growth: DiskGrowth,
    color: bool,
}

impl Aggregator {
    /// Aggregator over one receiver per workload.
    #[must_use]
    pub fn new(receivers: Vec<watch::Receiver<Option<ProgressSnapshot>>>, color: bool) -> Self {
        Self {
            receivers,
            cpu: CpuMeter::new(),
            growth: DiskGrowth::default(),
            color,
        }
    }

    /// Emit one combined line, when at least one workload has reported.
    ///
    /// Workloads that produced no new snapshot keep their last known one --
    /// the watch channel holds the latest value by construction.
    pub fn tick(&mut self) {
        let snapshots: Vec<(usize, ProgressSnapshot)> = self
            .receivers
            .iter()
            .enumerate()
            .filter_map(|(i, rx)| rx.borrow().clone().map(|s| (i, s)))
            .collect();
        if snapshots.is_empty() {
            return;
        }
        let combined = combine(&snapshots);
        self.growth.record(combined.disk_bytes);
        let line = self.render(&snapshots, &combined);
        println!("{line}");
    }

    fn render(&mut self, snapshots: &[(usize, ProgressSnapshot)], combined: &Combined) -> String {
        let time = snapshots
            .iter()
            .map(|(_, s)| s.time.as_str())
            .max()
            .unwrap_or("--:--:--");
        let elapsed = snapshots
            .iter()
            .map(|(_, s)| s.elapsed)
            .fold(0.0_f64, f64::max);

        let mut parts: Vec<String> = Vec::new();
        parts.push(format!("{} {:>5.0}s", self.paint(time, "2"), elapsed));
        for (index, snap) in snapshots {
            let label = self.paint(&format!("w{index}"), "1");
            parts.push(format!(
                "{label} {:5.1}% {} qps {} dps",
                snap.progress,
                stats::fmt_number(snap.qps),
                stats::fmt_number(snap.dps),
            ));
        }
        let cpu = match self.cpu.sample() {
            Some(pct) => format!("{pct:.0}%"),
            None => "N/A".to_owned(),
        };
        parts.push(format!(
            "cpu {cpu} thr {} chunks {} opt {} rate {}/s disk {} docs {}",
            combined.threads,
            combined.chunks,
            u8::from(combined.optimizing),
            format_bytes(self.growth.rate() as u64),
            format_bytes(combined.disk_bytes),
            stats::fmt_number(combined.indexed_documents),
        ));
        parts.join(" | ")
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_owned()
        }
    }
}

/// Human-readable byte count (`1.2 GB`).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
