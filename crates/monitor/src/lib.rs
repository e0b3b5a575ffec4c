// Rust guideline compliant 2026-07-20

//! Monitoring probe: server table status, disk-growth rate, host CPU usage.
//!
//! Entry point: [`StatusProbe`]. The probe owns its own [`ServerLink`] so
//! status queries never interleave with load statements on a pooled
//! connection. Unknown or missing status fields degrade to zeros.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use domain::{LinkError, ServerLink};

/// Sliding window length for the disk-growth rate.
const GROWTH_WINDOW: Duration = Duration::from_secs(5);

/// Minimum interval between two `/proc/stat` reads.
const CPU_MIN_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// TableStatus
// ---------------------------------------------------------------------------

/// Decoded `SHOW TABLE <name> STATUS` figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStatus {
    /// `disk_chunks` field.
    pub disk_chunks: u64,
    /// `optimizing` field, non-zero while an optimize runs.
    pub optimizing: bool,
    /// `disk_bytes` field.
    pub disk_bytes: u64,
    /// `ram_bytes` field.
    pub ram_bytes: u64,
    /// `indexed_documents` field.
    pub indexed_documents: u64,
}

impl TableStatus {
    /// Decode a key/value status table. Fields the server does not report
    /// stay zero.
    #[must_use]
    pub fn from_key_values(rows: &[(String, String)]) -> Self {
        let mut status = Self::default();
        for (key, value) in rows {
            let number = value.parse::<u64>().unwrap_or(0);
            match key.as_str() {
                "disk_chunks" => status.disk_chunks = number,
                "optimizing" => status.optimizing = number != 0,
                "disk_bytes" => status.disk_bytes = number,
                "ram_bytes" => status.ram_bytes = number,
                "indexed_documents" => status.indexed_documents = number,
                _ => {}
            }
        }
        status
    }
}

// ---------------------------------------------------------------------------
// DiskGrowth
// ---------------------------------------------------------------------------

/// `(timestamp, disk_bytes)` samples within a sliding window; the growth
/// rate is (latest - earliest) / window seconds.
#[derive(Debug, Default)]
pub struct DiskGrowth {
    window: VecDeque<(Instant, u64)>,
}

impl DiskGrowth {
    /// Record the current table size.
    pub fn record(&mut self, disk_bytes: u64) {
        self.record_at(Instant::now(), disk_bytes);
    }

    fn record_at(&mut self, at: Instant, disk_bytes: u64) {
        self.window.push_back((at, disk_bytes));
        while let Some(&(t, _)) = self.window.front() {
            if at.duration_since(t) > GROWTH_WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Bytes per second over the window; 0 until two samples exist.
    #[must_use]
    pub fn rate(&self) -> f64 {
        let (Some(&(t0, b0)), Some(&(t1, b1))) = (self.window.front(), self.window.back()) else {
            return 0.0;
        };
        let secs = t1.duration_since(t0).as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (b1.saturating_sub(b0)) as f64 / secs
    }
}

// ---------------------------------------------------------------------------
// CpuMeter
// ---------------------------------------------------------------------------

/// Host CPU utilisation from `/proc/stat` deltas.
///
/// Reads at most once per [`CPU_MIN_INTERVAL`]; between reads the previous
/// figure is repeated. Hosts without `/proc/stat` always report `None`.
#[derive(Debug, Default)]
pub struct CpuMeter {
    last_read: Option<(Instant, CpuTimes)>,
    last_value: Option<f64>,
}

/// One `/proc/stat` aggregate sample: (non-idle jiffies, total jiffies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

impl CpuMeter {
    /// Create a meter with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current utilisation percentage, or `None` when unavailable.
    pub fn sample(&mut self) -> Option<f64> {
        let now = Instant::now();
        if let Some((at, prev)) = self.last_read {
            if now.duration_since(at) < CPU_MIN_INTERVAL {
                return self.last_value;
            }
            let cur = read_cpu_times()?;
            self.last_read = Some((now, cur));
            self.last_value = utilization(prev, cur).or(self.last_value);
            self.last_value
        } else {
            // First call only seeds the baseline.
            self.last_read = Some((now, read_cpu_times()?));
            None
        }
    }
}

/// Delta of non-idle over total between two samples, as a percentage.
fn utilization(prev: CpuTimes, cur: CpuTimes) -> Option<f64> {
    let total = cur.total.checked_sub(prev.total)?;
    if total == 0 {
        return None;
    }
    let busy = cur.busy.saturating_sub(prev.busy);
    Some(busy as f64 / total as f64 * 100.0)
}

#[cfg(target_os = "linux")]
fn read_cpu_times() -> Option<CpuTimes> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    let line = stat.lines().next()?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 5 {
        return None;
    }
    let total: u64 = fields.iter().take(8).sum();
    // idle + iowait count as idle time.
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total - idle,
        total,
    })
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_times() -> Option<CpuTimes> {
    None
}

// ---------------------------------------------------------------------------
// StatusProbe
// ---------------------------------------------------------------------------

/// Periodic server status sampler over a dedicated connection.
///
/// The probe only reads; rate derivations (disk growth) belong to whoever
/// aggregates the samples, combined across workloads.
#[derive(Debug)]
pub struct StatusProbe<L: ServerLink> {
    link: L,
    table: Option<String>,
}

impl<L: ServerLink> StatusProbe<L> {
    /// Probe `table` (when known) over `link`.
    #[must_use]
    pub fn new(link: L, table: Option<String>) -> Self {
        Self { link, table }
    }

    /// Fetch the current table status.
    ///
    /// Degrades to zeros when no table is known or the query fails; a load
    /// run must never die because monitoring hiccuped.
    pub async fn sample(&mut self) -> TableStatus {
        let Some(table) = self.table.clone() else {
            return TableStatus::default();
        };
        match self
            .link
            .key_values(&format!("SHOW TABLE {table} STATUS"))
            .await
        {
            Ok(rows) => TableStatus::from_key_values(&rows),
            Err(e) => {
                log::debug!("probe.status.failed: table={table} error={e}");
                TableStatus::default()
            }
        }
    }

    /// Server worker thread count via `SHOW THREADS`; 0 on failure.
    pub async fn server_threads(&mut self) -> u32 {
        match self.link.key_values("SHOW THREADS").await {
            Ok(rows) => rows.len() as u32,
            Err(e) => {
                log::debug!("probe.threads.failed: error={e}");
                0
            }
        }
    }

    /// Table under observation, when known.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Release the probe connection.
    ///
    /// # Errors
    ///
    /// Propagates the link's close error for logging.
    pub async fn close(self) -> Result<(), LinkError> {
        self.link.close().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{CpuTimes, DiskGrowth, StatusProbe, TableStatus, utilization};
    use domain::{LinkError, ServerLink};
    use std::time::{Duration, Instant};

    fn kv(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    // MN-T01: all known fields decode; unknown keys are ignored.
    #[test]
    fn status_decodes() {
        let status = TableStatus::from_key_values(&kv(&[
            ("indexed_documents", "123"),
            ("disk_bytes", "4096"),
            ("ram_bytes", "512"),
            ("disk_chunks", "3"),
            ("optimizing", "1"),
            ("query_time_1min", "{}"),
        ]));
        assert_eq!(status.indexed_documents, 123);
        assert_eq!(status.disk_bytes, 4096);
        assert_eq!(status.ram_bytes, 512);
        assert_eq!(status.disk_chunks, 3);
        assert!(status.optimizing);
    }

    // MN-T02: missing or renamed fields silently degrade to zeros.
    #[test]
    fn status_missing_fields_zero() {
        let status = TableStatus::from_key_values(&kv(&[("disc_bytes", "4096")]));
        assert_eq!(status, TableStatus::default());
    }

    // MN-T03: growth rate is (latest - earliest) / window seconds, and the
    // window discards samples older than 5 s.
    #[test]
    fn growth_rate_window() {
        let mut g = DiskGrowth::default();
        let t0 = Instant::now();
        g.record_at(t0, 1_000);
        g.record_at(t0 + Duration::from_secs(2), 5_000);
        assert!((g.rate() - 2_000.0).abs() < 1e-9);

        // A sample 6 s in pushes the first one out of the 5 s window.
        g.record_at(t0 + Duration::from_secs(6), 9_000);
        assert!((g.rate() - 1_000.0).abs() < 1e-9, "rate {}", g.rate());
    }

    // MN-T04: fewer than two samples (or zero elapsed) report 0.
    #[test]
    fn growth_rate_degenerate() {
        let mut g = DiskGrowth::default();
        assert_eq!(g.rate(), 0.0);
        g.record_at(Instant::now(), 42);
        assert_eq!(g.rate(), 0.0);
    }

    // MN-T05: utilisation is the busy share of the total delta.
    #[test]
    fn cpu_utilization_delta() {
        let prev = CpuTimes {
            busy: 100,
            total: 1_000,
        };
        let cur = CpuTimes {
            busy: 150,
            total: 1_100,
        };
        assert_eq!(utilization(prev, cur), Some(50.0));
        // No elapsed jiffies: no figure rather than a division by zero.
        assert_eq!(utilization(cur, cur), None);
    }

    // ------------------------------------------------------------------
    // Probe against a fake link
    // ------------------------------------------------------------------

    struct FakeLink {
        fail: bool,
    }

    impl ServerLink for FakeLink {
        async fn execute(&mut self, _statement: &str) -> Result<u64, LinkError> {
            Ok(0)
        }

        async fn key_values(&mut self, statement: &str) -> Result<Vec<(String, String)>, LinkError> {
            if self.fail {
                return Err(LinkError::Query {
                    message: "gone".to_owned(),
                });
            }
            if statement.starts_with("SHOW TABLE") {
                Ok(vec![
                    ("indexed_documents".to_owned(), "7".to_owned()),
                    ("disk_bytes".to_owned(), "100".to_owned()),
                ])
            } else {
                Ok(vec![
                    ("1".to_owned(), "query".to_owned()),
                    ("2".to_owned(), "query".to_owned()),
                ])
            }
        }

        async fn close(self) -> Result<(), LinkError> {
            Ok(())
        }
    }

    // MN-T06: a healthy probe decodes status and counts server threads.
    #[tokio::test]
    async fn probe_samples() {
        let mut probe = StatusProbe::new(FakeLink { fail: false }, Some("t".to_owned()));
        let status = probe.sample().await;
        assert_eq!(status.indexed_documents, 7);
        assert_eq!(status.disk_bytes, 100);
        assert_eq!(probe.server_threads().await, 2);
        probe.close().await.unwrap();
    }

    // MN-T07: probe failures and unknown tables degrade to zeros.
    #[tokio::test]
    async fn probe_degrades() {
        let mut probe = StatusProbe::new(FakeLink { fail: true }, Some("t".to_owned()));
        assert_eq!(probe.sample().await, TableStatus::default());
        assert_eq!(probe.server_threads().await, 0);

        let mut probe = StatusProbe::new(FakeLink { fail: false }, None);
        assert_eq!(probe.sample().await, TableStatus::default());
    }
}
