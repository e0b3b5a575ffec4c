// Rust guideline compliant 2026-07-20

//! Final summary reporter: verbose block, quiet semicolon row, JSON object.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::{LatencyTracker, QpsSamples};

/// Guards the one-per-process quiet header row.
static QUIET_HEADER_DONE: AtomicBool = AtomicBool::new(false);

// ---------------------------------------------------------------------------
// RunContext + RunSummary
// ---------------------------------------------------------------------------

/// Static facts about one finished combination, supplied by the runner.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Connection-pool size of the combination.
    pub threads: u32,
    /// Batch size of the combination.
    pub batch_size: u32,
    /// True for insert/replace workloads (enables docs columns and p1/p5).
    pub insert_mode: bool,
    /// Init commands, echoed in verbose mode.
    pub init_commands: Option<String>,
    /// Load templates joined for display.
    pub load_command: String,
    /// Optional custom `(name, value)` column for quiet/JSON rows.
    pub column: Option<(String, String)>,
}

/// Computed figures of one finished combination, ready to render.
#[derive(Debug, Clone)]
pub struct RunSummary {
    ctx: RunContext,
    elapsed: f64,
    total_statements: u64,
    total_rows: u64,
    qps_avg: f64,
    qps_p1: f64,
    qps_p5: f64,
    qps_p95: f64,
    qps_p99: f64,
    lat_avg: f64,
    lat_p50: f64,
    lat_p95: f64,
    lat_p99: f64,
}

impl RunSummary {
    /// Fold the trackers into their reportable figures.
    #[must_use]
    pub fn compute(
        ctx: RunContext,
        elapsed: Duration,
        total_statements: u64,
        total_rows: u64,
        qps: &QpsSamples,
        latency: &LatencyTracker,
    ) -> Self {
        Self {
            ctx,
            elapsed: elapsed.as_secs_f64(),
            total_statements,
            total_rows,
            qps_avg: qps.average(),
            qps_p1: qps.percentile(1.0),
            qps_p5: qps.percentile(5.0),
            qps_p95: qps.percentile(95.0),
            qps_p99: qps.percentile(99.0),
            lat_avg: latency.average(),
            lat_p50: latency.percentile(50.0),
            lat_p95: latency.percentile(95.0),
            lat_p99: latency.percentile(99.0),
        }
    }

    /// Rows per second over the whole combination.
    #[must_use]
    pub fn docs_per_sec(&self) -> f64 {
        if self.elapsed > 0.0 {
            self.total_rows as f64 / self.elapsed
        } else {
            0.0
        }
    }

    /// Multi-line verbose block. Assembled into one `String` so the caller
    /// can write it in a single call, keeping workload outputs unsheared.
    #[must_use]
    pub fn render_verbose(&self) -> String {
        let mut out = String::new();
        if let Some(init) = &self.ctx.init_commands {
            out.push_str(&format!("Init commands: {init}\n"));
        }
        out.push_str(&format!("Load command: {}\n", self.ctx.load_command));
        out.push_str(&format!("Total time: {}\n", format_time(self.elapsed)));
        if self.ctx.insert_mode {
            out.push_str(&format!("Total docs: {}\n", fmt_number(self.total_rows)));
            out.push_str(&format!(
                "Docs per sec: {}\n",
                fmt_number(self.docs_per_sec().round() as u64)
            ));
        } else {
            out.push_str(&format!(
                "Total queries: {}\n",
                fmt_number(self.total_statements)
            ));
        }
        out.push_str(&format!("Threads: {}\n", self.ctx.threads));
        out.push_str(&format!("Batch size: {}\n", self.ctx.batch_size));
        if self.ctx.insert_mode {
            out.push_str(&format!(
                "QPS: avg {}; p99 {}; p95 {}; p5 {}; p1 {}\n",
                fmt_number(self.qps_avg.round() as u64),
                fmt_number(self.qps_p99.round() as u64),
                fmt_number(self.qps_p95.round() as u64),
                fmt_number(self.qps_p5.round() as u64),
                fmt_number(self.qps_p1.round() as u64),
            ));
        } else {
            out.push_str(&format!(
                "QPS: avg {}; p99 {}; p95 {}\n",
                fmt_number(self.qps_avg.round() as u64),
                fmt_number(self.qps_p99.round() as u64),
                fmt_number(self.qps_p95.round() as u64),
            ));
        }
        out.push_str(&format!(
            "Latency (ms): avg {:.1}; p50 {:.1}; p95 {:.1}; p99 {:.1}\n",
            self.lat_avg, self.lat_p50, self.lat_p95, self.lat_p99
        ));
        out
    }

    /// Header row matching [`quiet_row`](Self::quiet_row)'s columns.
    #[must_use]
    pub fn quiet_header(&self) -> String {
        let mut cols: Vec<String> = Vec::new();
        if let Some((name, _)) = &self.ctx.column {
            cols.push(name.clone());
        }
        cols.extend(["Threads", "Batch", "Time"].map(str::to_owned));
        if self.ctx.insert_mode {
            cols.extend(["Total Docs", "Docs/Sec"].map(str::to_owned));
        }
        cols.extend(["Avg QPS", "p99 QPS", "p95 QPS"].map(str::to_owned));
        if self.ctx.insert_mode {
            cols.extend(["p5 QPS", "p1 QPS"].map(str::to_owned));
        }
        cols.extend(["Lat Avg", "Lat p50", "Lat p95", "Lat p99"].map(str::to_owned));
        cols.join("; ")
    }

    /// One semicolon-separated data row.
    #[must_use]
    pub fn quiet_row(&self) -> String {
        let mut cols: Vec<String> = Vec::new();
        if let Some((_, value)) = &self.ctx.column {
            cols.push(value.clone());
        }
        cols.push(self.ctx.threads.to_string());
        cols.push(self.ctx.batch_size.to_string());
        cols.push(format!("{:.2}", self.elapsed));
        if self.ctx.insert_mode {
            cols.push(self.total_rows.to_string());
            cols.push(format!("{:.0}", self.docs_per_sec()));
        }
        cols.push(format!("{:.0}", self.qps_avg));
        cols.push(format!("{:.0}", self.qps_p99));
        cols.push(format!("{:.0}", self.qps_p95));
        if self.ctx.insert_mode {
            cols.push(format!("{:.0}", self.qps_p5));
            cols.push(format!("{:.0}", self.qps_p1));
        }
        cols.push(format!("{:.1}", self.lat_avg));
        cols.push(format!("{:.1}", self.lat_p50));
        cols.push(format!("{:.1}", self.lat_p95));
        cols.push(format!("{:.1}", self.lat_p99));
        cols.join("; ")
    }

    /// Quiet output with the header included exactly once per process.
    #[must_use]
    pub fn quiet_block(&self) -> String {
        if QUIET_HEADER_DONE.swap(true, Ordering::Relaxed) {
            self.quiet_row()
        } else {
            format!("{}\n{}", self.quiet_header(), self.quiet_row())
        }
    }

    /// Single-object JSON with the quiet fields.
    #[must_use]
    pub fn render_json(&self) -> String {
        let mut obj = serde_json::Map::new();
        if let Some((name, value)) = &self.ctx.column {
            obj.insert(name.clone(), serde_json::Value::from(value.clone()));
        }
        obj.insert("threads".to_owned(), self.ctx.threads.into());
        obj.insert("batch".to_owned(), self.ctx.batch_size.into());
        obj.insert("time".to_owned(), rounded(self.elapsed, 100.0).into());
        if self.ctx.insert_mode {
            obj.insert("total_docs".to_owned(), self.total_rows.into());
            obj.insert("docs_per_sec".to_owned(), self.docs_per_sec().round().into());
        }
        obj.insert("avg_qps".to_owned(), self.qps_avg.round().into());
        obj.insert("p99_qps".to_owned(), self.qps_p99.round().into());
        obj.insert("p95_qps".to_owned(), self.qps_p95.round().into());
        if self.ctx.insert_mode {
            obj.insert("p5_qps".to_owned(), self.qps_p5.round().into());
            obj.insert("p1_qps".to_owned(), self.qps_p1.round().into());
        }
        obj.insert("lat_avg".to_owned(), rounded(self.lat_avg, 10.0).into());
        obj.insert("lat_p50".to_owned(), rounded(self.lat_p50, 10.0).into());
        obj.insert("lat_p95".to_owned(), rounded(self.lat_p95, 10.0).into());
        obj.insert("lat_p99".to_owned(), rounded(self.lat_p99, 10.0).into());
        serde_json::Value::Object(obj).to_string()
    }
}

/// Round to the decimal resolution `scale` (10 = one decimal place).
fn rounded(v: f64, scale: f64) -> f64 {
    (v * scale).round() / scale
}

/// `HH:MM` for hour-scale runs, seconds otherwise.
fn format_time(secs: f64) -> String {
    if secs >= 3600.0 {
        let total_minutes = (secs / 60.0).round() as u64;
        format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
    } else {
        format!("{secs:.2} sec")
    }
}

/// Format `n` with space-separated thousands groups (e.g. `1 234 567`).
#[must_use]
pub fn fmt_number(n: u64) -> String {
    let s = n.to_string();
    let mut out = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{RunContext, RunSummary, fmt_number, format_time};
    use crate::{LatencyTracker, QpsSamples};
    use std::time::Duration;

    fn summary(insert_mode: bool, column: Option<(String, String)>) -> RunSummary {
        let mut qps = QpsSamples::new();
        for v in [90, 100, 110] {
            qps.add(v);
        }
        let mut latency = LatencyTracker::exact();
        for ms in [1.0, 2.0, 3.0, 4.0] {
            latency.add(ms);
        }
        RunSummary::compute(
            RunContext {
                threads: 4,
                batch_size: 100,
                insert_mode,
                init_commands: Some("CREATE TABLE t(id bigint)".to_owned()),
                load_command: "INSERT INTO t VALUES(<increment>)".to_owned(),
                column,
            },
            Duration::from_secs(3),
            300,
            30_000,
            &qps,
            &latency,
        )
    }

    // RP-T01: insert-mode quiet header and row carry the full column set,
    // and the row has as many fields as the header.
    #[test]
    fn quiet_insert_columns() {
        let s = summary(true, None);
        let header = s.quiet_header();
        assert_eq!(
            header,
            "Threads; Batch; Time; Total Docs; Docs/Sec; Avg QPS; p99 QPS; p95 QPS; \
             p5 QPS; p1 QPS; Lat Avg; Lat p50; Lat p95; Lat p99"
        );
        let row = s.quiet_row();
        assert_eq!(row.split("; ").count(), header.split("; ").count());
        assert!(row.starts_with("4; 100; 3.00; 30000; 10000; "));
    }

    // RP-T02: non-insert mode omits docs and p5/p1 QPS columns.
    #[test]
    fn quiet_select_columns() {
        let s = summary(false, None);
        let header = s.quiet_header();
        assert!(!header.contains("Total Docs"));
        assert!(!header.contains("p5 QPS"));
        assert_eq!(header.split("; ").count(), 10);
        assert_eq!(s.quiet_row().split("; ").count(), 10);
    }

    // RP-T03: a custom column leads both header and row.
    #[test]
    fn quiet_custom_column() {
        let s = summary(false, Some(("engine".to_owned(), "rt".to_owned())));
        assert!(s.quiet_header().starts_with("engine; Threads"));
        assert!(s.quiet_row().starts_with("rt; 4"));
    }

    // RP-T04: the JSON object carries the quiet fields, keyed snake_case.
    #[test]
    fn json_fields() {
        let s = summary(true, Some(("tag".to_owned(), "a".to_owned())));
        let v: serde_json::Value = serde_json::from_str(&s.render_json()).unwrap();
        assert_eq!(v["threads"], 4);
        assert_eq!(v["batch"], 100);
        assert_eq!(v["total_docs"], 30_000);
        assert_eq!(v["avg_qps"], 100.0);
        assert_eq!(v["p99_qps"], 110.0);
        assert_eq!(v["p1_qps"], 90.0);
        assert_eq!(v["lat_p50"], 2.0);
        assert_eq!(v["tag"], "a");
    }

    // RP-T05: non-insert JSON omits docs and p5/p1 keys.
    #[test]
    fn json_select_fields() {
        let s = summary(false, None);
        let v: serde_json::Value = serde_json::from_str(&s.render_json()).unwrap();
        assert!(v.get("total_docs").is_none());
        assert!(v.get("p5_qps").is_none());
        assert_eq!(v["p95_qps"], 110.0);
    }

    // RP-T06: the verbose block echoes commands and figures.
    #[test]
    fn verbose_block() {
        let s = summary(true, None);
        let block = s.render_verbose();
        assert!(block.contains("Init commands: CREATE TABLE t(id bigint)"));
        assert!(block.contains("Load command: INSERT INTO t VALUES(<increment>)"));
        assert!(block.contains("Total docs: 30 000"));
        assert!(block.contains("Threads: 4"));
        assert!(block.contains("Batch size: 100"));
        assert!(block.contains("p5"));
        assert!(block.ends_with('\n'));
    }

    // RP-T07: time formatting switches to HH:MM at the hour mark.
    #[test]
    fn time_format() {
        assert_eq!(format_time(59.5), "59.50 sec");
        assert_eq!(format_time(3600.0), "01:00");
        assert_eq!(format_time(5400.0), "01:30");
    }

    // RP-T08: space-grouped thousands formatting.
    #[test]
    fn number_format() {
        assert_eq!(fmt_number(5), "5");
        assert_eq!(fmt_number(1_234), "1 234");
        assert_eq!(fmt_number(1_234_567), "1 234 567");
    }
}
