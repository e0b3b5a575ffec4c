// Rust guideline compliant 2026-07-20

//! Query generator -- expands parametric SQL templates into the concrete
//! statement sequence one workload combination will submit.
//!
//! Entry point: [`QueryGenerator::generate`]. Expansion is driven by a
//! fixed-seed `StdRng` so identical specs produce bytewise-identical
//! sequences; the materialized sequence is cached on disk under a
//! fingerprinted name and read back verbatim on the next run.

mod sql;

use std::collections::HashMap;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use domain::{StopFlag, WorkloadSpec};
use pattern::{CounterTable, Pattern, PatternError};
use rand::SeedableRng;
use rand::distr::Distribution as _;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use sha2::{Digest as _, Sha256};

pub use sql::{split_statements, table_from_create, table_from_template};

/// Fixed PRNG seed installed at generator construction. Shared by every
/// workload, which keeps cache files stable across runs.
const SEED: u64 = 42;

/// Expansions between stop-flag polls during generation.
const STOP_POLL_EVERY: u64 = 256;

// ---------------------------------------------------------------------------
// GeneratorError
// ---------------------------------------------------------------------------

/// Errors raised while generating a statement sequence.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// A template pattern token failed to parse.
    #[error("bad template: {0}")]
    BadTemplate(#[from] PatternError),
    /// The load distribution weights are unusable (negative, all zero, ...).
    #[error("bad load distribution: {reason}")]
    BadDistribution {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The cache file could not be read or written.
    #[error("cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),
    /// The stop flag was observed mid-generation; the partial cache file has
    /// been removed.
    #[error("query generation interrupted")]
    Interrupted,
}

// ---------------------------------------------------------------------------
// GeneratedLoad
// ---------------------------------------------------------------------------

/// The fully materialized statement sequence for one combination.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedLoad {
    /// Statements in submission order, without line terminators.
    pub statements: Vec<String>,
    /// Rows (template expansions) the sequence covers, across iterations.
    pub total_rows: u64,
    /// True when the workload's first template is insert-like.
    pub insert_mode: bool,
    /// True when the sequence was served from the disk cache.
    pub cache_hit: bool,
}

// ---------------------------------------------------------------------------
// Template state
// ---------------------------------------------------------------------------

/// One recognized token occurrence inside a template.
#[derive(Debug)]
struct Site {
    offset: usize,
    len: usize,
    token: String,
}

/// Per-template expansion state: parsed patterns, increment counters, and
/// the batch buffer for insert-like templates.
#[derive(Debug)]
struct Template {
    text: String,
    /// Ascending by offset; substitution walks it in reverse.
    sites: Vec<Site>,
    patterns: HashMap<String, Pattern>,
    counters: CounterTable,
    batching: bool,
    prefix: Option<String>,
    tuples: Vec<String>,
}

impl Template {
    /// Scan `text` once for recognized `<type...>` tokens.
    fn scan(text: &str, batch_size: u32) -> Result<Self, GeneratorError> {
        let mut sites = Vec::new();
        let mut patterns: HashMap<String, Pattern> = HashMap::new();
        let mut i = 0;
        while i < text.len() {
            if text[i..].starts_with('<')
                && let Some(rel) = text[i..].find('>')
            {
                let token = &text[i..=i + rel];
                let keyword = token[1..token.len() - 1]
                    .split('/')
                    .next()
                    .unwrap_or_default();
                if Pattern::is_known_type(keyword) {
                    if !patterns.contains_key(token) {
                        patterns.insert(token.to_owned(), Pattern::parse(token)?);
                    }
                    sites.push(Site {
                        offset: i,
                        len: token.len(),
                        token: token.to_owned(),
                    });
                    i += rel + 1;
                    continue;
                }
            }
            // Not a token start: advance one char so `a < b` style text
            // cannot swallow a real token further right.
            i += text[i..].chars().next().map_or(1, char::len_utf8);
        }

        let keyword: String = text
            .trim_start()
            .chars()
            .take_while(char::is_ascii_alphabetic)
            .collect();
        let insert_like =
            keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace");
        let batching = insert_like && batch_size > 1 && find_values(text).is_some();

        Ok(Self {
            text: text.to_owned(),
            sites,
            patterns,
            counters: CounterTable::new(),
            batching,
            prefix: None,
            tuples: Vec::new(),
        })
    }

    /// Produce one expansion by substituting every token occurrence.
    ///
    /// Sites are substituted in descending offset order so byte-indexed
    /// replacement does not perturb the offsets still pending.
    fn expand(&mut self, rng: &mut StdRng) -> String {
        let mut out = self.text.clone();
        for site in self.sites.iter().rev() {
            let value = self.patterns[&site.token].generate(rng, &mut self.counters);
            out.replace_range(site.offset..site.offset + site.len, &value);
        }
        out
    }

    /// Buffer one expansion; returns a full statement when the buffer
    /// reaches `batch_size`.
    fn push_row(&mut self, batch_size: usize, row: String) -> Option<String> {
        match split_at_values(&row) {
            // No VALUES clause to pack; the row stands alone.
            None => Some(row),
            Some((prefix, tuple)) => {
                if self.tuples.is_empty() {
                    self.prefix = Some(prefix);
                }
                self.tuples.push(tuple);
                (self.tuples.len() >= batch_size).then(|| self.flush())
            }
        }
    }

    /// Emit the buffered batch as one statement and reset the buffer.
    fn flush(&mut self) -> String {
        let prefix = self.prefix.take().unwrap_or_default();
        let statement = format!("{prefix}{}", self.tuples.join(","));
        self.tuples.clear();
        statement
    }

    /// Flush a trailing short batch, if any rows are buffered.
    fn take_remainder(&mut self) -> Option<String> {
        (!self.tuples.is_empty()).then(|| self.flush())
    }
}

/// Byte position of the `VALUES` keyword, case-insensitive.
///
/// Only token-boundary matches count: preceded by `)` or whitespace and
/// followed by `(` or whitespace. An identifier or string merely containing
/// the substring (`json_values`) never qualifies.
fn find_values(text: &str) -> Option<usize> {
    let lower = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("values") {
        let pos = from + rel;
        let end = pos + "values".len();
        let before_ok = text[..pos]
            .chars()
            .next_back()
            .is_some_and(|c| c == ')' || c.is_whitespace());
        let after_ok = text[end..]
            .chars()
            .next()
            .is_some_and(|c| c == '(' || c.is_whitespace());
        if before_ok && after_ok {
            return Some(pos);
        }
        from = end;
    }
    None
}

/// Split an expansion into (prefix up to and including `VALUES ` plus any
/// following whitespace, the value tuple after it).
fn split_at_values(row: &str) -> Option<(String, String)> {
    let pos = find_values(row)?;
    let mut end = pos + "values".len();
    end += row[end..].len() - row[end..].trim_start().len();
    Some((row[..end].to_owned(), row[end..].to_owned()))
}

// ---------------------------------------------------------------------------
// QueryGenerator
// ---------------------------------------------------------------------------

/// Expands one workload spec into its statement sequence, with caching.
#[derive(Debug)]
pub struct QueryGenerator<'a> {
    spec: &'a WorkloadSpec,
    workload_index: usize,
    cache_dir: PathBuf,
}

impl<'a> QueryGenerator<'a> {
    /// Generator for `spec` running as workload number `workload_index`.
    ///
    /// The cache lives in the system temp directory by default.
    #[must_use]
    pub fn new(spec: &'a WorkloadSpec, workload_index: usize) -> Self {
        Self {
            spec,
            workload_index,
            cache_dir: std::env::temp_dir(),
        }
    }

    /// Override the cache directory (tests).
    #[must_use]
    pub fn with_cache_dir(mut self, dir: &Path) -> Self {
        self.cache_dir = dir.to_owned();
        self
    }

    /// Cache file path for this spec at `batch_size`.
    ///
    /// The fingerprint covers everything that shapes the sequence: init
    /// commands, templates, total, batch size, and the workload index (which
    /// also guarantees an exclusive writer per file).
    #[must_use]
    pub fn cache_path(&self, batch_size: u32) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(self.spec.init_commands.as_deref().unwrap_or_default());
        hasher.update([0x1f]);
        hasher.update(self.spec.load_templates.join("\u{1e}"));
        hasher.update([0x1f]);
        hasher.update(self.spec.total.to_le_bytes());
        hasher.update(u64::from(batch_size).to_le_bytes());
        hasher.update((self.workload_index as u64).to_le_bytes());
        let digest = hasher.finalize();
        let hex: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
        self.cache_dir.join(format!("manticore_load_{hex}"))
    }

    /// Materialize the statement sequence for one combination.
    ///
    /// Serves the sequence from the cache when a file with the matching
    /// fingerprint exists; otherwise expands the templates, writing the cache
    /// file as statements are produced. The base sequence is then repeated
    /// `iterations` times.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::BadTemplate`] on pattern parse failure,
    /// [`GeneratorError::CacheIo`] on cache read/write failure, and
    /// [`GeneratorError::Interrupted`] when the stop flag is observed (the
    /// partial cache file is removed first).
    pub fn generate(
        &self,
        batch_size: u32,
        stop: &StopFlag,
    ) -> Result<GeneratedLoad, GeneratorError> {
        let path = self.cache_path(batch_size);
        let insert_mode = self.spec.insert_mode();

        if path.exists() {
            log::info!("generator.cache.hit: path={}", path.display());
            return Ok(self.finish(read_cache(&path)?, insert_mode, true));
        }

        let result = self.expand_all(batch_size, stop, &path);
        if result.is_err() {
            // Scoped cleanup: never leave a partial cache behind.
            let _ = std::fs::remove_file(&path);
        }
        Ok(self.finish(result?, insert_mode, false))
    }

    /// Repeat the base sequence `iterations` times and wrap it up.
    fn finish(&self, base: Vec<String>, insert_mode: bool, cache_hit: bool) -> GeneratedLoad {
        let iterations = u64::from(self.spec.iterations.max(1));
        let mut statements = base;
        if iterations > 1 {
            let one = statements.clone();
            for _ in 1..iterations {
                statements.extend(one.iter().cloned());
            }
        }
        GeneratedLoad {
            statements,
            total_rows: self.spec.total * iterations,
            insert_mode,
            cache_hit,
        }
    }

    /// Expand all templates into the base (single-iteration) sequence,
    /// writing the cache file alongside.
    fn expand_all(
        &self,
        batch_size: u32,
        stop: &StopFlag,
        path: &Path,
    ) -> Result<Vec<String>, GeneratorError> {
        let mut templates = self
            .spec
            .load_templates
            .iter()
            .map(|t| Template::scan(t, batch_size))
            .collect::<Result<Vec<_>, _>>()?;

        let chooser = if templates.len() > 1 {
            let weights = if self.spec.load_distribution.is_empty() {
                vec![1.0; templates.len()]
            } else {
                self.spec.load_distribution.clone()
            };
            Some(
                WeightedIndex::new(&weights).map_err(|e| GeneratorError::BadDistribution {
                    reason: e.to_string(),
                })?,
            )
        } else {
            None
        };

        let mut rng = StdRng::seed_from_u64(SEED);
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        let mut statements: Vec<String> = Vec::new();
        let batch = batch_size.max(1) as usize;

        for i in 0..self.spec.total {
            if i % STOP_POLL_EVERY == 0 && stop.is_set() {
                drop(writer);
                let _ = std::fs::remove_file(path);
                eprintln!("Cache generation interrupted");
                log::warn!("generator.interrupted: removed partial cache");
                return Err(GeneratorError::Interrupted);
            }
            let t = chooser.as_ref().map_or(0, |c| c.sample(&mut rng));
            let row = templates[t].expand(&mut rng);
            let emitted = if templates[t].batching {
                templates[t].push_row(batch, row)
            } else {
                Some(row)
            };
            if let Some(statement) = emitted {
                writeln!(writer, "{statement};")?;
                statements.push(statement);
            }
        }

        // Trailing short batches, in template order. Only the last line of
        // the file drops its semicolon.
        let tail: Vec<String> = templates
            .iter_mut()
            .filter_map(Template::take_remainder)
            .collect();
        for (k, statement) in tail.iter().enumerate() {
            if k + 1 == tail.len() {
                writeln!(writer, "{statement}")?;
            } else {
                writeln!(writer, "{statement};")?;
            }
        }
        statements.extend(tail);
        writer.flush()?;
        log::info!(
            "generator.cache.written: path={} statements={}",
            path.display(),
            statements.len()
        );
        Ok(statements)
    }
}

/// Read a cached sequence back, stripping line terminators.
fn read_cache(path: &Path) -> Result<Vec<String>, GeneratorError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| l.strip_suffix(';').unwrap_or(l).to_owned())
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{GeneratedLoad, GeneratorError, QueryGenerator};
    use domain::{StopFlag, WorkloadSpec};

    fn generate(spec: &WorkloadSpec, batch_size: u32, dir: &std::path::Path) -> GeneratedLoad {
        QueryGenerator::new(spec, 0)
            .with_cache_dir(dir)
            .generate(batch_size, &StopFlag::new())
            .unwrap()
    }

    // GN-T01: increment + fixed int expand to the exact expected statements.
    #[test]
    fn exact_statements_unbatched() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::single("INSERT INTO t VALUES(<increment>, <int/1/1>)", 5);
        let load = generate(&spec, 1, dir.path());
        let expected: Vec<String> = (1..=5)
            .map(|i| format!("INSERT INTO t VALUES({i}, 1)"))
            .collect();
        assert_eq!(load.statements, expected);
        assert!(load.insert_mode);
        assert_eq!(load.total_rows, 5);
    }

    // GN-T02: batch_size=3 over total=6 packs two 3-tuple statements.
    #[test]
    fn batched_statements() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::single("INSERT INTO t VALUES(<increment>,<int/1/1>)", 6);
        let load = generate(&spec, 3, dir.path());
        assert_eq!(
            load.statements,
            vec![
                "INSERT INTO t VALUES(1,1),(2,1),(3,1)".to_owned(),
                "INSERT INTO t VALUES(4,1),(5,1),(6,1)".to_owned(),
            ]
        );
    }

    // GN-T03: total=10, batch_size=3 yields 4 statements, the last short.
    #[test]
    fn short_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::single("INSERT INTO t VALUES(<increment>)", 10);
        let load = generate(&spec, 3, dir.path());
        assert_eq!(load.statements.len(), 4);
        let tuples = |s: &str| s.matches("),(").count() + 1;
        assert_eq!(tuples(&load.statements[0]), 3);
        assert_eq!(tuples(&load.statements[1]), 3);
        assert_eq!(tuples(&load.statements[2]), 3);
        assert_eq!(tuples(&load.statements[3]), 1);
    }

    // GN-T04: non-insert templates never batch.
    #[test]
    fn select_never_batches() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::single("SELECT * FROM t WHERE id=<int/1/100>", 10);
        let load = generate(&spec, 5, dir.path());
        assert_eq!(load.statements.len(), 10);
        assert!(!load.insert_mode);
    }

    // GN-T05: iterations replay the generated sequence exactly.
    #[test]
    fn iterations_replay() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = WorkloadSpec::single("INSERT INTO t VALUES(<increment>)", 4);
        spec.iterations = 3;
        let load = generate(&spec, 2, dir.path());
        assert_eq!(load.statements.len(), 6); // 2 per iteration x 3
        assert_eq!(load.statements[0], load.statements[2]);
        assert_eq!(load.statements[0], load.statements[4]);
        assert_eq!(load.total_rows, 12);
    }

    // GN-T06: two runs with an identical spec produce bytewise-identical
    // cache files (fixed-seed determinism).
    #[test]
    fn cache_determinism() {
        let spec = WorkloadSpec::single(
            "INSERT INTO t VALUES(<increment>,'<string/5/20>',<float/1/100>)",
            50,
        );
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let a = generate(&spec, 4, dir_a.path());
        let b = generate(&spec, 4, dir_b.path());
        assert_eq!(a.statements, b.statements);
        let path_a = QueryGenerator::new(&spec, 0)
            .with_cache_dir(dir_a.path())
            .cache_path(4);
        let path_b = QueryGenerator::new(&spec, 0)
            .with_cache_dir(dir_b.path())
            .cache_path(4);
        let file_a = std::fs::read(path_a).unwrap();
        let file_b = std::fs::read(path_b).unwrap();
        assert_eq!(file_a, file_b, "cache files must be bytewise identical");
    }

    // GN-T07: a cache hit returns the same sequence as the original miss.
    #[test]
    fn cache_hit_equals_miss() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::single("INSERT INTO t VALUES(<increment>,<int/1/10>)", 20);
        let miss = generate(&spec, 3, dir.path());
        assert!(!miss.cache_hit);
        let hit = generate(&spec, 3, dir.path());
        assert!(hit.cache_hit);
        assert_eq!(miss.statements, hit.statements);
    }

    // GN-T08: cache lines end with ";" except a trailing short batch.
    #[test]
    fn cache_terminators() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::single("INSERT INTO t VALUES(<increment>)", 10);
        let load = generate(&spec, 3, dir.path());
        assert_eq!(load.statements.len(), 4);
        let path = QueryGenerator::new(&spec, 0)
            .with_cache_dir(dir.path())
            .cache_path(3);
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        for line in &lines[..3] {
            assert!(line.ends_with(';'), "full batch line must end with ';'");
        }
        assert!(
            !lines[3].ends_with(';'),
            "trailing short batch must not end with ';'"
        );
    }

    // GN-T09: weighted multi-template generation covers `total` rows with
    // independent increment counters and per-template batching.
    #[test]
    fn multi_template_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = WorkloadSpec::single("insert into t values(<increment>,<int/1/10>)", 10);
        spec.load_templates
            .push("update t set a=<int/100/200> where a=<increment>".to_owned());
        spec.load_distribution = vec![0.5, 0.5];
        let load = generate(&spec, 2, dir.path());

        let mut insert_rows = 0usize;
        let mut update_rows = 0usize;
        for s in &load.statements {
            if s.starts_with("insert") {
                insert_rows += s.matches("),(").count() + 1;
                assert!(
                    s.matches("),(").count() + 1 <= 2,
                    "insert batches are at most 2 rows: {s}"
                );
            } else {
                assert!(s.starts_with("update"), "unexpected statement {s}");
                update_rows += 1;
            }
        }
        assert_eq!(insert_rows + update_rows, 10, "all rows accounted for");

        // Insert increments form their own 1..n sequence.
        let mut insert_ids = Vec::new();
        for s in load.statements.iter().filter(|s| s.starts_with("insert")) {
            for tuple in s.split("values").nth(1).unwrap().split("),(") {
                let id: u64 = tuple
                    .trim_matches(|c| c == '(' || c == ')')
                    .split(',')
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap();
                insert_ids.push(id);
            }
        }
        let expected: Vec<u64> = (1..=insert_ids.len() as u64).collect();
        assert_eq!(insert_ids, expected, "insert counter must be independent");
    }

    // GN-T10: unknown bracketed spans survive verbatim.
    #[test]
    fn unknown_token_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::single("SELECT * FROM t WHERE a < 5 AND b=<int/2/2>", 3);
        let load = generate(&spec, 1, dir.path());
        assert_eq!(load.statements[0], "SELECT * FROM t WHERE a < 5 AND b=2");
    }

    // GN-T11: a pre-set stop flag interrupts generation and removes the
    // partial cache file.
    #[test]
    fn stop_interrupts_generation() {
        let dir = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::single("INSERT INTO t VALUES(<increment>)", 1000);
        let stop = StopFlag::new();
        stop.set();
        let generator = QueryGenerator::new(&spec, 0).with_cache_dir(dir.path());
        let result = generator.generate(1, &stop);
        assert!(matches!(result, Err(GeneratorError::Interrupted)));
        assert!(
            !generator.cache_path(1).exists(),
            "partial cache must be removed"
        );
    }

    // GN-T12: statement-count invariant for insert mode.
    #[test]
    fn statement_count_invariant() {
        let dir = tempfile::tempdir().unwrap();
        for (total, batch, iterations, expected) in
            [(10, 3, 1, 4), (10, 1, 1, 10), (9, 3, 2, 6), (1, 10, 1, 1)]
        {
            let mut spec = WorkloadSpec::single("INSERT INTO t VALUES(<increment>)", total);
            spec.iterations = iterations;
            let load = generate(&spec, batch, dir.path());
            assert_eq!(
                load.statements.len(),
                expected,
                "total={total} batch={batch} iterations={iterations}"
            );
        }
    }

    // GN-T14: an identifier containing the substring "values" does not
    // confuse batching; the split happens at the real VALUES keyword.
    #[test]
    fn values_keyword_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let spec =
            WorkloadSpec::single("INSERT INTO t (json_values) VALUES (<increment>)", 4);
        let load = generate(&spec, 2, dir.path());
        assert_eq!(
            load.statements,
            vec![
                "INSERT INTO t (json_values) VALUES (1),(2)".to_owned(),
                "INSERT INTO t (json_values) VALUES (3),(4)".to_owned(),
            ]
        );

        assert_eq!(super::find_values("INSERT INTO t VALUES(1)"), Some(14));
        assert_eq!(super::find_values("insert into t values (1)"), Some(14));
        // Substring inside an identifier or string literal never matches.
        assert_eq!(super::find_values("UPDATE json_values SET a=1"), None);
        assert_eq!(super::find_values("SELECT 'values' FROM t"), None);
    }

    // GN-T13: distinct workload indexes map to distinct cache files.
    #[test]
    fn fingerprint_covers_index() {
        let spec = WorkloadSpec::single("SELECT 1", 1);
        let a = QueryGenerator::new(&spec, 0).cache_path(1);
        let b = QueryGenerator::new(&spec, 1).cache_path(1);
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("manticore_load_"));
        assert_eq!(name.len(), "manticore_load_".len() + 16);
    }
}
