// Rust guideline compliant 2026-07-20

//! Command-line parsing and validation.
//!
//! The argument list is split into sections on `--together`; every section
//! carrying per-workload options defines one [`WorkloadSpec`], while global
//! options (host, port, output mode, ...) may appear in any section and are
//! merged. All validation happens here, once, before any work starts.

use std::time::Duration;

use clap::Parser;
use domain::WorkloadSpec;

/// Default SQL endpoint of a locally running search engine.
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 9306;

/// Default expansions per combination when `--total` is not given.
const DEFAULT_TOTAL: u64 = 1000;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A validation failure. Rendered as a single `ERROR: ...` line on stderr,
/// then the process exits 1 before any work starts.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// The validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Server host.
    pub host: String,
    /// Server SQL port.
    pub port: u16,
    /// Print final summaries as multi-line verbose blocks.
    pub verbose: bool,
    /// Print final summaries as semicolon rows; suppresses live progress.
    pub quiet: bool,
    /// Print final summaries as JSON objects (requires `quiet`).
    pub json: bool,
    /// After dispatching, wait for the server to finish optimizing.
    pub wait: bool,
    /// Disable ANSI color even on a tty.
    pub no_color: bool,
    /// Track latency with the bounded histogram (default) or exact samples.
    pub latency_histograms: bool,
    /// One entry per workload section.
    pub workloads: Vec<WorkloadSpec>,
}

// ---------------------------------------------------------------------------
// Section arguments
// ---------------------------------------------------------------------------

/// All options of one `--together` section. Global and per-workload options
/// share this struct; [`parse`] merges the globals and extracts one
/// [`WorkloadSpec`] per section that carries workload options.
#[derive(Debug, Parser)]
#[command(name = "manticore-load", disable_help_flag = true)]
struct SectionArgs {
    /// Server host.
    #[arg(long, short = 'h')]
    host: Option<String>,

    /// Server SQL port.
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Semicolon-separated statements executed before the load phase.
    #[arg(long)]
    init: Option<String>,

    /// Parametric SQL template; repeatable within one workload.
    #[arg(long)]
    load: Vec<String>,

    /// Comma-separated weights, one per --load.
    #[arg(long)]
    load_distribution: Option<String>,

    /// Drop the target table before the init commands.
    #[arg(long)]
    drop: bool,

    /// Rows per insert statement; a comma list sweeps multiple sizes.
    #[arg(long)]
    batch_size: Option<String>,

    /// Connection count; a comma list sweeps multiple pool sizes.
    #[arg(long)]
    threads: Option<String>,

    /// Template expansions (rows) per combination.
    #[arg(long)]
    total: Option<u64>,

    /// Replays of the generated sequence.
    #[arg(long)]
    iterations: Option<u32>,

    /// Multi-line summary blocks.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Semicolon-row summaries; suppresses live progress.
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Wait for the server to finish optimizing after the load.
    #[arg(long)]
    wait: bool,

    /// Disable ANSI color.
    #[arg(long)]
    no_color: bool,

    /// Latency via bounded histograms (1, default) or exact samples (0).
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "1",
        value_parser = parse_bool01
    )]
    latency_histograms: Option<bool>,

    /// Custom `name/value` column prepended to quiet/JSON output.
    #[arg(long)]
    column: Option<String>,

    /// Seconds between two submissions on one connection.
    #[arg(long)]
    delay: Option<f64>,

    /// JSON summaries (requires --quiet).
    #[arg(long)]
    json: bool,

    /// Print help.
    #[arg(long = "help", action = clap::ArgAction::Help)]
    _help: Option<bool>,
}

impl SectionArgs {
    /// True when the section carries any per-workload option.
    fn defines_workload(&self) -> bool {
        !self.load.is_empty()
            || self.init.is_some()
            || self.drop
            || self.batch_size.is_some()
            || self.threads.is_some()
            || self.total.is_some()
            || self.iterations.is_some()
            || self.column.is_some()
            || self.delay.is_some()
            || self.load_distribution.is_some()
    }

    /// Build this section's workload spec.
    fn workload(&self) -> Result<WorkloadSpec, ConfigError> {
        if self.load.is_empty() {
            return Err(ConfigError::new("a workload section requires --load"));
        }
        let distribution = match &self.load_distribution {
            None => vec![],
            Some(text) => {
                let weights = parse_f64_list(text, "--load-distribution")?;
                if weights.len() != self.load.len() {
                    return Err(ConfigError::new(format!(
                        "--load-distribution needs one weight per --load ({} != {})",
                        weights.len(),
                        self.load.len()
                    )));
                }
                if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
                    return Err(ConfigError::new(
                        "--load-distribution weights must be non-negative and not all zero",
                    ));
                }
                weights
            }
        };
        let column = match &self.column {
            None => None,
            Some(text) => {
                let (name, value) = text
                    .split_once('/')
                    .ok_or_else(|| ConfigError::new("--column expects name/value"))?;
                Some((name.to_owned(), value.to_owned()))
            }
        };
        let delay = match self.delay {
            None => Duration::ZERO,
            Some(secs) if secs >= 0.0 => Duration::from_secs_f64(secs),
            Some(_) => return Err(ConfigError::new("--delay must be non-negative")),
        };
        Ok(WorkloadSpec {
            threads: parse_sweep_list(self.threads.as_deref(), "--threads")?,
            batch_size: parse_sweep_list(self.batch_size.as_deref(), "--batch-size")?,
            total: self.total.unwrap_or(DEFAULT_TOTAL),
            iterations: self.iterations.unwrap_or(1).max(1),
            load_templates: self.load.clone(),
            load_distribution: distribution,
            init_commands: self.init.clone(),
            drop: self.drop,
            delay,
            column,
        })
    }
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

/// Parse and validate the full command line.
///
/// # Errors
///
/// Returns [`ConfigError`] on any unknown option, malformed value, or
/// invalid combination (`--json` without `--quiet`, missing `--load`, ...).
pub fn parse<I>(args: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let program = args.next().unwrap_or_else(|| "manticore-load".to_owned());

    // Section the remaining argv on --together.
    let mut sections: Vec<Vec<String>> = vec![vec![]];
    for arg in args {
        if arg == "--together" {
            sections.push(vec![]);
        } else if let Some(current) = sections.last_mut() {
            current.push(arg);
        }
    }

    let parsed: Vec<SectionArgs> = sections
        .iter()
        .map(|section| {
            SectionArgs::try_parse_from(std::iter::once(program.clone()).chain(section.clone()))
                .map_err(clap_error)
        })
        .collect::<Result<_, _>>()?;

    // Globals merge across sections: last explicit value wins, flags OR.
    let mut config = Config {
        host: DEFAULT_HOST.to_owned(),
        port: DEFAULT_PORT,
        verbose: false,
        quiet: false,
        json: false,
        wait: false,
        no_color: false,
        latency_histograms: true,
        workloads: vec![],
    };
    for section in &parsed {
        if let Some(host) = &section.host {
            config.host = host.clone();
        }
        if let Some(port) = section.port {
            config.port = port;
        }
        if let Some(histograms) = section.latency_histograms {
            config.latency_histograms = histograms;
        }
        config.verbose |= section.verbose;
        config.quiet |= section.quiet;
        config.json |= section.json;
        config.wait |= section.wait;
        config.no_color |= section.no_color;
    }

    for section in &parsed {
        if section.defines_workload() {
            config.workloads.push(section.workload()?);
        }
    }
    if config.workloads.is_empty() {
        return Err(ConfigError::new("--load is required"));
    }
    if config.json && !config.quiet {
        return Err(ConfigError::new("--json requires --quiet"));
    }
    Ok(config)
}

/// Flatten a clap error into a single validation line.
///
/// `--help` is not an error: render it and exit 0 like any CLI would.
fn clap_error(e: clap::Error) -> ConfigError {
    if matches!(
        e.kind(),
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
    ) {
        e.exit();
    }
    let text = e.to_string();
    let line = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("invalid arguments")
        .trim_start_matches("error: ");
    ConfigError::new(line.to_owned())
}

fn parse_bool01(value: &str) -> Result<bool, String> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(format!("expected 0 or 1, got {value}")),
    }
}

/// Parse a `--threads`/`--batch-size` value: one positive int or a comma
/// list for a Cartesian sweep. `None` defaults to `[1]`.
fn parse_sweep_list(value: Option<&str>, option: &str) -> Result<Vec<u32>, ConfigError> {
    let Some(value) = value else {
        return Ok(vec![1]);
    };
    let list: Vec<u32> = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .ok()
                .filter(|v| *v >= 1)
                .ok_or_else(|| {
                    ConfigError::new(format!("{option} expects positive integers, got {part}"))
                })
        })
        .collect::<Result<_, _>>()?;
    if list.is_empty() {
        return Err(ConfigError::new(format!("{option} must not be empty")));
    }
    Ok(list)
}

fn parse_f64_list(value: &str, option: &str) -> Result<Vec<f64>, ConfigError> {
    value
        .split(',')
        .map(|part| {
            part.trim().parse::<f64>().map_err(|_| {
                ConfigError::new(format!("{option} expects numbers, got {part}"))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
