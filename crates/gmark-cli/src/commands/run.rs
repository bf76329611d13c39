use std::error::Error;
use std::fs;
use std::io::{self, Stdout};
use std::path::PathBuf;

use clap::Args;
use gmark_core::errors::{ErrorInfo, GmarkError};
use gmark_core::{IdType, OutputRecord};
use gmark_exec::SubprocessBackend;
use gmark_sched::{Driver, HarnessConfig, JsonLinesSink, RecordSink, Selection};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory for run artefacts (must not exist).
    #[arg(long)]
    pub out: PathBuf,
    /// Benchmark runner binary invoked once per execution.
    #[arg(long)]
    pub runner: PathBuf,
    /// Backend parallelism hint; shifts every job's starting scale.
    #[arg(long)]
    pub parallelism: u32,
    /// Samples required at a scale before the baseline advances.
    #[arg(long, default_value_t = 8)]
    pub samples: u32,
    /// Master seed for deterministic graph generation (random when omitted).
    #[arg(long)]
    pub seed: Option<u64>,
    /// Vertex id type to benchmark; repeatable. Defaults to all.
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,
    /// Algorithm selector (`name` or `name=ratio`); repeatable. Defaults to
    /// the full catalogue with ratio 1.0.
    #[arg(long = "algorithm", value_name = "NAME[=RATIO]")]
    pub algorithms: Vec<String>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let config = build_config(args)?;
    // Jobs are validated and constructed before anything touches the
    // filesystem, so usage errors never leave a half-created run directory.
    let jobs = config.build_jobs()?;

    fs::create_dir(&args.out).map_err(|err| {
        GmarkError::Io(
            ErrorInfo::new("out-dir", "failed to create run directory")
                .with_context("path", args.out.display().to_string())
                .with_hint(format!("{err} (the directory must not already exist)")),
        )
    })?;
    persist_config(&args.out, &config)?;

    let backend = SubprocessBackend::new(&args.runner, args.out.join("details"))?;
    let mut driver = Driver::new(&backend, config.master_seed);
    for job in jobs {
        driver.admit(job)?;
    }

    let mut sink = RunSink::new(io::stdout(), args.out.join("records"))?;
    driver.run(&mut sink)?;
    Ok(())
}

fn build_config(args: &RunArgs) -> Result<HarnessConfig, GmarkError> {
    let id_types = parse_types(&args.types)?;
    let algorithms = parse_selectors(&args.algorithms)?;
    let master_seed = args.seed.unwrap_or_else(rand::random);
    Ok(HarnessConfig {
        parallelism: args.parallelism,
        target_samples: args.samples,
        master_seed,
        id_types,
        algorithms,
    })
}

/// An empty list or an `all` token selects the full closed set.
fn parse_types(tokens: &[String]) -> Result<Vec<IdType>, GmarkError> {
    if tokens.is_empty() || tokens.iter().any(|token| token == "all") {
        return Ok(Vec::new());
    }
    tokens.iter().map(|token| token.parse()).collect()
}

/// An empty list or an `all` token selects the full catalogue.
fn parse_selectors(tokens: &[String]) -> Result<Vec<Selection>, GmarkError> {
    if tokens.is_empty() || tokens.iter().any(|token| token == "all") {
        return Ok(Vec::new());
    }
    tokens
        .iter()
        .map(|token| Selection::parse(token))
        .collect()
}

fn persist_config(out: &std::path::Path, config: &HarnessConfig) -> Result<(), GmarkError> {
    let json = serde_json::to_string_pretty(config).map_err(|err| {
        GmarkError::Serde(
            ErrorInfo::new("config-encode", "failed to encode run configuration")
                .with_hint(err.to_string()),
        )
    })?;
    fs::write(out.join("config.json"), json).map_err(|err| {
        GmarkError::Io(
            ErrorInfo::new("config-write", "failed to persist run configuration")
                .with_hint(err.to_string()),
        )
    })
}

/// Emits each record to stdout as JSONL and to a numbered file under the
/// run's `records/` directory for later aggregation by `gmark report`.
struct RunSink {
    stdout: JsonLinesSink<Stdout>,
    records_dir: PathBuf,
    index: u64,
}

impl RunSink {
    fn new(stdout: Stdout, records_dir: PathBuf) -> Result<Self, GmarkError> {
        fs::create_dir_all(&records_dir).map_err(|err| {
            GmarkError::Io(
                ErrorInfo::new("records-dir", "failed to create records directory")
                    .with_context("path", records_dir.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(Self {
            stdout: JsonLinesSink::new(stdout),
            records_dir,
            index: 0,
        })
    }
}

impl RecordSink for RunSink {
    fn emit(&mut self, record: &OutputRecord) -> Result<(), GmarkError> {
        self.stdout.emit(record)?;
        let path = self.records_dir.join(format!("{:06}.json", self.index));
        self.index += 1;
        let json = serde_json::to_string_pretty(record).map_err(|err| {
            GmarkError::Serde(
                ErrorInfo::new("record-encode", "failed to encode output record")
                    .with_hint(err.to_string()),
            )
        })?;
        fs::write(&path, json).map_err(|err| {
            GmarkError::Io(
                ErrorInfo::new("record-persist", "failed to persist output record")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })
    }
}
