use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use gmark_core::errors::{ErrorInfo, GmarkError};
use gmark_core::{IdType, OutputRecord};

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Run directories to summarize; later ones are compared against the
    /// first.
    #[arg(required = true, value_name = "DIR")]
    pub dirs: Vec<PathBuf>,
    /// Skip cross-run metric consistency validation.
    #[arg(long)]
    pub no_validate: bool,
}

type GroupKey = (String, u32, IdType);

/// Per-directory aggregation: sample count and total runtime per
/// (algorithm, scale, id type) group.
#[derive(Debug, Default)]
struct DirSummary {
    timings: BTreeMap<GroupKey, (u32, u64)>,
}

/// Cross-run check that identical (algorithm, scale, seed) invocations
/// reported identical metrics. A divergence means the runs computed
/// different results from the same input.
#[derive(Debug, Default)]
struct MetricsValidator {
    cache: BTreeMap<(String, u32, u64), BTreeMap<String, String>>,
}

impl MetricsValidator {
    fn check(&mut self, record: &OutputRecord) -> Result<(), GmarkError> {
        let key = (record.algorithm.clone(), record.scale, record.seed);
        match self.cache.get(&key) {
            None => {
                self.cache.insert(key, record.metrics.clone());
                Ok(())
            }
            Some(prior) if *prior == record.metrics => Ok(()),
            Some(_) => Err(GmarkError::Execution(
                ErrorInfo::new("metrics-mismatch", "metrics diverge for identical invocation")
                    .with_context("algorithm", record.algorithm.as_str())
                    .with_context("scale", record.scale.to_string())
                    .with_context("seed", record.seed.to_string()),
            )),
        }
    }
}

pub fn run(args: &ReportArgs) -> Result<(), Box<dyn Error>> {
    let mut validator = (!args.no_validate).then(MetricsValidator::default);
    let mut summaries = Vec::with_capacity(args.dirs.len());
    for dir in &args.dirs {
        summaries.push(load_directory(dir, validator.as_mut())?);
    }
    print!("{}", render(&summaries));
    Ok(())
}

fn load_directory(
    dir: &Path,
    mut validator: Option<&mut MetricsValidator>,
) -> Result<DirSummary, GmarkError> {
    let root = if dir.join("records").is_dir() {
        dir.join("records")
    } else {
        dir.to_path_buf()
    };
    let mut paths: Vec<PathBuf> = fs::read_dir(&root)
        .map_err(|err| {
            GmarkError::Io(
                ErrorInfo::new("report-read-dir", "failed to read run directory")
                    .with_context("path", root.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut summary = DirSummary::default();
    for path in paths {
        let Some(record) = read_record(&path) else {
            // Foreign JSON files (config.json, details) are skipped.
            continue;
        };
        if let Some(validator) = validator.as_deref_mut() {
            validator.check(&record)?;
        }
        let key = (record.algorithm.clone(), record.scale, record.id_type);
        let entry = summary.timings.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += record.runtime_ms;
    }
    Ok(summary)
}

fn read_record(path: &Path) -> Option<OutputRecord> {
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Renders the aligned comparison table, one line per (algorithm, scale,
/// id type) group; subsequent directories show the runtime delta against
/// the first as a percentage.
fn render(summaries: &[DirSummary]) -> String {
    let mut groups: BTreeSet<&GroupKey> = BTreeSet::new();
    for summary in summaries {
        groups.extend(summary.timings.keys());
    }

    let mut output = String::new();
    let mut last_algorithm: Option<&str> = None;
    let mut last_scale = 0u32;
    for key in groups {
        let (algorithm, scale, id_type) = key;
        match last_algorithm {
            Some(previous) if previous != algorithm.as_str() => output.push_str("\n\n"),
            Some(_) if last_scale != *scale => output.push('\n'),
            _ => {}
        }
        last_algorithm = Some(algorithm.as_str());
        last_scale = *scale;

        let _ = write!(
            output,
            "{algorithm}, scale={scale}, {:<8}: runtime=",
            id_type.as_str()
        );
        let mut baseline = 0.0f64;
        for (idx, summary) in summaries.iter().enumerate() {
            match summary.timings.get(key) {
                Some((count, total_ms)) => {
                    let mean = *total_ms as f64 / 1000.0 / f64::from(*count);
                    let _ = write!(output, "{mean:>8.3} ({count})");
                    if idx == 0 {
                        baseline = mean;
                        output.push_str("   ");
                    } else if baseline > 0.0 {
                        let delta = 100.0 * (mean - baseline) / baseline;
                        let _ = write!(output, " ({delta:>6.2}%)   ");
                    } else {
                        output.push_str(&" ".repeat(13));
                    }
                }
                None => {
                    let width = if idx == 0 { 15 } else { 25 };
                    output.push_str(&" ".repeat(width));
                }
            }
        }
        output.push('\n');
    }
    output
}
