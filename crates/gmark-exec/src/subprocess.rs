//! Backend adapter that shells out to an external benchmark runner.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::Utc;
use gmark_core::errors::ErrorInfo;
use gmark_core::{ExecutionReport, JobSpec};
use serde::Deserialize;

use crate::{Backend, ExecutionError};

/// Exit code by which the runner signals a transient job cancellation
/// (`EX_TEMPFAIL`); any other non-zero exit is fatal.
const CANCELLED_EXIT: i32 = 75;

/// Runs jobs by invoking an external runner binary once per invocation.
///
/// The runner is expected to generate the synthetic graph, execute the
/// algorithm, and write a job-details JSON file (runtime plus accumulator
/// metrics) to the path given via `--details`.
#[derive(Debug, Clone)]
pub struct SubprocessBackend {
    runner: PathBuf,
    details_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct JobDetails {
    runtime_ms: u64,
    #[serde(default)]
    accumulators: BTreeMap<String, String>,
}

impl SubprocessBackend {
    /// Creates a backend driving `runner`, storing details files under
    /// `details_dir` (created if absent).
    pub fn new(
        runner: impl Into<PathBuf>,
        details_dir: impl Into<PathBuf>,
    ) -> Result<Self, ExecutionError> {
        let details_dir = details_dir.into();
        fs::create_dir_all(&details_dir).map_err(|err| {
            ExecutionError::Fatal(
                ErrorInfo::new("details-dir", "failed to create details directory")
                    .with_context("path", details_dir.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(Self {
            runner: runner.into(),
            details_dir,
        })
    }

    fn details_path(&self, spec: &JobSpec, scale: u32) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%f");
        self.details_dir
            .join(format!("{}_{}_{}_{}.json", spec.name, spec.id_type, scale, stamp))
    }
}

impl Backend for SubprocessBackend {
    fn execute(
        &self,
        spec: &JobSpec,
        scale: u32,
        seed: u64,
    ) -> Result<ExecutionReport, ExecutionError> {
        let details = self.details_path(spec, scale);

        let mut command = Command::new(&self.runner);
        command
            .arg("--algorithm")
            .arg(&spec.algorithm)
            .arg("--input")
            .arg("rmat")
            .arg("--type")
            .arg(spec.id_type.as_str())
            .arg("--scale")
            .arg(scale.to_string())
            .arg("--seed")
            .arg(seed.to_string())
            .arg("--output")
            .arg("hash")
            .arg("--job-name")
            .arg(&spec.name);
        for (key, value) in &spec.parameters {
            command.arg(format!("--{key}"));
            if !value.is_empty() {
                command.arg(value);
            }
        }
        command.arg("--details").arg(&details);

        let output = command.output().map_err(|err| {
            ExecutionError::Fatal(
                ErrorInfo::new("runner-spawn", "failed to spawn benchmark runner")
                    .with_context("runner", self.runner.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;

        if !output.status.success() {
            if output.status.code() == Some(CANCELLED_EXIT) {
                return Err(ExecutionError::Cancelled);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExecutionError::Fatal(
                ErrorInfo::new("runner-failed", "benchmark runner exited with failure")
                    .with_context("algorithm", spec.name.as_str())
                    .with_context("type", spec.id_type.as_str())
                    .with_context("scale", scale.to_string())
                    .with_context(
                        "status",
                        output
                            .status
                            .code()
                            .map_or_else(|| "signal".to_string(), |code| code.to_string()),
                    )
                    .with_hint(stderr.trim().to_string()),
            ));
        }

        read_details(&details)
    }
}

/// Parses a runner-written job-details file into an [`ExecutionReport`].
fn read_details(path: &Path) -> Result<ExecutionReport, ExecutionError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        ExecutionError::Fatal(
            ErrorInfo::new("details-read", "failed to read job details file")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let details: JobDetails = serde_json::from_str(&contents).map_err(|err| {
        ExecutionError::Fatal(
            ErrorInfo::new("details-parse", "malformed job details file")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    Ok(ExecutionReport {
        runtime: Duration::from_millis(details.runtime_ms),
        metrics: details.accumulators,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn details_parse_to_report() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"runtime_ms": 1500, "accumulators": {{"vertexCount": "65536"}}}}"#
        )
        .expect("write");
        let report = read_details(file.path()).expect("details");
        assert_eq!(report.runtime, Duration::from_millis(1500));
        assert_eq!(report.metrics.get("vertexCount").map(String::as_str), Some("65536"));
    }

    #[test]
    fn missing_accumulators_default_to_empty() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"runtime_ms": 10}}"#).expect("write");
        let report = read_details(file.path()).expect("details");
        assert!(report.metrics.is_empty());
    }

    #[test]
    fn unreadable_details_are_fatal() {
        let err = read_details(Path::new("/nonexistent/details.json"))
            .expect_err("missing file");
        match err {
            ExecutionError::Fatal(info) => assert_eq!(info.code, "details-read"),
            ExecutionError::Cancelled => panic!("missing details must not cancel"),
        }
    }
}
