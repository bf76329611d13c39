//! Single-threaded driver loop over the credit scheduler.

use std::io::Write;

use gmark_core::errors::{ErrorInfo, GmarkError};
use gmark_core::OutputRecord;
use gmark_exec::{Backend, ExecutionError};

use crate::credit::CreditScheduler;
use crate::job::{Job, StepOutcome};

/// Receives one record per completed invocation, in completion order.
pub trait RecordSink {
    /// Emits a single completed-invocation record.
    fn emit(&mut self, record: &OutputRecord) -> Result<(), GmarkError>;
}

/// Sink writing one JSON object per line to the wrapped writer.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wraps a writer, typically stdout.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &OutputRecord) -> Result<(), GmarkError> {
        let line = serde_json::to_string(record).map_err(|err| {
            GmarkError::Serde(
                ErrorInfo::new("record-encode", "failed to encode output record")
                    .with_hint(err.to_string()),
            )
        })?;
        writeln!(self.writer, "{line}").map_err(|err| {
            GmarkError::Io(
                ErrorInfo::new("record-write", "failed to write output record")
                    .with_hint(err.to_string()),
            )
        })
    }
}

/// Owns the scheduler and runs jobs to completion against one backend.
///
/// The loop is cooperative: at most one invocation is in flight at any
/// time, and all fairness comes from interleaving sequential invocations.
pub struct Driver<'a> {
    backend: &'a dyn Backend,
    master_seed: u64,
    scheduler: CreditScheduler,
}

impl<'a> Driver<'a> {
    /// Creates a driver with an empty pool.
    pub fn new(backend: &'a dyn Backend, master_seed: u64) -> Self {
        Self {
            backend,
            master_seed,
            scheduler: CreditScheduler::new(),
        }
    }

    /// Number of active jobs in the pool.
    pub fn active_jobs(&self) -> usize {
        self.scheduler.len()
    }

    /// Warms the job up once (retrying transient cancellations) and adds it
    /// to the pool.
    pub fn admit(&mut self, job: Job) -> Result<(), GmarkError> {
        loop {
            match job.warmup(self.backend, self.master_seed) {
                Ok(()) => break,
                Err(ExecutionError::Cancelled) => continue,
                Err(ExecutionError::Fatal(info)) => return Err(GmarkError::Execution(info)),
            }
        }
        self.scheduler.enqueue(job);
        Ok(())
    }

    /// Runs until the pool is empty, emitting one record per completion.
    ///
    /// A cancelled invocation is retried as if it never happened: no state
    /// is mutated and no record is emitted for the cancelled attempt. Any
    /// other backend failure aborts the run.
    pub fn run(&mut self, sink: &mut dyn RecordSink) -> Result<(), GmarkError> {
        while let Some(mut entry) = self.scheduler.select_next() {
            let outcome = loop {
                match entry.job.step(self.backend, self.master_seed) {
                    Ok(outcome) => break outcome,
                    Err(ExecutionError::Cancelled) => continue,
                    Err(ExecutionError::Fatal(info)) => {
                        return Err(GmarkError::Execution(info));
                    }
                }
            };
            sink.emit(&record_for(&entry.job, &outcome))?;
            let runtime = outcome.report.runtime;
            self.scheduler.record_completion(entry, runtime);
        }
        Ok(())
    }
}

fn record_for(job: &Job, outcome: &StepOutcome) -> OutputRecord {
    let runtime_ms = u64::try_from(outcome.report.runtime.as_millis()).unwrap_or(u64::MAX);
    OutputRecord {
        algorithm: job.spec().name.clone(),
        id_type: job.spec().id_type,
        scale: outcome.scale,
        seed: outcome.seed,
        runtime_ms,
        metrics: outcome.report.metrics.clone(),
    }
}
