use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

use gmark_core::errors::{ErrorInfo, GmarkError};
use gmark_core::{ExecutionReport, IdType, JobSpec, OutputRecord};
use gmark_exec::{Backend, ExecutionError};
use gmark_sched::{CreditScheduler, Driver, Job, RecordSink, WARMUP_SCALE};

/// Backend with a fixed per-invocation runtime, optional scripted
/// cancellations, and an optional fatal trip wire.
struct ScriptedBackend {
    runtime: Duration,
    cancel_on_calls: Vec<u64>,
    fatal_on_call: Option<u64>,
    calls: RefCell<u64>,
    log: RefCell<Vec<(String, u32)>>,
}

impl ScriptedBackend {
    fn with_runtime(runtime: Duration) -> Self {
        Self {
            runtime,
            cancel_on_calls: Vec::new(),
            fatal_on_call: None,
            calls: RefCell::new(0),
            log: RefCell::new(Vec::new()),
        }
    }

    fn cancelling_on(mut self, calls: Vec<u64>) -> Self {
        self.cancel_on_calls = calls;
        self
    }

    fn fatal_on(mut self, call: u64) -> Self {
        self.fatal_on_call = Some(call);
        self
    }
}

impl Backend for ScriptedBackend {
    fn execute(
        &self,
        spec: &JobSpec,
        scale: u32,
        _seed: u64,
    ) -> Result<ExecutionReport, ExecutionError> {
        let call = {
            let mut calls = self.calls.borrow_mut();
            *calls += 1;
            *calls
        };
        if self.cancel_on_calls.contains(&call) {
            return Err(ExecutionError::Cancelled);
        }
        if self.fatal_on_call == Some(call) {
            return Err(ExecutionError::Fatal(ErrorInfo::new(
                "boom",
                "scripted fatal failure",
            )));
        }
        self.log.borrow_mut().push((spec.name.clone(), scale));
        Ok(ExecutionReport {
            runtime: self.runtime,
            metrics: BTreeMap::from([("scale".to_string(), scale.to_string())]),
        })
    }
}

#[derive(Default)]
struct VecSink {
    records: Vec<OutputRecord>,
}

impl RecordSink for VecSink {
    fn emit(&mut self, record: &OutputRecord) -> Result<(), GmarkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

fn job(name: &str, id_type: IdType, ratio: f64, initial: u32, samples: u32) -> Job {
    let spec = JobSpec {
        name: name.to_string(),
        algorithm: name.to_string(),
        id_type,
        parameters: BTreeMap::new(),
    };
    Job::new(spec, ratio, initial, samples)
}

/// A byte job starting at scale 6 with two samples per scale runs exactly
/// four times (6, 6, 7, 7) before its baseline passes the terminal bound.
#[test]
fn bounded_jobs_drain_the_pool() {
    let backend = ScriptedBackend::with_runtime(Duration::from_millis(250));
    let mut driver = Driver::new(&backend, 7);
    driver.admit(job("a", IdType::Byte, 1.0, 6, 2)).expect("admit");
    driver.admit(job("b", IdType::Byte, 1.0, 6, 2)).expect("admit");
    assert_eq!(driver.active_jobs(), 2);

    let mut sink = VecSink::default();
    driver.run(&mut sink).expect("run");

    assert_eq!(driver.active_jobs(), 0);
    assert_eq!(sink.records.len(), 8);
    for name in ["a", "b"] {
        let scales: Vec<u32> = sink
            .records
            .iter()
            .filter(|record| record.algorithm == name)
            .map(|record| record.scale)
            .collect();
        assert_eq!(scales, vec![6, 6, 7, 7]);
    }
}

#[test]
fn warmup_runs_are_not_recorded() {
    let backend = ScriptedBackend::with_runtime(Duration::from_millis(10));
    let mut driver = Driver::new(&backend, 7);
    driver.admit(job("a", IdType::Byte, 1.0, 7, 1)).expect("admit");

    // Admission triggered exactly one warm-up call at the fixed scale.
    {
        let log = backend.log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1, WARMUP_SCALE);
    }

    let mut sink = VecSink::default();
    driver.run(&mut sink).expect("run");
    assert!(sink.records.iter().all(|record| record.scale != WARMUP_SCALE));
}

/// Injecting a cancellation must leave records, scales, and seeds exactly
/// as in a run where the cancellation never happened.
#[test]
fn cancellation_is_invisible_to_output() {
    let clean = ScriptedBackend::with_runtime(Duration::from_millis(100));
    let mut driver = Driver::new(&clean, 11);
    driver.admit(job("a", IdType::Byte, 1.0, 6, 2)).expect("admit");
    let mut clean_sink = VecSink::default();
    driver.run(&mut clean_sink).expect("run");

    // Call 1 is the warm-up; cancel the second measured invocation twice.
    let cancelling =
        ScriptedBackend::with_runtime(Duration::from_millis(100)).cancelling_on(vec![3, 4]);
    let mut driver = Driver::new(&cancelling, 11);
    driver.admit(job("a", IdType::Byte, 1.0, 6, 2)).expect("admit");
    let mut sink = VecSink::default();
    driver.run(&mut sink).expect("run");

    assert_eq!(sink.records, clean_sink.records);
}

#[test]
fn fatal_backend_error_aborts_the_run() {
    let backend = ScriptedBackend::with_runtime(Duration::from_millis(10)).fatal_on(4);
    let mut driver = Driver::new(&backend, 3);
    driver.admit(job("a", IdType::Byte, 1.0, 6, 2)).expect("admit");

    let mut sink = VecSink::default();
    let err = driver.run(&mut sink).expect_err("fatal");
    match err {
        GmarkError::Execution(info) => assert_eq!(info.code, "boom"),
        other => panic!("unexpected error {other}"),
    }
    // The two successful invocations before the failure were recorded.
    assert_eq!(sink.records.len(), 2);
}

/// Property 7 of the harness: with equal fixed runtimes, invocation counts
/// converge to the ratio of the configured weights.
#[test]
fn weighted_jobs_share_rounds_proportionally() {
    let backend = ScriptedBackend::with_runtime(Duration::from_secs(1));
    let mut scheduler = CreditScheduler::new();
    scheduler.enqueue(job("a", IdType::Long, 1.0, 16, 8));
    scheduler.enqueue(job("b", IdType::Long, 3.0, 16, 8));

    let mut selections: BTreeMap<String, u32> = BTreeMap::new();
    for _ in 0..400 {
        let mut entry = scheduler.select_next().expect("job");
        let outcome = entry.job.step(&backend, 5).expect("step");
        *selections.entry(entry.job.spec().name.clone()).or_insert(0) += 1;
        scheduler.record_completion(entry, outcome.report.runtime);
    }

    let a = f64::from(selections["a"]);
    let b = f64::from(selections["b"]);
    assert!((b / a - 3.0).abs() < 0.1, "unfair split: a={a} b={b}");
}

/// At every decision the selected job's credits are minimal in the pool.
#[test]
fn selection_always_picks_minimal_credits() {
    let backend = ScriptedBackend::with_runtime(Duration::from_millis(500));
    let mut scheduler = CreditScheduler::new();
    for (name, ratio) in [("a", 1.0), ("b", 2.0), ("c", 0.5)] {
        scheduler.enqueue(job(name, IdType::Long, ratio, 16, 8));
    }
    let mut previous = Vec::new();
    for _ in 0..60 {
        let mut entry = scheduler.select_next().expect("job");
        if let Some(min) = scheduler.min_credits() {
            assert!(entry.credits() <= min);
        }
        let name = entry.job.spec().name.clone();
        let outcome = entry.job.step(&backend, 5).expect("step");
        let credits_before = entry.credits();
        scheduler.record_completion(entry, outcome.report.runtime);
        previous.push((name, credits_before));
    }
    // Credits per job are monotonically non-decreasing over the run.
    let mut last: BTreeMap<String, f64> = BTreeMap::new();
    for (name, credits) in previous {
        if let Some(seen) = last.get(&name) {
            assert!(credits >= *seen);
        }
        last.insert(name, credits);
    }
}
