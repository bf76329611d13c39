//! Benchmark job state and the adaptive scale-search state machine.
//!
//! Each job samples its current baseline scale to statistical sufficiency
//! while opportunistically probing one scale higher. The alternation (odd
//! sample count returns to the baseline, even count probes forward) means
//! probes deposit partial sample counts at higher scales before the baseline
//! reaches them; when the baseline advances it inherits those counts and
//! needs fewer additional runs to saturate.

use std::collections::BTreeMap;

use gmark_core::rng::{derive_sample_seed, WARMUP_SUBSTREAM};
use gmark_core::{ExecutionReport, JobSpec};
use gmark_exec::{Backend, ExecutionError};

/// Fixed scale for warm-up executions, independent of any baseline. Small
/// enough to be cheap at every parallelism, large enough to exercise the
/// backend's full plan-and-execute path.
pub const WARMUP_SCALE: u32 = 8;

/// Result of one successful [`Job::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Scale exponent that was executed.
    pub scale: u32,
    /// Generator seed the invocation ran with.
    pub seed: u64,
    /// Runtime and metrics returned by the backend.
    pub report: ExecutionReport,
}

/// One schedulable unit of benchmark work: algorithm × id representation,
/// together with its scale-search state.
#[derive(Debug, Clone)]
pub struct Job {
    spec: JobSpec,
    ratio: f64,
    target_samples: u32,
    low_scale: u32,
    current_scale: u32,
    sample_counts: BTreeMap<u32, u32>,
    terminal_bound: Option<u32>,
}

impl Job {
    /// Creates a job starting its scale search at `initial_scale`.
    ///
    /// `ratio` must be finite and positive and `target_samples` at least 1;
    /// both are validated by the configuration layer before jobs are built.
    pub fn new(spec: JobSpec, ratio: f64, initial_scale: u32, target_samples: u32) -> Self {
        let terminal_bound = spec.id_type.terminal_bound();
        Self {
            spec,
            ratio,
            target_samples,
            low_scale: initial_scale,
            current_scale: initial_scale,
            sample_counts: BTreeMap::new(),
            terminal_bound,
        }
    }

    /// Backend-facing identity of the job.
    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    /// Scheduling weight; runtime is divided by this before accruing credit.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Current baseline scale exponent.
    pub fn low_scale(&self) -> u32 {
        self.low_scale
    }

    /// Scale exponent the next invocation will run at.
    pub fn current_scale(&self) -> u32 {
        self.current_scale
    }

    /// Number of times the given scale has been executed so far.
    pub fn sample_count(&self, scale: u32) -> u32 {
        self.sample_counts.get(&scale).copied().unwrap_or(0)
    }

    /// Runs one throwaway execution at [`WARMUP_SCALE`], priming backend
    /// caches before measured runs. Neither counts nor credits are touched.
    pub fn warmup(&self, backend: &dyn Backend, master_seed: u64) -> Result<(), ExecutionError> {
        let seed = derive_sample_seed(master_seed, WARMUP_SUBSTREAM);
        backend.execute(&self.spec, WARMUP_SCALE, seed).map(|_| ())
    }

    /// Runs the job once at `current_scale` and advances the scale search.
    ///
    /// The k-th measured sample at any scale runs with the seed for
    /// substream `k`, so a retried or repeated sample reproduces its
    /// generator input exactly. On [`ExecutionError::Cancelled`] the state
    /// is untouched and the identical invocation can be retried.
    pub fn step(
        &mut self,
        backend: &dyn Backend,
        master_seed: u64,
    ) -> Result<StepOutcome, ExecutionError> {
        let scale = self.current_scale;
        let sample_index = self.sample_count(scale);
        let seed = derive_sample_seed(master_seed, u64::from(sample_index));
        let report = backend.execute(&self.spec, scale, seed)?;

        let count = {
            let entry = self.sample_counts.entry(scale).or_insert(0);
            *entry += 1;
            *entry
        };
        if count == self.target_samples {
            self.low_scale += 1;
            self.current_scale = self.low_scale;
        } else if count % 2 == 0 {
            self.current_scale = scale + 1;
        } else {
            self.current_scale = self.low_scale;
        }

        Ok(StepOutcome {
            scale,
            seed,
            report,
        })
    }

    /// True once a bounded id representation has pushed its baseline past
    /// the terminal bound. Unbounded representations never finish.
    pub fn is_finished(&self) -> bool {
        match self.terminal_bound {
            Some(bound) => self.low_scale > bound,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmark_core::IdType;
    use std::cell::RefCell;
    use std::collections::BTreeMap as Map;
    use std::time::Duration;

    struct FixedBackend {
        calls: RefCell<Vec<(u32, u64)>>,
        cancellations: RefCell<u32>,
    }

    impl FixedBackend {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                cancellations: RefCell::new(0),
            }
        }

        fn cancelling(count: u32) -> Self {
            let backend = Self::new();
            *backend.cancellations.borrow_mut() = count;
            backend
        }
    }

    impl Backend for FixedBackend {
        fn execute(
            &self,
            _spec: &JobSpec,
            scale: u32,
            seed: u64,
        ) -> Result<ExecutionReport, ExecutionError> {
            let mut remaining = self.cancellations.borrow_mut();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExecutionError::Cancelled);
            }
            self.calls.borrow_mut().push((scale, seed));
            Ok(ExecutionReport {
                runtime: Duration::from_millis(100),
                metrics: Map::new(),
            })
        }
    }

    fn job(id_type: IdType, initial_scale: u32, target_samples: u32) -> Job {
        let spec = JobSpec {
            name: "PageRank".to_string(),
            algorithm: "PageRank".to_string(),
            id_type,
            parameters: Map::new(),
        };
        Job::new(spec, 1.0, initial_scale, target_samples)
    }

    #[test]
    fn scale_trace_matches_probe_cadence() {
        let backend = FixedBackend::new();
        let mut job = job(IdType::Long, 16, 8);
        let mut trace = Vec::new();
        for _ in 0..10 {
            trace.push(job.step(&backend, 1).expect("step").scale);
        }
        assert_eq!(trace, vec![16, 16, 17, 16, 16, 17, 18, 16, 16, 17]);
    }

    #[test]
    fn baseline_advance_inherits_probe_counts() {
        let backend = FixedBackend::new();
        let mut job = job(IdType::Long, 16, 8);
        while job.low_scale() == 16 {
            job.step(&backend, 1).expect("step");
        }
        assert_eq!(job.low_scale(), 17);
        assert_eq!(job.current_scale(), 17);
        assert_eq!(job.sample_count(16), 8);
        // Probes at counts 2, 4, and 6 visited scale 17 before the advance.
        assert_eq!(job.sample_count(17), 3);
        assert_eq!(job.sample_count(18), 1);
    }

    #[test]
    fn single_sample_target_degenerates_to_monotonic_advance() {
        let backend = FixedBackend::new();
        let mut job = job(IdType::Long, 16, 1);
        for expected in 16..22 {
            let outcome = job.step(&backend, 1).expect("step");
            assert_eq!(outcome.scale, expected);
            assert_eq!(job.low_scale(), expected + 1);
        }
    }

    #[test]
    fn current_scale_never_drops_below_baseline() {
        let backend = FixedBackend::new();
        let mut job = job(IdType::Long, 12, 4);
        for _ in 0..100 {
            job.step(&backend, 1).expect("step");
            assert!(job.current_scale() >= job.low_scale());
        }
    }

    #[test]
    fn cancellation_leaves_state_untouched() {
        let cancelling = FixedBackend::cancelling(1);
        let mut job_a = job(IdType::Long, 16, 8);
        let mut job_b = job_a.clone();

        let err = job_a.step(&cancelling, 1).expect_err("cancelled");
        assert_eq!(err, ExecutionError::Cancelled);
        assert_eq!(job_a.sample_count(16), 0);
        assert_eq!(job_a.current_scale(), 16);

        // Retry after cancellation matches a run without the cancellation.
        let clean = FixedBackend::new();
        let retried = job_a.step(&cancelling, 1).expect("retry");
        let fresh = job_b.step(&clean, 1).expect("step");
        assert_eq!(retried, fresh);
        assert_eq!(job_a.current_scale(), job_b.current_scale());
    }

    #[test]
    fn sample_seeds_depend_only_on_sample_index() {
        let backend = FixedBackend::new();
        let mut job = job(IdType::Long, 16, 8);
        for _ in 0..7 {
            job.step(&backend, 9).expect("step");
        }
        let calls = backend.calls.borrow();
        // First visits to 16, 17, and 18 all use the substream-0 seed.
        let seed0 = calls[0].1;
        assert_eq!(calls[2], (17, seed0));
        assert_eq!(calls[6], (18, seed0));
        // Second visit to a scale moves to substream 1.
        assert_eq!(calls[1].0, 16);
        assert_ne!(calls[1].1, seed0);
        assert_eq!(calls[5], (17, calls[1].1));
    }

    #[test]
    fn bounded_type_finishes_past_terminal_bound() {
        let backend = FixedBackend::new();
        let mut job = job(IdType::Byte, 7, 1);
        assert!(!job.is_finished());
        job.step(&backend, 1).expect("step");
        assert_eq!(job.low_scale(), 8);
        assert!(job.is_finished());
    }

    #[test]
    fn unbounded_type_never_finishes() {
        let backend = FixedBackend::new();
        let mut job = job(IdType::Text, 10, 1);
        for _ in 0..50 {
            job.step(&backend, 1).expect("step");
        }
        assert!(!job.is_finished());
    }

    #[test]
    fn warmup_ignores_scale_state() {
        let backend = FixedBackend::new();
        let job = job(IdType::Long, 16, 8);
        job.warmup(&backend, 1).expect("warmup");
        let calls = backend.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, WARMUP_SCALE);
        assert_eq!(job.sample_count(WARMUP_SCALE), 0);
    }
}
