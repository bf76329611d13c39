//! Credit-based fair scheduler over the pool of active jobs.
//!
//! Each completed invocation charges `runtime / ratio` to the job, so a job
//! with twice the ratio accrues credit half as fast and is selected roughly
//! twice as often over a long run. This is a virtual-time fair share over
//! arbitrarily many heterogeneous jobs with no preemption.
//!
//! Credits only change between dequeue and re-enqueue, never while a job is
//! resident in the heap, so an immutable-key binary heap is sufficient.
//! Ties between equal-credit jobs resolve by insertion order, which keeps a
//! run reproducible.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::job::Job;

/// A job together with its scheduling key while pooled.
#[derive(Debug)]
pub struct ScheduledJob {
    /// The job itself; mutated by the driver between dequeue and re-enqueue.
    pub job: Job,
    credits: f64,
    seq: u64,
}

impl ScheduledJob {
    /// Accumulated weighted runtime consumed by this job.
    pub fn credits(&self) -> f64 {
        self.credits
    }
}

impl PartialEq for ScheduledJob {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledJob {}

impl PartialOrd for ScheduledJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.credits
            .total_cmp(&other.credits)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-heap of active jobs keyed by `(credits, insertion sequence)`.
#[derive(Debug, Default)]
pub struct CreditScheduler {
    heap: BinaryHeap<Reverse<ScheduledJob>>,
    next_seq: u64,
}

impl CreditScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job to the active pool with zero credits.
    pub fn enqueue(&mut self, job: Job) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledJob {
            job,
            credits: 0.0,
            seq,
        }));
    }

    /// Removes and returns the least-credited active job, if any.
    pub fn select_next(&mut self) -> Option<ScheduledJob> {
        self.heap.pop().map(|Reverse(entry)| entry)
    }

    /// Charges the completed runtime to the job and re-pools it unless the
    /// job reports finished; a finished job is never revisited.
    pub fn record_completion(&mut self, mut entry: ScheduledJob, runtime: Duration) {
        entry.credits += runtime.as_secs_f64() / entry.job.ratio();
        if !entry.job.is_finished() {
            self.heap.push(Reverse(entry));
        }
    }

    /// True when no active jobs remain; the harness's terminal condition.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of active jobs in the pool.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Smallest credit value currently pooled, if any job remains.
    pub fn min_credits(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(entry)| entry.credits)
    }
}
