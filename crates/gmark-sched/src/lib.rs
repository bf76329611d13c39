#![deny(missing_docs)]
#![doc = "Credit-based fair scheduling and adaptive scale search for the gmark macro-benchmark harness."]

/// Startup configuration, selector parsing, and job construction.
pub mod config;
/// Credit-based fair scheduler over the active job pool.
pub mod credit;
/// Single-threaded driver loop and record sinks.
pub mod driver;
/// Benchmark job state and the scale-search state machine.
pub mod job;
/// Immutable catalogue of benchmarkable algorithms.
pub mod registry;

pub use config::{HarnessConfig, Selection};
pub use credit::{CreditScheduler, ScheduledJob};
pub use driver::{Driver, JsonLinesSink, RecordSink};
pub use job::{Job, StepOutcome, WARMUP_SCALE};
pub use registry::{AlgorithmEntry, TypeGroup, BUILTIN};
