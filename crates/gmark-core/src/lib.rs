#![deny(missing_docs)]
#![doc = "Core types, structured errors, and deterministic seeding for the gmark macro-benchmark harness."]

pub mod errors;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, GmarkError};
pub use rng::{derive_sample_seed, WARMUP_SUBSTREAM};
pub use types::{ExecutionReport, IdType, JobSpec, OutputRecord};
