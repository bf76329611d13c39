#![deny(missing_docs)]
#![doc = "Execution backend boundary for the gmark harness: the `Backend` trait plus the subprocess runner adapter."]

use gmark_core::errors::ErrorInfo;
use gmark_core::{ExecutionReport, JobSpec};
use thiserror::Error;

mod subprocess;

pub use subprocess::SubprocessBackend;

/// Failure taxonomy for a single backend invocation.
///
/// `Cancelled` is the only recoverable variant: it signals a backend-side
/// abort of the submitted work with no semantic failure, and the caller
/// retries the identical invocation. Everything else is fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Transient backend cancellation of one invocation.
    #[error("invocation cancelled by backend")]
    Cancelled,
    /// Any other backend failure; aborts the whole run.
    #[error("backend execution failed: {0}")]
    Fatal(ErrorInfo),
}

/// Opaque execution service that runs one job at one scale.
///
/// The call blocks until the backend returns a definitive outcome. The
/// backend may fan out internally, but from the harness's perspective this
/// is one atomic submit-and-await step.
pub trait Backend {
    /// Runs `spec` against a synthetic graph of `2^scale` vertices.
    fn execute(
        &self,
        spec: &JobSpec,
        scale: u32,
        seed: u64,
    ) -> Result<ExecutionReport, ExecutionError>;
}
