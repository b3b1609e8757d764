use std::time::Duration;

use thiserror::Error;

/// Failures raised by the classifier gateway itself.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The model never loaded, or every source failed. Cleared only by an
    /// explicit retry.
    #[error("classifier model is not available")]
    ModelUnavailable,

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Failures observed by callers of the coordination relay. None of these
/// are fatal: the monitor treats every variant as "no classifier signal
/// this cycle" and the other detection methods keep running.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The evaluator answered with a structured error (model not loaded,
    /// frame decode failure, inference fault).
    #[error("evaluator rejected the request: {0}")]
    Rejected(String),

    /// No response arrived within the bounded wait. The pending entry is
    /// discarded; a late response for the same id is dropped unmatched.
    #[error("no analysis response within {0:?}")]
    Timeout(Duration),

    /// The evaluation context could not be provisioned or reached.
    #[error("evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),
}
