pub mod protocol;
pub mod service;

pub use protocol::{EvaluatorRequest, EvaluatorResponse, ResponsePayload};
pub use service::run_evaluator;
