pub mod controller;

pub use controller::{CoordinationRelay, EvaluatorFactory, InProcessEvaluator};
