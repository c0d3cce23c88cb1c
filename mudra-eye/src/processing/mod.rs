//! Model execution and output decoding

pub mod decoder;
pub mod predictor;

pub use decoder::{argmax, decode, PredictionResult};
pub use predictor::{execution_plan, predict, ExecutionStrategy};
