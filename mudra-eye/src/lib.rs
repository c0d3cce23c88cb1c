//! mudra-eye: gesture recognition from camera frames
//!
//! Loads a pretrained image classifier and its label table, turns a still
//! frame into a normalized `[1, N, N, 3]` tensor, runs the model and maps the
//! arg-max of its output to a gesture label.
//!
//! The numerical runtime sits behind [`models::ModelRuntime`]; enable the
//! `onnx` feature for an ONNX Runtime backed implementation.

pub mod config;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod tensor;

pub use config::{RecognizerConfig, ResizePolicy};
pub use error::GestureError;
pub use frame::{FrameCapture, FrameSource, VideoHandle};
pub use pipeline::{InferenceContext, ReadyState};
pub use processing::PredictionResult;
