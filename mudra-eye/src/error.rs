//! Error types for mudra-eye

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GestureError {
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Label load error: {0}")]
    LabelLoad(String),

    #[error("No frame available: {0}")]
    NoFrame(String),

    #[error("Tensor build error: {0}")]
    TensorBuild(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Empty model output: {0}")]
    EmptyOutput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, GestureError>;
