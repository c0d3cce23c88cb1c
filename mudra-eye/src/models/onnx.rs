//! ONNX Runtime backed model runtime

use crate::error::GestureError;
use crate::models::descriptor::ModelDescriptor;
use crate::models::runtime::{
    DirectModel, GraphInput, GraphModel, ModelArtifacts, ModelHandle, ModelRuntime, PreparedModel, RawOutput,
    RepresentationKind, TensorSpec,
};
use crate::tensor::Tensor;
use async_trait::async_trait;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor as OrtTensor;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Loads the ONNX file named by the descriptor's weights manifest
#[derive(Debug, Clone, Default)]
pub struct OnnxRuntime {
    intra_threads: usize,
}

impl OnnxRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intra-op thread count; 0 lets ONNX Runtime decide
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads;
        self
    }

    fn create_session(&self, bytes: &[u8]) -> Result<Session, GestureError> {
        let mut builder = Session::builder()
            .map_err(|e| load_error("Failed to create session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error("Failed to set optimization level", e))?;

        if self.intra_threads > 0 {
            builder = builder
                .with_intra_threads(self.intra_threads)
                .map_err(|e| load_error("Failed to set thread count", e))?;
        }

        builder
            .commit_from_memory(bytes)
            .map_err(|e| load_error("Failed to load ONNX model", e))
    }
}

fn load_error(context: &str, err: impl std::fmt::Display) -> GestureError {
    GestureError::ModelLoad(format!("{}: {}", context, err))
}

fn inference_error(context: &str, err: impl std::fmt::Display) -> GestureError {
    GestureError::Inference(format!("{}: {}", context, err))
}

/// The first `.onnx` weight path, else the first path listed
fn onnx_weights_path(descriptor: &ModelDescriptor) -> Option<&str> {
    descriptor
        .weight_paths()
        .find(|path| path.ends_with(".onnx"))
        .or_else(|| descriptor.weight_paths().next())
}

#[async_trait]
impl ModelRuntime for OnnxRuntime {
    async fn prepare(
        &self,
        descriptor: &ModelDescriptor,
        artifacts: &ModelArtifacts<'_>,
    ) -> Result<Box<dyn PreparedModel>, GestureError> {
        let path = onnx_weights_path(descriptor)
            .ok_or_else(|| GestureError::ModelLoad("Descriptor lists no weight files".to_string()))?;
        let bytes = artifacts
            .fetch_relative(path)
            .await
            .map_err(|e| load_error(&format!("Failed to fetch weights {}", path), e))?;

        let session = self.create_session(&bytes)?;
        let inputs: Vec<TensorSpec> = session
            .inputs
            .iter()
            .map(|input| {
                let shape = input
                    .input_type
                    .tensor_shape()
                    .map(|dims| dims.iter().map(|&d| (d >= 0).then_some(d)).collect());
                TensorSpec::new(input.name.clone(), shape)
            })
            .collect();

        info!(
            "ONNX session ready from {} ({} bytes, {} inputs)",
            path,
            bytes.len(),
            inputs.len()
        );

        Ok(Box::new(OnnxModel {
            session: Arc::new(Mutex::new(session)),
            inputs,
        }))
    }
}

/// One committed session; every handle bound from it shares the session
#[derive(Clone)]
struct OnnxModel {
    session: Arc<Mutex<Session>>,
    inputs: Vec<TensorSpec>,
}

impl PreparedModel for OnnxModel {
    fn bind(&self, kind: RepresentationKind) -> Result<ModelHandle, GestureError> {
        Ok(match kind {
            RepresentationKind::Direct => ModelHandle::Direct(Box::new(self.clone())),
            RepresentationKind::Graph => ModelHandle::Graph(Box::new(self.clone())),
        })
    }
}

impl OnnxModel {
    fn run(&self, input: &Tensor, name: Option<&str>) -> Result<RawOutput, GestureError> {
        let value = OrtTensor::from_array(input.array().clone())
            .map_err(|e| inference_error("Failed to create input tensor", e))?;

        let mut session = self.session.lock();
        let outputs = match name {
            Some(name) => session.run(ort::inputs![name => value]),
            None => session.run(ort::inputs![value]),
        }
        .map_err(|e| inference_error("Session run failed", e))?;

        let mut named = Vec::new();
        for (output_name, output) in outputs.iter() {
            let array = output
                .try_extract_array::<f32>()
                .map_err(|e| inference_error("Failed to extract output tensor", e))?;
            named.push((output_name.to_string(), array.to_owned()));
        }
        Ok(RawOutput::Named(named))
    }
}

#[async_trait]
impl DirectModel for OnnxModel {
    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    async fn predict(&self, input: &Tensor) -> Result<RawOutput, GestureError> {
        self.run(input, None)
    }
}

#[async_trait]
impl GraphModel for OnnxModel {
    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    async fn execute(&self, input: GraphInput<'_>) -> Result<RawOutput, GestureError> {
        match input {
            GraphInput::Named(name, tensor) => self.run(tensor, Some(name)),
            GraphInput::Positional(tensor) => self.run(tensor, None),
        }
    }
}
