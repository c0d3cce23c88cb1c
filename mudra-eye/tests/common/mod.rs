//! Shared fixtures for mudra-eye integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, Rgb, RgbImage};
use mudra_eye::error::GestureError;
use mudra_eye::fetch::ArtifactFetcher;
use mudra_eye::frame::encode_data_url;
use mudra_eye::models::{
    DirectModel, GraphInput, GraphModel, ModelArtifacts, ModelDescriptor, ModelHandle, ModelRuntime, PreparedModel,
    RawOutput, RepresentationKind, TensorSpec,
};
use mudra_eye::tensor::Tensor;
use ndarray::ArrayD;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const MODEL_URL: &str = "https://models.example.com/gestures/model.json";
pub const LABELS_URL: &str = "https://models.example.com/gestures/labels.json";

/// In-memory artifact store that counts fetches per location
#[derive(Default)]
pub struct MemoryFetcher {
    files: Mutex<HashMap<String, Vec<u8>>>,
    counts: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, location: &str, body: impl Into<Vec<u8>>) -> Self {
        self.files.lock().insert(location.to_string(), body.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn put(&self, location: &str, body: impl Into<Vec<u8>>) {
        self.files.lock().insert(location.to_string(), body.into());
    }

    pub fn count(&self, location: &str) -> usize {
        self.counts.lock().get(location).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ArtifactFetcher for MemoryFetcher {
    async fn fetch(&self, location: &str) -> Result<Bytes, GestureError> {
        *self.counts.lock().entry(location.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let body = self.files.lock().get(location).cloned();
        body.map(Bytes::from).ok_or_else(|| {
            GestureError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", location),
            ))
        })
    }
}

/// How the scripted model reacts to execution requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Every request succeeds
    Succeed,
    /// Every request fails
    Fail,
    /// Only positional graph execution succeeds
    PositionalOnly,
}

/// Runtime whose models return fixed scores and record what they were fed
pub struct ScriptedRuntime {
    scores: Vec<f32>,
    inputs: Vec<TensorSpec>,
    behaviour: Behaviour,
    pub loads: AtomicUsize,
    pub seen_shapes: Arc<Mutex<Vec<Vec<usize>>>>,
    pub seen_bindings: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedRuntime {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            inputs: Vec::new(),
            behaviour: Behaviour::Succeed,
            loads: AtomicUsize::new(0),
            seen_shapes: Arc::new(Mutex::new(Vec::new())),
            seen_bindings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_input(mut self, name: &str, shape: Option<Vec<Option<i64>>>) -> Self {
        self.inputs.push(TensorSpec::new(name, shape));
        self
    }

    pub fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelRuntime for ScriptedRuntime {
    async fn prepare(
        &self,
        _descriptor: &ModelDescriptor,
        _artifacts: &ModelArtifacts<'_>,
    ) -> Result<Box<dyn PreparedModel>, GestureError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedModel {
            scores: self.scores.clone(),
            inputs: self.inputs.clone(),
            behaviour: self.behaviour,
            seen_shapes: self.seen_shapes.clone(),
            seen_bindings: self.seen_bindings.clone(),
        }))
    }
}

impl PreparedModel for ScriptedModel {
    fn bind(&self, kind: RepresentationKind) -> Result<ModelHandle, GestureError> {
        Ok(match kind {
            RepresentationKind::Direct => ModelHandle::Direct(Box::new(self.clone())),
            RepresentationKind::Graph => ModelHandle::Graph(Box::new(self.clone())),
        })
    }
}

#[derive(Clone)]
struct ScriptedModel {
    scores: Vec<f32>,
    inputs: Vec<TensorSpec>,
    behaviour: Behaviour,
    seen_shapes: Arc<Mutex<Vec<Vec<usize>>>>,
    seen_bindings: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedModel {
    fn respond(&self, input: &Tensor, binding: Option<String>) -> Result<RawOutput, GestureError> {
        self.seen_shapes.lock().push(input.shape().to_vec());
        let positional = binding.is_none();
        self.seen_bindings.lock().push(binding);

        let accepted = match self.behaviour {
            Behaviour::Succeed => true,
            Behaviour::Fail => false,
            Behaviour::PositionalOnly => positional,
        };
        if !accepted {
            return Err(GestureError::Inference("scripted failure".to_string()));
        }

        let logits = ArrayD::from_shape_vec(vec![1, self.scores.len()], self.scores.clone())
            .map_err(|e| GestureError::Inference(e.to_string()))?;
        Ok(RawOutput::List(vec![logits]))
    }
}

#[async_trait]
impl DirectModel for ScriptedModel {
    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    async fn predict(&self, input: &Tensor) -> Result<RawOutput, GestureError> {
        self.respond(input, None)
    }
}

#[async_trait]
impl GraphModel for ScriptedModel {
    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    async fn execute(&self, input: GraphInput<'_>) -> Result<RawOutput, GestureError> {
        match input {
            GraphInput::Named(name, tensor) => self.respond(tensor, Some(name.to_string())),
            GraphInput::Positional(tensor) => self.respond(tensor, None),
        }
    }
}

/// A solid-colour PNG frame as a data URL
pub fn png_data_url(width: u32, height: u32, color: [u8; 3]) -> String {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .expect("encode png");
    encode_data_url(&bytes, "image/png")
}
