//! Recognition pipeline: frame in, labelled prediction out

use crate::config::RecognizerConfig;
use crate::error::GestureError;
use crate::fetch::{ArtifactFetcher, DefaultFetcher};
use crate::frame::{extract_frame, FrameSource};
use crate::models::{LabelTable, LoadedModel, ModelManager, ModelRuntime};
use crate::processing::{decode, predict, PredictionResult};
use crate::tensor::{build_input_tensor, TensorRegistry};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Progress of a single recognition call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Loading,
    FrameCaptured,
    TensorBuilt,
    Executed,
    Decoded,
    Released,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Loading => "loading",
            Stage::FrameCaptured => "frame_captured",
            Stage::TensorBuilt => "tensor_built",
            Stage::Executed => "executed",
            Stage::Decoded => "decoded",
            Stage::Released => "released",
        };
        f.write_str(name)
    }
}

/// Model and labels, both resident
#[derive(Debug, Clone)]
pub struct ReadyState {
    pub model: Arc<LoadedModel>,
    pub labels: Arc<LabelTable>,
}

/// Caller-owned recognition context.
///
/// Holds at most one model and one label table, each loaded on first use.
/// A failed model load leaves the context unloaded so the next call retries.
pub struct InferenceContext {
    config: Arc<RecognizerConfig>,
    manager: ModelManager,
    model: OnceCell<Arc<LoadedModel>>,
    labels: OnceCell<Arc<LabelTable>>,
    registry: TensorRegistry,
}

impl InferenceContext {
    /// Create a context with explicit fetcher and runtime
    pub fn new(
        config: RecognizerConfig,
        fetcher: Arc<dyn ArtifactFetcher>,
        runtime: Arc<dyn ModelRuntime>,
    ) -> Result<Self, GestureError> {
        config.validate().map_err(GestureError::Config)?;
        let config = Arc::new(config);

        Ok(Self {
            manager: ModelManager::new(config.clone(), fetcher, runtime),
            config,
            model: OnceCell::new(),
            labels: OnceCell::new(),
            registry: TensorRegistry::new(),
        })
    }

    /// Create a context that fetches over HTTP(S) or from disk depending on the location
    pub fn with_default_fetcher(
        config: RecognizerConfig,
        runtime: Arc<dyn ModelRuntime>,
    ) -> Result<Self, GestureError> {
        let timeout = config.request_timeout_secs.map(Duration::from_secs);
        let fetcher = Arc::new(DefaultFetcher::new(timeout)?);
        Self::new(config, fetcher, runtime)
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Tensor accounting for this context
    pub fn registry(&self) -> &TensorRegistry {
        &self.registry
    }

    pub fn is_ready(&self) -> bool {
        self.model.initialized() && self.labels.initialized()
    }

    /// Load the model and labels if not already resident.
    ///
    /// Labels are attempted even when the model fails to load.
    pub async fn ensure_ready(&self) -> Result<ReadyState, GestureError> {
        let (model, labels) = tokio::join!(self.model(), self.labels());
        Ok(ReadyState {
            model: model?,
            labels,
        })
    }

    async fn model(&self) -> Result<Arc<LoadedModel>, GestureError> {
        self.model
            .get_or_try_init(|| async { self.manager.load_model().await.map(Arc::new) })
            .await
            .cloned()
    }

    async fn labels(&self) -> Arc<LabelTable> {
        self.labels
            .get_or_init(|| async { Arc::new(self.manager.load_labels().await) })
            .await
            .clone()
    }

    /// Recognize the gesture in the current frame of `source`
    pub async fn recognize(&self, source: FrameSource) -> Result<PredictionResult, GestureError> {
        let result = self.run(&source).await;
        debug!(stage = %Stage::Released, live_tensors = self.registry.live(), "Recognition finished");

        match &result {
            Ok(prediction) => info!("Recognized {} (index {})", prediction.label, prediction.index),
            Err(e) => error!("Recognition failed: {}", e),
        }
        result
    }

    async fn run(&self, source: &FrameSource) -> Result<PredictionResult, GestureError> {
        debug!(stage = %Stage::Idle, "Recognition requested");
        if !self.is_ready() {
            debug!(stage = %Stage::Loading, "Loading model and labels");
        }
        let ready = self.ensure_ready().await?;

        let still = extract_frame(source)
            .ok_or_else(|| GestureError::NoFrame(format!("{:?} yielded no frame", source)))?;
        debug!(stage = %Stage::FrameCaptured);

        let tensor = build_input_tensor(
            still,
            ready.model.input_size,
            self.config.resize_policy,
            &self.registry,
        )
        .await?;
        debug!(stage = %Stage::TensorBuilt, shape = ?tensor.shape());

        let output = predict(&ready.model.handle, &tensor).await?;
        drop(tensor);
        let output = output.map(|array| self.registry.track(array));
        debug!(stage = %Stage::Executed, outputs = output.len());

        let prediction = decode(output, &ready.labels)?;
        debug!(stage = %Stage::Decoded, index = prediction.index);
        Ok(prediction)
    }
}
