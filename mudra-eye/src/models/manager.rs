//! Model manager: fetches the descriptor, picks a loading strategy and loads labels

use crate::config::RecognizerConfig;
use crate::error::GestureError;
use crate::fetch::ArtifactFetcher;
use crate::models::descriptor::{input_size_from_shape, ModelDescriptor};
use crate::models::labels::LabelTable;
use crate::models::runtime::{LoadedModel, ModelArtifacts, ModelHandle, ModelRuntime};
use std::sync::Arc;
use tracing::{info, warn};

/// Loads the classifier and its label table
pub struct ModelManager {
    config: Arc<RecognizerConfig>,
    fetcher: Arc<dyn ArtifactFetcher>,
    runtime: Arc<dyn ModelRuntime>,
}

impl ModelManager {
    /// Create a new model manager
    pub fn new(
        config: Arc<RecognizerConfig>,
        fetcher: Arc<dyn ArtifactFetcher>,
        runtime: Arc<dyn ModelRuntime>,
    ) -> Self {
        Self {
            config,
            fetcher,
            runtime,
        }
    }

    /// Fetch and parse the descriptor, then try each loading strategy in order
    pub async fn load_model(&self) -> Result<LoadedModel, GestureError> {
        let location = self.config.model_url.as_str();
        info!("Loading model descriptor from {}", location);

        let bytes = self
            .fetcher
            .fetch(location)
            .await
            .map_err(|e| GestureError::ModelLoad(format!("Failed to fetch {}: {}", location, e)))?;
        let descriptor = ModelDescriptor::parse(&bytes)?;

        let artifacts = ModelArtifacts::new(self.fetcher.as_ref(), location);
        let prepared = self
            .runtime
            .prepare(&descriptor, &artifacts)
            .await
            .map_err(|e| GestureError::ModelLoad(format!("Failed to prepare {}: {}", location, e)))?;
        let mut failures = Vec::new();

        for kind in descriptor.load_order() {
            match prepared.bind(kind) {
                Ok(handle) => {
                    let input_size = resolve_input_size(&handle, &descriptor, self.config.default_input_size);
                    info!("Model loaded ({}), input size {}", handle.kind(), input_size);
                    return Ok(LoadedModel { handle, input_size });
                }
                Err(e) => {
                    warn!("Loading {} as a {} model failed: {}", location, kind, e);
                    failures.push(format!("{}: {}", kind, e));
                }
            }
        }

        Err(GestureError::ModelLoad(format!(
            "No loading strategy succeeded for {} ({})",
            location,
            failures.join("; ")
        )))
    }

    /// Fetch and parse the label table
    pub async fn try_load_labels(&self) -> Result<LabelTable, GestureError> {
        let location = self.config.labels_url.as_str();
        let bytes = self
            .fetcher
            .fetch(location)
            .await
            .map_err(|e| GestureError::LabelLoad(format!("Failed to fetch {}: {}", location, e)))?;
        LabelTable::from_json(&bytes)
    }

    /// Load the label table, degrading to an empty table on failure
    pub async fn load_labels(&self) -> LabelTable {
        match self.try_load_labels().await {
            Ok(labels) => {
                info!("Labels loaded: {}", labels.len());
                labels
            }
            Err(e) => {
                warn!("Failed to load labels, continuing without them: {}", e);
                LabelTable::empty()
            }
        }
    }
}

/// The runtime's declared input shape wins; the descriptor's is the fallback
fn resolve_input_size(handle: &ModelHandle, descriptor: &ModelDescriptor, default: u32) -> u32 {
    let shape = handle
        .inputs()
        .first()
        .and_then(|input| input.shape.clone())
        .or_else(|| descriptor.declared_input_shape());

    shape
        .map(|shape| input_size_from_shape(&shape, default))
        .unwrap_or(default)
}
