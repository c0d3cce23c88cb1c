//! Configuration for mudra-eye

use crate::error::GestureError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fallback input resolution when the model does not declare a usable one
pub const DEFAULT_INPUT_SIZE: u32 = 64;

/// Largest input resolution accepted from configuration
pub const MAX_INPUT_SIZE: u32 = 4096;

/// How a frame is fitted onto the square model input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePolicy {
    /// Scale both axes independently to the target size
    #[default]
    Stretch,
    /// Preserve aspect ratio and center the frame on a canvas filled with `fill`
    Pad { fill: [u8; 3] },
}

/// Recognizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Location of the model descriptor (URL or file path)
    pub model_url: String,
    /// Location of the label table (URL or file path)
    pub labels_url: String,
    /// Input size used when the model declares none
    pub default_input_size: u32,
    /// Frame fitting policy
    pub resize_policy: ResizePolicy,
    /// HTTP request timeout; no timeout when unset
    pub request_timeout_secs: Option<u64>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_url: "model/model.json".to_string(),
            labels_url: "model/labels.json".to_string(),
            default_input_size: DEFAULT_INPUT_SIZE,
            resize_policy: ResizePolicy::Stretch,
            request_timeout_secs: None,
        }
    }
}

impl RecognizerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model_url.trim().is_empty() {
            return Err("Model location must not be empty".to_string());
        }

        if self.labels_url.trim().is_empty() {
            return Err("Labels location must not be empty".to_string());
        }

        if self.default_input_size == 0 || self.default_input_size > MAX_INPUT_SIZE {
            return Err(format!(
                "Default input size must be between 1 and {}",
                MAX_INPUT_SIZE
            ));
        }

        if self.request_timeout_secs == Some(0) {
            return Err("Request timeout must be at least one second".to_string());
        }

        Ok(())
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, GestureError> {
        let config: RecognizerConfig = toml::from_str(source)
            .map_err(|e| GestureError::Config(format!("Invalid config: {}", e)))?;
        config.validate().map_err(GestureError::Config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GestureError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            GestureError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&source)
    }
}
