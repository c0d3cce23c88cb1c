//! Model descriptor parsing and format detection

use crate::config::MAX_INPUT_SIZE;
use crate::error::GestureError;
use crate::models::runtime::RepresentationKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A group of weight files listed by the descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightsGroup {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub weights: Vec<Value>,
}

/// Model descriptor (`model.json`): format metadata, topology and weight manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub converted_by: Option<String>,
    #[serde(default)]
    pub model_topology: Option<Value>,
    #[serde(default)]
    pub weights_manifest: Vec<WeightsGroup>,
    #[serde(default)]
    pub signature: Option<Value>,
}

impl ModelDescriptor {
    pub fn parse(bytes: &[u8]) -> Result<Self, GestureError> {
        serde_json::from_slice(bytes)
            .map_err(|e| GestureError::ModelLoad(format!("Unparsable model descriptor: {}", e)))
    }

    /// Representation declared by the `format` field, if recognizable
    pub fn declared_kind(&self) -> Option<RepresentationKind> {
        let format = self.format.as_deref()?.to_lowercase();
        if format.contains("graph") {
            Some(RepresentationKind::Graph)
        } else if format.contains("layers") {
            Some(RepresentationKind::Direct)
        } else {
            None
        }
    }

    /// Loading strategies in the order they should be attempted
    pub fn load_order(&self) -> [RepresentationKind; 2] {
        match self.declared_kind() {
            Some(RepresentationKind::Graph) => [RepresentationKind::Graph, RepresentationKind::Direct],
            Some(RepresentationKind::Direct) | None => [RepresentationKind::Direct, RepresentationKind::Graph],
        }
    }

    /// All weight file paths in manifest order
    pub fn weight_paths(&self) -> impl Iterator<Item = &str> {
        self.weights_manifest
            .iter()
            .flat_map(|group| group.paths.iter().map(String::as_str))
    }

    /// Input shape declared inside the descriptor itself.
    ///
    /// Looks at the first layer's `batch_input_shape` (or `batch_shape`) of a layers
    /// topology, then at the first signature input's `tensorShape` of a graph model.
    pub fn declared_input_shape(&self) -> Option<Vec<Option<i64>>> {
        self.topology_input_shape().or_else(|| self.signature_input_shape())
    }

    fn topology_input_shape(&self) -> Option<Vec<Option<i64>>> {
        let topology = self.model_topology.as_ref()?;
        let root = topology.get("model_config").unwrap_or(topology);
        let first_layer = root.pointer("/config/layers/0/config")?;
        let shape = first_layer
            .get("batch_input_shape")
            .or_else(|| first_layer.get("batch_shape"))?
            .as_array()?;
        Some(shape.iter().map(dimension).collect())
    }

    fn signature_input_shape(&self) -> Option<Vec<Option<i64>>> {
        let inputs = self.signature.as_ref()?.get("inputs")?.as_object()?;
        let (_, first) = inputs.iter().next()?;
        let dims = first.pointer("/tensorShape/dim")?.as_array()?;
        Some(
            dims.iter()
                .map(|d| d.get("size").and_then(dimension))
                .collect(),
        )
    }
}

fn dimension(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Square input side from a `[batch, height, width, channels]` shape, or `default`
pub fn input_size_from_shape(shape: &[Option<i64>], default: u32) -> u32 {
    if shape.len() < 3 {
        return default;
    }
    match (shape[1], shape[2]) {
        (Some(h), Some(w)) if h == w && h > 0 && h <= MAX_INPUT_SIZE as i64 => h as u32,
        _ => default,
    }
}
