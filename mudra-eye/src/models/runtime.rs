//! Model runtime seam: how loaded classifiers are represented and executed

use crate::error::GestureError;
use crate::fetch::{resolve_relative, ArtifactFetcher};
use crate::models::descriptor::ModelDescriptor;
use crate::tensor::Tensor;
use async_trait::async_trait;
use bytes::Bytes;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a loaded model is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationKind {
    /// A single forward call on the input tensor
    Direct,
    /// Execution addressed by declared input tensor names
    Graph,
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepresentationKind::Direct => f.write_str("direct"),
            RepresentationKind::Graph => f.write_str("graph"),
        }
    }
}

/// A declared model input. `None` dimensions are dynamic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Option<Vec<Option<i64>>>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, shape: Option<Vec<Option<i64>>>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// Model output before decoding
#[derive(Debug)]
pub enum RawOutput<T = ArrayD<f32>> {
    Single(T),
    List(Vec<T>),
    Named(Vec<(String, T)>),
}

impl<T> RawOutput<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> RawOutput<U> {
        match self {
            RawOutput::Single(t) => RawOutput::Single(f(t)),
            RawOutput::List(items) => RawOutput::List(items.into_iter().map(f).collect()),
            RawOutput::Named(items) => RawOutput::Named(items.into_iter().map(|(k, v)| (k, f(v))).collect()),
        }
    }

    /// The first tensor; remaining tensors are dropped
    pub fn into_first(self) -> Option<T> {
        match self {
            RawOutput::Single(t) => Some(t),
            RawOutput::List(items) => items.into_iter().next(),
            RawOutput::Named(items) => items.into_iter().next().map(|(_, v)| v),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawOutput::Single(_) => 1,
            RawOutput::List(items) => items.len(),
            RawOutput::Named(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Input binding for graph execution
#[derive(Debug, Clone, Copy)]
pub enum GraphInput<'a> {
    Named(&'a str, &'a Tensor),
    Positional(&'a Tensor),
}

/// A model invoked with a single forward call
#[async_trait]
pub trait DirectModel: Send + Sync {
    fn inputs(&self) -> &[TensorSpec];

    async fn predict(&self, input: &Tensor) -> Result<RawOutput, GestureError>;
}

/// A model executed against named input tensors
#[async_trait]
pub trait GraphModel: Send + Sync {
    fn inputs(&self) -> &[TensorSpec];

    async fn execute(&self, input: GraphInput<'_>) -> Result<RawOutput, GestureError>;
}

/// A loaded classifier
pub enum ModelHandle {
    Direct(Box<dyn DirectModel>),
    Graph(Box<dyn GraphModel>),
}

impl ModelHandle {
    pub fn kind(&self) -> RepresentationKind {
        match self {
            ModelHandle::Direct(_) => RepresentationKind::Direct,
            ModelHandle::Graph(_) => RepresentationKind::Graph,
        }
    }

    pub fn inputs(&self) -> &[TensorSpec] {
        match self {
            ModelHandle::Direct(model) => model.inputs(),
            ModelHandle::Graph(model) => model.inputs(),
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("kind", &self.kind())
            .field("inputs", &self.inputs())
            .finish()
    }
}

/// Artifacts that sit next to a model descriptor
pub struct ModelArtifacts<'a> {
    fetcher: &'a dyn ArtifactFetcher,
    descriptor_location: &'a str,
}

impl<'a> ModelArtifacts<'a> {
    pub fn new(fetcher: &'a dyn ArtifactFetcher, descriptor_location: &'a str) -> Self {
        Self {
            fetcher,
            descriptor_location,
        }
    }

    pub fn descriptor_location(&self) -> &str {
        self.descriptor_location
    }

    /// Fetch `path`, resolved relative to the descriptor
    pub async fn fetch_relative(&self, path: &str) -> Result<Bytes, GestureError> {
        let location = resolve_relative(self.descriptor_location, path)?;
        self.fetcher.fetch(&location).await
    }
}

/// Builds executable models from descriptors.
///
/// Loading is split in two: [`ModelRuntime::prepare`] fetches and compiles the
/// weights once, then [`PreparedModel::bind`] is tried for each representation
/// kind in the descriptor's load order.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    async fn prepare(
        &self,
        descriptor: &ModelDescriptor,
        artifacts: &ModelArtifacts<'_>,
    ) -> Result<Box<dyn PreparedModel>, GestureError>;
}

/// Compiled weights that can be exposed as either representation kind
pub trait PreparedModel: Send + Sync {
    fn bind(&self, kind: RepresentationKind) -> Result<ModelHandle, GestureError>;
}

/// A model ready for recognition
#[derive(Debug)]
pub struct LoadedModel {
    pub handle: ModelHandle,
    pub input_size: u32,
}

impl LoadedModel {
    pub fn kind(&self) -> RepresentationKind {
        self.handle.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_output_into_first() {
        assert_eq!(RawOutput::Single(1).into_first(), Some(1));
        assert_eq!(RawOutput::List(vec![2, 3]).into_first(), Some(2));
        assert_eq!(RawOutput::<i32>::List(vec![]).into_first(), None);
        assert_eq!(
            RawOutput::Named(vec![("logits".to_string(), 4), ("aux".to_string(), 5)]).into_first(),
            Some(4)
        );
        assert_eq!(RawOutput::<i32>::Named(vec![]).into_first(), None);
    }

    #[test]
    fn test_raw_output_map_preserves_layout() {
        let mapped = RawOutput::Named(vec![("a".to_string(), 1), ("b".to_string(), 2)]).map(|v| v * 10);
        match mapped {
            RawOutput::Named(items) => {
                assert_eq!(items, vec![("a".to_string(), 10), ("b".to_string(), 20)]);
            }
            _ => panic!("Expected Named output"),
        }
    }

    #[test]
    fn test_raw_output_len() {
        assert_eq!(RawOutput::Single(0).len(), 1);
        assert!(RawOutput::<u8>::List(vec![]).is_empty());
    }

    #[test]
    fn test_representation_kind_display() {
        assert_eq!(RepresentationKind::Direct.to_string(), "direct");
        assert_eq!(RepresentationKind::Graph.to_string(), "graph");
    }
}
