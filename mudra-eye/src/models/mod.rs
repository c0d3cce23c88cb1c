//! Model loading, labels and the runtime seam

pub mod descriptor;
pub mod labels;
pub mod manager;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod runtime;

pub use descriptor::ModelDescriptor;
pub use labels::{LabelTable, UNKNOWN_LABEL};
pub use manager::ModelManager;
#[cfg(feature = "onnx")]
pub use onnx::OnnxRuntime;
pub use runtime::{
    DirectModel, GraphInput, GraphModel, LoadedModel, ModelArtifacts, ModelHandle, ModelRuntime, PreparedModel,
    RawOutput, RepresentationKind, TensorSpec,
};
