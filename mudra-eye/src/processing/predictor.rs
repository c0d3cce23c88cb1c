//! Model execution with an ordered list of strategies

use crate::error::GestureError;
use crate::models::runtime::{GraphInput, GraphModel, ModelHandle, RawOutput};
use crate::tensor::Tensor;
use std::fmt;
use tracing::{debug, warn};

/// One way of feeding the input tensor to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Single forward call on a direct model
    Direct,
    /// Graph execution with the tensor bound to a named input
    Named(String),
    /// Graph execution with the tensor passed positionally
    Positional,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStrategy::Direct => f.write_str("direct"),
            ExecutionStrategy::Named(name) => write!(f, "named({})", name),
            ExecutionStrategy::Positional => f.write_str("positional"),
        }
    }
}

/// Strategies to attempt, in order, for `handle`
pub fn execution_plan(handle: &ModelHandle) -> Vec<ExecutionStrategy> {
    match handle {
        ModelHandle::Direct(_) => vec![ExecutionStrategy::Direct],
        ModelHandle::Graph(model) => graph_plan(model.as_ref()),
    }
}

fn graph_plan(model: &dyn GraphModel) -> Vec<ExecutionStrategy> {
    let mut plan = Vec::with_capacity(3);
    if let Some(raw) = model.inputs().first().map(|input| input.name.as_str()) {
        let stripped = strip_tensor_suffix(raw);
        if !stripped.is_empty() {
            plan.push(ExecutionStrategy::Named(stripped.to_string()));
        }
        if stripped != raw && !raw.is_empty() {
            plan.push(ExecutionStrategy::Named(raw.to_string()));
        }
    }
    plan.push(ExecutionStrategy::Positional);
    plan
}

/// `"input_1:0"` -> `"input_1"`
pub fn strip_tensor_suffix(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}

/// Run `input` through `handle`, returning the first successful output
pub async fn predict(handle: &ModelHandle, input: &Tensor) -> Result<RawOutput, GestureError> {
    let plan = execution_plan(handle);
    let mut failures = Vec::with_capacity(plan.len());

    for strategy in &plan {
        debug!("Executing model with strategy {}", strategy);
        match run(handle, strategy, input).await {
            Ok(output) => return Ok(output),
            Err(e) => {
                warn!("Execution strategy {} failed: {}", strategy, e);
                failures.push(format!("{}: {}", strategy, e));
            }
        }
    }

    Err(GestureError::Inference(format!(
        "All execution strategies failed [{}]",
        failures.join("; ")
    )))
}

async fn run(handle: &ModelHandle, strategy: &ExecutionStrategy, input: &Tensor) -> Result<RawOutput, GestureError> {
    match (handle, strategy) {
        (ModelHandle::Direct(model), ExecutionStrategy::Direct) => model.predict(input).await,
        (ModelHandle::Graph(model), ExecutionStrategy::Named(name)) => {
            model.execute(GraphInput::Named(name, input)).await
        }
        (ModelHandle::Graph(model), ExecutionStrategy::Positional) => {
            model.execute(GraphInput::Positional(input)).await
        }
        (handle, strategy) => Err(GestureError::Inference(format!(
            "Strategy {} does not apply to a {} model",
            strategy,
            handle.kind()
        ))),
    }
}
