//! Output decoding: scores, arg-max and label lookup

use crate::error::GestureError;
use crate::models::labels::LabelTable;
use crate::models::runtime::RawOutput;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Outcome of one recognition call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub index: usize,
    pub scores: Vec<f32>,
}

/// Index of the largest score; ties go to the lowest index and NaN never wins.
///
/// Returns `None` for an empty slice and `Some(0)` when every score is NaN.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }

    Some(best.map(|(index, _)| index).unwrap_or(0))
}

/// Decode the first output tensor into a prediction
pub fn decode(output: RawOutput<Tensor>, labels: &LabelTable) -> Result<PredictionResult, GestureError> {
    let outputs = output.len();
    let logits = output
        .into_first()
        .ok_or_else(|| GestureError::EmptyOutput(format!("Model returned {} tensors", outputs)))?;

    let scores = logits.to_vec();
    drop(logits);

    let index = argmax(&scores)
        .ok_or_else(|| GestureError::EmptyOutput("Output tensor has no values".to_string()))?;

    Ok(PredictionResult {
        label: labels.label_for(index).to_string(),
        index,
        scores,
    })
}
