//! Label table: class names index-aligned with the model output

use crate::error::GestureError;
use serde_json::Value;

/// Label used when an index has no entry in the table
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Entries that are empty, `null`, `false` or zero are kept as gaps and read as unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<Option<String>>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels: labels
                .into_iter()
                .map(|label| (!label.is_empty()).then_some(label))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON array of labels, or an object whose values are the labels.
    ///
    /// Object values are taken in enumeration order: integer-like keys ascending,
    /// then the remaining keys in document order.
    pub fn from_json(bytes: &[u8]) -> Result<Self, GestureError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| GestureError::LabelLoad(format!("Unparsable label table: {}", e)))?;

        let labels = match value {
            Value::Array(items) => items.iter().map(label_text).collect(),
            Value::Object(map) => {
                let mut indexed: Vec<(u32, &Value)> = Vec::new();
                let mut named: Vec<&Value> = Vec::new();
                for (key, value) in map.iter() {
                    match array_index(key) {
                        Some(index) => indexed.push((index, value)),
                        None => named.push(value),
                    }
                }
                indexed.sort_by_key(|(index, _)| *index);
                indexed
                    .into_iter()
                    .map(|(_, v)| v)
                    .chain(named)
                    .map(label_text)
                    .collect()
            }
            other => {
                return Err(GestureError::LabelLoad(format!(
                    "Label table must be an array or object, got {}",
                    json_type(&other)
                )))
            }
        };

        Ok(Self { labels })
    }

    /// Label at `index`; `None` when out of range or a gap
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index)?.as_deref()
    }

    /// Label at `index`, or [`UNKNOWN_LABEL`] when out of range or a gap
    pub fn label_for(&self, index: usize) -> &str {
        self.get(index).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in index order, gaps rendered as [`UNKNOWN_LABEL`]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.as_deref().unwrap_or(UNKNOWN_LABEL))
    }
}

fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

// Canonical non-negative integer keys, e.g. "0" or "12" but not "01"
fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
