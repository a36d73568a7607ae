//! Variable values and their textual encoding
//!
//! Every row stores its value as text. Strings and numbers are written
//! verbatim, structured values (objects, arrays, null) as JSON.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value accepted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "serde_json::Value")]
pub enum Value {
    Number(serde_json::Number),
    Text(String),
    Json(serde_json::Value),
}

impl Value {
    /// Classify a JSON value. Booleans have no textual encoding and are rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Number(n) => Ok(Value::Number(n)),
            serde_json::Value::Bool(b) => Err(Error::UnsupportedValue(format!(
                "expected string, number, or object, got boolean `{}`",
                b
            ))),
            structured => Ok(Value::Json(structured)),
        }
    }

    /// Text written to the `value` column
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Json(v) => v.to_string(),
        }
    }
}

/// Stringify a legacy entry value: structured values become JSON, scalars their plain text.
pub fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl TryFrom<f64> for Value {
    type Error = Error;

    fn try_from(n: f64) -> Result<Self> {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| Error::UnsupportedValue(format!("non-finite number {}", n)))
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Value::from_json(value)
    }
}

/// Numeric coercion used for client-side ordering.
///
/// Blank text counts as zero. Text that does not parse as a float
/// (or parses as `NaN`) has no numeric key and sorts below every number.
pub fn numeric_key(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if !n.is_nan() => Some(n),
        _ => None,
    }
}
