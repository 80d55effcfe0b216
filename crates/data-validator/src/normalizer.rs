//! Request Payload Normalization
//!
//! Accepted shapes, tried in order:
//!
//! 1. `{"features": [1, 2, 3]}` - one row
//! 2. `{"data": [[1, 2, 3], [4, 5, 6]]}` - one row per inner array
//! 3. `{"b": 2, "a": 1}` - one row, columns in sorted key order (`a`, `b`)
//! 4. `[1, 2, 3]` or `[[1, 2, 3], [4, 5, 6]]` - bare vector or matrix
//!
//! Keyed objects are read in lexicographic key order, not in the order the
//! client wrote them. The model must have been trained with its columns in
//! that same order.

use crate::error::ValidationError;
use crate::matrix::FeatureMatrix;
use serde_json::{Map, Value};
use tracing::debug;

/// Recognized payload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Object with a `features` vector
    Features,
    /// Object with a `data` matrix
    Data,
    /// Object mapping feature names to numbers
    Keyed,
    /// Bare JSON array
    BareArray,
}

/// Determine which shape rule a payload falls under
pub fn detect_shape(payload: &Value) -> Option<PayloadShape> {
    match payload {
        Value::Object(map) if map.contains_key("features") => Some(PayloadShape::Features),
        Value::Object(map) if map.contains_key("data") => Some(PayloadShape::Data),
        Value::Object(map) if !map.is_empty() && map.values().all(Value::is_number) => {
            Some(PayloadShape::Keyed)
        }
        Value::Array(_) => Some(PayloadShape::BareArray),
        _ => None,
    }
}

/// Convert a request payload into a feature matrix
pub fn normalize(payload: &Value) -> Result<FeatureMatrix, ValidationError> {
    if is_empty(payload) {
        return Err(ValidationError::NoData);
    }

    let shape = detect_shape(payload).ok_or_else(|| {
        ValidationError::UnsupportedShape(format!("expected an object or array, got {}", kind(payload)))
    })?;
    debug!("Normalizing payload as {:?}", shape);

    match (shape, payload) {
        (PayloadShape::Features, Value::Object(map)) => {
            let row = number_row(&map["features"], "features")?;
            FeatureMatrix::single_row(row)
        }
        (PayloadShape::Data, Value::Object(map)) => {
            let rows = number_rows(&map["data"], "data")?;
            FeatureMatrix::from_rows(rows)
        }
        (PayloadShape::Keyed, Value::Object(map)) => keyed_row(map),
        (PayloadShape::BareArray, Value::Array(items)) => bare_array(items),
        _ => Err(ValidationError::UnsupportedShape(kind(payload).to_string())),
    }
}

/// Read a keyed object as one row in sorted key order
fn keyed_row(map: &Map<String, Value>) -> Result<FeatureMatrix, ValidationError> {
    let mut names: Vec<&String> = map.keys().collect();
    names.sort();

    let row = names
        .iter()
        .map(|name| number(&map[name.as_str()], name))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Processing keyed input with features: {:?}", names);
    let names = names.into_iter().cloned().collect();
    Ok(FeatureMatrix::single_row(row)?.with_feature_names(names))
}

/// A bare array is either one vector of numbers or a vector of rows
fn bare_array(items: &[Value]) -> Result<FeatureMatrix, ValidationError> {
    if items.iter().all(Value::is_number) {
        let row = items
            .iter()
            .enumerate()
            .map(|(i, v)| number(v, &format!("[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        return FeatureMatrix::single_row(row);
    }

    if items.iter().all(Value::is_array) {
        let rows = items
            .iter()
            .enumerate()
            .map(|(i, v)| number_row(v, &format!("[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        return FeatureMatrix::from_rows(rows);
    }

    Err(ValidationError::InvalidFormat(
        "array must contain only numbers or only arrays of numbers".to_string(),
    ))
}

fn number_rows(value: &Value, location: &str) -> Result<Vec<Vec<f64>>, ValidationError> {
    let rows = value.as_array().ok_or_else(|| {
        ValidationError::InvalidFormat(format!("{location} must be an array of arrays, got {}", kind(value)))
    })?;

    if rows.is_empty() {
        return Err(ValidationError::NoData);
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if !row.is_array() {
                return Err(ValidationError::InvalidFormat(format!(
                    "{location}[{i}] must be an array, got {}",
                    kind(row)
                )));
            }
            number_row(row, &format!("{location}[{i}]"))
        })
        .collect()
}

fn number_row(value: &Value, location: &str) -> Result<Vec<f64>, ValidationError> {
    let items = value.as_array().ok_or_else(|| {
        ValidationError::InvalidFormat(format!("{location} must be an array, got {}", kind(value)))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, v)| number(v, &format!("{location}[{i}]")))
        .collect()
}

fn number(value: &Value, location: &str) -> Result<f64, ValidationError> {
    value.as_f64().ok_or_else(|| {
        ValidationError::InvalidFormat(format!("{location} must be a number, got {}", kind(value)))
    })
}

/// Payloads that carry nothing to predict on
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
