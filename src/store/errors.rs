//! Row decoding errors

use thiserror::Error;

/// Result type for row store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while decoding a row collection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The payload was not a JSON array
    #[error("rows must be a JSON array, got {0}")]
    NotAnArray(&'static str),

    /// An element of the array was not a JSON object
    #[error("row at offset {offset} must be a JSON object, got {found}")]
    NotAnObject { offset: usize, found: &'static str },
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
