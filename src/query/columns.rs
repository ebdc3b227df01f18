//! Column descriptors

use serde::{Deserialize, Serialize};

/// A column the view is computed over.
///
/// Only the key matters to the engine; labels and rendering metadata live
/// with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
}

impl Column {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Builds columns from a list of keys
    pub fn from_keys<I, S>(keys: I) -> Vec<Column>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        keys.into_iter().map(Column::new).collect()
    }
}

impl From<&str> for Column {
    fn from(key: &str) -> Self {
        Column::new(key)
    }
}
