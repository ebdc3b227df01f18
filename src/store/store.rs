//! Versioned row collection

use serde_json::{Map, Value};

use super::errors::{json_kind, StoreError, StoreResult};

/// One keyed record: column key to scalar cell value
pub type Row = Map<String, Value>;

/// The current row collection and its version counter.
///
/// The version starts at 0 and is bumped exactly once per [`RowStore::replace`].
/// Anything derived from the rows (indexes, filter results, comparators) is
/// stamped with the version it was built against.
#[derive(Debug, Default, Clone)]
pub struct RowStore {
    rows: Vec<Row>,
    version: u64,
}

impl RowStore {
    /// Creates a store holding `rows` at version 0
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows, version: 0 }
    }

    /// Replaces the whole collection and returns the new version
    pub fn replace(&mut self, rows: Vec<Row>) -> u64 {
        self.rows = rows;
        self.version += 1;
        self.version
    }

    /// Current row version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All rows in store order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row at a store offset
    pub fn get(&self, offset: usize) -> Option<&Row> {
        self.rows.get(offset)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the store holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decodes a JSON array of objects into rows.
pub fn rows_from_json(value: Value) -> StoreResult<Vec<Row>> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(StoreError::NotAnArray(json_kind(&other))),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(offset, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(StoreError::NotAnObject {
                offset,
                found: json_kind(&other),
            }),
        })
        .collect()
}
