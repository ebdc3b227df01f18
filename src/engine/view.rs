//! The paginated output handed to a presentation layer

use serde::Serialize;

use crate::store::Row;

/// One page of a projection plus its counts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub rows: Vec<Row>,
    pub total_rows: usize,
    pub total_pages: usize,
    /// Page served, after clamping
    pub page: usize,
    pub page_size: usize,
}

impl View {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
