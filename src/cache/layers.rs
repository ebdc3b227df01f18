//! The per-engine cache set

use std::sync::Arc;

use crate::filter::FilterCriteria;
use crate::index::{ColumnIndex, ColumnsKey};
use crate::query::SortRule;
use crate::sort::CompiledComparator;

use super::entries::{ComparatorCacheEntry, FilterCacheEntry, ProjectionCacheEntry};

/// All cache layers owned by one engine instance
#[derive(Debug, Default)]
pub struct QueryCaches {
    column_index: Option<ColumnIndex>,
    filter: Option<FilterCacheEntry>,
    comparator: Option<ComparatorCacheEntry>,
    projection: Option<ProjectionCacheEntry>,
}

impl QueryCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column index for `(row_version, columns_key)`.
    ///
    /// Replaces a stale index with an empty one. The flag reports whether
    /// the existing index was reused.
    pub fn column_index(
        &mut self,
        row_version: u64,
        columns_key: &ColumnsKey,
        row_count: usize,
    ) -> (&mut ColumnIndex, bool) {
        let reused = self
            .column_index
            .as_ref()
            .is_some_and(|index| index.is_valid_for(row_version, columns_key));

        if !reused {
            self.column_index = None;
        }
        let index = self
            .column_index
            .get_or_insert_with(|| ColumnIndex::new(row_version, columns_key.clone(), row_count));
        (index, reused)
    }

    /// Exact filter hit
    pub fn filter(
        &self,
        row_version: u64,
        columns_key: &ColumnsKey,
        criteria: &FilterCriteria,
    ) -> Option<Arc<Vec<usize>>> {
        self.filter
            .as_ref()
            .filter(|entry| entry.is_valid_for(row_version, columns_key, criteria))
            .map(|entry| Arc::clone(&entry.offsets))
    }

    /// Previous filter result that `criteria` refines, if any
    pub fn refinement_base(
        &self,
        row_version: u64,
        columns_key: &ColumnsKey,
        criteria: &FilterCriteria,
    ) -> Option<Arc<Vec<usize>>> {
        self.filter
            .as_ref()
            .filter(|entry| entry.can_refine_to(row_version, columns_key, criteria))
            .map(|entry| Arc::clone(&entry.offsets))
    }

    pub fn store_filter(&mut self, entry: FilterCacheEntry) {
        self.filter = Some(entry);
    }

    pub fn comparator(
        &self,
        row_version: u64,
        columns_key: &ColumnsKey,
        sorts: &[SortRule],
    ) -> Option<Arc<CompiledComparator>> {
        self.comparator
            .as_ref()
            .filter(|entry| entry.is_valid_for(row_version, columns_key, sorts))
            .map(|entry| Arc::clone(&entry.comparator))
    }

    pub fn store_comparator(&mut self, entry: ComparatorCacheEntry) {
        self.comparator = Some(entry);
    }

    pub fn projection(&self, revision: u64, columns_key: &ColumnsKey) -> Option<Arc<Vec<usize>>> {
        self.projection
            .as_ref()
            .filter(|entry| entry.is_valid_for(revision, columns_key))
            .map(|entry| Arc::clone(&entry.offsets))
    }

    pub fn store_projection(&mut self, entry: ProjectionCacheEntry) {
        self.projection = Some(entry);
    }

    /// Drops every layer derived from row content.
    ///
    /// The comparator entry is keyed by row version and goes stale on its own.
    pub fn invalidate_rows(&mut self) {
        self.column_index = None;
        self.filter = None;
        self.projection = None;
    }

    pub fn invalidate_projection(&mut self) {
        self.projection = None;
    }
}
