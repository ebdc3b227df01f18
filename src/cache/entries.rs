//! Cache entry types

use std::sync::Arc;

use crate::filter::FilterCriteria;
use crate::index::ColumnsKey;
use crate::query::SortRule;
use crate::sort::CompiledComparator;

/// Filter result for one criteria set
#[derive(Debug, Clone)]
pub struct FilterCacheEntry {
    pub row_version: u64,
    pub columns_key: ColumnsKey,
    pub criteria: FilterCriteria,
    pub offsets: Arc<Vec<usize>>,
}

impl FilterCacheEntry {
    pub fn is_valid_for(
        &self,
        row_version: u64,
        columns_key: &ColumnsKey,
        criteria: &FilterCriteria,
    ) -> bool {
        self.row_version == row_version
            && &self.columns_key == columns_key
            && &self.criteria == criteria
    }

    /// Whether `criteria` narrows this entry, making it a valid scan base
    pub fn can_refine_to(
        &self,
        row_version: u64,
        columns_key: &ColumnsKey,
        criteria: &FilterCriteria,
    ) -> bool {
        self.row_version == row_version
            && &self.columns_key == columns_key
            && criteria.refines(&self.criteria)
    }
}

/// Compiled comparator for one sort rule list
#[derive(Debug, Clone)]
pub struct ComparatorCacheEntry {
    pub row_version: u64,
    pub columns_key: ColumnsKey,
    pub comparator: Arc<CompiledComparator>,
}

impl ComparatorCacheEntry {
    pub fn is_valid_for(&self, row_version: u64, columns_key: &ColumnsKey, sorts: &[SortRule]) -> bool {
        self.row_version == row_version
            && &self.columns_key == columns_key
            && self.comparator.sorts() == sorts
    }
}

/// Final filtered+sorted sequence, independent of pagination
#[derive(Debug, Clone)]
pub struct ProjectionCacheEntry {
    pub revision: u64,
    pub columns_key: ColumnsKey,
    pub offsets: Arc<Vec<usize>>,
}

impl ProjectionCacheEntry {
    pub fn is_valid_for(&self, revision: u64, columns_key: &ColumnsKey) -> bool {
        self.revision == revision && &self.columns_key == columns_key
    }
}
