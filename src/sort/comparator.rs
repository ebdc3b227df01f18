//! Compiled multi-key comparator

use std::cmp::Ordering;
use std::sync::Arc;

use crate::index::{ColumnIndex, NumericColumn};
use crate::query::{SortDirection, SortRule};
use crate::store::Row;

#[derive(Debug, Clone)]
struct CompiledKey {
    direction: SortDirection,
    text: Arc<Vec<String>>,
    numeric: Arc<NumericColumn>,
}

impl CompiledKey {
    #[inline]
    fn compare(&self, left: usize, right: usize) -> Ordering {
        let ordering = match (self.numeric.get(left), self.numeric.get(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => self.text[left].cmp(&self.text[right]),
        };

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Comparator over store offsets for one sort rule list.
///
/// Holds shared handles to the column projections it reads, so it stays
/// usable after the index that built it is dropped.
///
/// A rule on a column mixing numbers and text compares some pairs
/// numerically and others as text, which can cycle (`9 < 10 < "1a" < 9`).
/// [`CompiledComparator::is_total_order`] reports whether that can happen.
#[derive(Debug, Clone)]
pub struct CompiledComparator {
    sorts: Vec<SortRule>,
    keys: Vec<CompiledKey>,
    total: bool,
}

impl CompiledComparator {
    /// Compiles `sorts` against `index`, building projections as needed
    pub fn compile(index: &mut ColumnIndex, rows: &[Row], sorts: &[SortRule]) -> Self {
        let total = !sorts.iter().any(|rule| index.is_mixed(rows, &rule.key));
        let keys = sorts
            .iter()
            .map(|rule| CompiledKey {
                direction: rule.direction,
                text: index.text(rows, &rule.key),
                numeric: index.numeric(rows, &rule.key),
            })
            .collect();

        Self {
            sorts: sorts.to_vec(),
            keys,
            total,
        }
    }

    /// False when any rule sorts a mixed numeric/text column
    pub fn is_total_order(&self) -> bool {
        self.total
    }

    /// The rules this comparator was compiled from
    pub fn sorts(&self) -> &[SortRule] {
        &self.sorts
    }

    /// Compares by sort rules only, without the offset tie-break
    pub fn compare_keys(&self, left: usize, right: usize) -> Ordering {
        for key in &self.keys {
            let ordering = key.compare(left, right);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sort rules, then store offset
    #[inline]
    pub fn compare(&self, left: usize, right: usize) -> Ordering {
        self.compare_keys(left, right).then(left.cmp(&right))
    }
}
