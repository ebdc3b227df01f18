//! Filter scans over the full store and over refinement bases

use crate::index::ColumnIndex;
use crate::store::{cell_text, Row};

use super::criteria::FilterCriteria;

/// Evaluates filter criteria against rows
pub struct FilterEngine;

impl FilterEngine {
    /// Scans every row of the store through the column index.
    ///
    /// Filters and search are applied in a single pass over offsets so each
    /// column projection is read sequentially.
    pub fn scan_indexed(
        index: &mut ColumnIndex,
        rows: &[Row],
        keys: &[String],
        criteria: &FilterCriteria,
    ) -> Vec<usize> {
        if criteria.is_empty() {
            return (0..rows.len()).collect();
        }

        let filter_columns: Vec<_> = criteria
            .filters
            .iter()
            .map(|(key, term)| (index.text(rows, key), term.as_str()))
            .collect();

        let search_columns = if criteria.search_term.is_empty() {
            None
        } else {
            let searchable = index.searchable_keys(rows, keys, &criteria.search_term);
            Some(
                searchable
                    .iter()
                    .map(|key| index.text(rows, key))
                    .collect::<Vec<_>>(),
            )
        };

        let term = criteria.search_term.as_str();
        (0..rows.len())
            .filter(|&offset| {
                let passes_filters = filter_columns
                    .iter()
                    .all(|(text, needle)| text[offset].contains(needle));
                if !passes_filters {
                    return false;
                }

                match &search_columns {
                    None => true,
                    Some(columns) => columns.iter().any(|text| text[offset].contains(term)),
                }
            })
            .collect()
    }

    /// Re-filters an earlier result by reading cells directly.
    ///
    /// `base` must be a previous result for criteria that `criteria`
    /// refines; order is preserved.
    pub fn refine(
        rows: &[Row],
        base: &[usize],
        keys: &[String],
        criteria: &FilterCriteria,
    ) -> Vec<usize> {
        base.iter()
            .copied()
            .filter(|&offset| {
                rows.get(offset)
                    .is_some_and(|row| Self::row_matches(row, keys, criteria))
            })
            .collect()
    }

    /// Checks a single row against the criteria
    pub fn row_matches(row: &Row, keys: &[String], criteria: &FilterCriteria) -> bool {
        let passes_filters = criteria
            .filters
            .iter()
            .all(|(key, term)| cell_text(row.get(key)).contains(term.as_str()));
        if !passes_filters {
            return false;
        }

        if criteria.search_term.is_empty() {
            return true;
        }

        keys.iter()
            .any(|key| cell_text(row.get(key)).contains(criteria.search_term.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ColumnsKey;
    use crate::store::rows_from_json;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn rows() -> Vec<Row> {
        rows_from_json(json!([
            {"name": "Ari", "score": 10, "city": "Rome"},
            {"name": "Bea", "score": 30, "city": "Paris"},
            {"name": "Cal", "score": 20, "city": "Paris"},
            {"name": "Dee", "score": 130, "city": null}
        ]))
        .unwrap()
    }

    fn keys() -> Vec<String> {
        vec!["name".into(), "score".into(), "city".into()]
    }

    fn index_for(rows: &[Row]) -> ColumnIndex {
        ColumnIndex::new(1, ColumnsKey::from_keys(keys()), rows.len())
    }

    fn filters(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_criteria_passes_everything() {
        let rows = rows();
        let mut index = index_for(&rows);
        let result =
            FilterEngine::scan_indexed(&mut index, &rows, &keys(), &FilterCriteria::default());
        assert_eq!(result, vec![0, 1, 2, 3]);
        assert_eq!(index.built_text_columns(), 0);
    }

    #[test]
    fn test_search_matches_any_column() {
        let rows = rows();
        let mut index = index_for(&rows);
        let criteria = FilterCriteria::new("be", BTreeMap::new());
        assert_eq!(
            FilterEngine::scan_indexed(&mut index, &rows, &keys(), &criteria),
            vec![1]
        );
    }

    #[test]
    fn test_numeric_search_reaches_numeric_columns() {
        let rows = rows();
        let mut index = index_for(&rows);
        let criteria = FilterCriteria::new("30", BTreeMap::new());
        assert_eq!(
            FilterEngine::scan_indexed(&mut index, &rows, &keys(), &criteria),
            vec![1, 3]
        );
    }

    #[test]
    fn test_filters_are_anded() {
        let rows = rows();
        let mut index = index_for(&rows);
        let criteria = FilterCriteria::new("", filters(&[("city", "paris"), ("name", "c")]));
        assert_eq!(
            FilterEngine::scan_indexed(&mut index, &rows, &keys(), &criteria),
            vec![2]
        );
    }

    #[test]
    fn test_null_cells_never_contain_a_term() {
        let rows = rows();
        let mut index = index_for(&rows);
        let criteria = FilterCriteria::new("", filters(&[("city", "")]));
        // empty term: containment always holds
        assert_eq!(
            FilterEngine::scan_indexed(&mut index, &rows, &keys(), &criteria).len(),
            4
        );

        let criteria = FilterCriteria::new("", filters(&[("city", "null")]));
        assert!(FilterEngine::scan_indexed(&mut index, &rows, &keys(), &criteria).is_empty());
    }

    #[test]
    fn test_refine_agrees_with_full_scan() {
        let rows = rows();
        let mut index = index_for(&rows);
        let broad = FilterCriteria::new("a", BTreeMap::new());
        let narrow = FilterCriteria::new("a", filters(&[("city", "par")]));

        let base = FilterEngine::scan_indexed(&mut index, &rows, &keys(), &broad);
        let refined = FilterEngine::refine(&rows, &base, &keys(), &narrow);
        let full = FilterEngine::scan_indexed(&mut index, &rows, &keys(), &narrow);
        assert_eq!(refined, full);
        assert_eq!(refined, vec![1, 2]);
    }
}
