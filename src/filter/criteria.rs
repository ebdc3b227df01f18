//! Normalized filter inputs and the refinement predicate

use std::collections::BTreeMap;

use crate::query::QueryState;

/// Search term plus the column filters active for one column set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search_term: String,
    pub filters: BTreeMap<String, String>,
}

impl FilterCriteria {
    pub fn new(search_term: impl Into<String>, filters: BTreeMap<String, String>) -> Self {
        Self {
            search_term: search_term.into(),
            filters,
        }
    }

    /// Criteria of `query` restricted to the active column `keys`
    pub fn from_query(query: &QueryState, keys: &[String]) -> Self {
        Self {
            search_term: query.search_term().to_string(),
            filters: query.active_filters(keys),
        }
    }

    /// True when nothing would be filtered out
    pub fn is_empty(&self) -> bool {
        self.search_term.is_empty() && self.filters.is_empty()
    }

    /// Whether every row passing `self` must also pass `previous`.
    ///
    /// Holds when the search term extends the previous one and every
    /// previous filter is still present with an extended term. Containment
    /// is monotone under extension, so the previous result is a valid scan
    /// base. New filters on other keys only narrow further.
    pub fn refines(&self, previous: &FilterCriteria) -> bool {
        if !self.search_term.starts_with(&previous.search_term) {
            return false;
        }

        previous.filters.iter().all(|(key, term)| {
            self.filters
                .get(key)
                .is_some_and(|next| next.starts_with(term.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(search: &str, filters: &[(&str, &str)]) -> FilterCriteria {
        FilterCriteria::new(
            search,
            filters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_extended_search_refines() {
        assert!(criteria("be", &[]).refines(&criteria("b", &[])));
        assert!(criteria("b", &[]).refines(&criteria("", &[])));
        assert!(!criteria("b", &[]).refines(&criteria("be", &[])));
        assert!(!criteria("ca", &[]).refines(&criteria("be", &[])));
    }

    #[test]
    fn test_extended_filter_refines() {
        let previous = criteria("", &[("city", "pa")]);
        assert!(criteria("", &[("city", "par")]).refines(&previous));
        assert!(criteria("", &[("city", "pa"), ("name", "c")]).refines(&previous));
        assert!(!criteria("", &[("city", "ro")]).refines(&previous));
    }

    #[test]
    fn test_dropping_a_filter_forces_rescan() {
        let previous = criteria("", &[("city", "pa"), ("name", "c")]);
        assert!(!criteria("", &[("city", "pa")]).refines(&previous));
    }

    #[test]
    fn test_identical_criteria_refine() {
        let c = criteria("x", &[("a", "b")]);
        assert!(c.refines(&c.clone()));
    }

    #[test]
    fn test_is_empty() {
        assert!(FilterCriteria::default().is_empty());
        assert!(!criteria("x", &[]).is_empty());
        assert!(!criteria("", &[("a", "b")]).is_empty());
    }
}
