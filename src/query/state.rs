//! Query state and its normalized mutations

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::columns::Column;
use super::sort_rule::{SortDirection, SortRule};
use crate::store::normalize_term;

/// Narrowest column width a caller can set, in pixels
const MIN_COLUMN_WIDTH: u32 = 60;

/// How far a query mutation reaches.
///
/// Ordered by reach so several changes can be folded with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryChange {
    /// Column order, widths or visibility; never affects the projection
    Presentation,
    /// Page or page size; same projection, different slice
    Pagination,
    /// Sort rules; same filtered set, different order
    Sorts,
    /// Search term or column filters; different filtered set
    Filters,
}

impl QueryChange {
    /// Whether the filtered+sorted sequence may change
    pub fn affects_projection(self) -> bool {
        self >= QueryChange::Sorts
    }
}

/// The full, serializable query state.
///
/// Fields are private so every write goes through normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    page: usize,
    page_size: usize,
    search_term: String,
    column_filters: BTreeMap<String, String>,
    sorts: Vec<SortRule>,
    column_order: Vec<String>,
    column_widths: BTreeMap<String, u32>,
    column_visibility: BTreeMap<String, bool>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(10, None)
    }
}

impl QueryState {
    /// Creates a state on page 1 with an optional initial sort
    pub fn new(page_size: usize, initial_sort: Option<SortRule>) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            search_term: String::new(),
            column_filters: BTreeMap::new(),
            sorts: initial_sort.into_iter().collect(),
            column_order: Vec::new(),
            column_widths: BTreeMap::new(),
            column_visibility: BTreeMap::new(),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn column_filters(&self) -> &BTreeMap<String, String> {
        &self.column_filters
    }

    pub fn sorts(&self) -> &[SortRule] {
        &self.sorts
    }

    pub fn column_order(&self) -> &[String] {
        &self.column_order
    }

    pub fn column_widths(&self) -> &BTreeMap<String, u32> {
        &self.column_widths
    }

    pub fn column_visibility(&self) -> &BTreeMap<String, bool> {
        &self.column_visibility
    }

    /// Whether a search term or any column filter is set
    pub fn has_filters(&self) -> bool {
        !self.search_term.is_empty() || !self.column_filters.is_empty()
    }

    pub fn has_sorts(&self) -> bool {
        !self.sorts.is_empty()
    }

    pub fn set_search_term(&mut self, term: &str) -> QueryChange {
        self.search_term = normalize_term(term);
        self.page = 1;
        QueryChange::Filters
    }

    /// Sets one column filter; an empty term removes the filter
    pub fn set_column_filter(&mut self, key: &str, term: &str) -> QueryChange {
        let normalized = normalize_term(term);
        if normalized.is_empty() {
            self.column_filters.remove(key);
        } else {
            self.column_filters.insert(key.to_string(), normalized);
        }
        self.page = 1;
        QueryChange::Filters
    }

    /// Clears the search term and every column filter
    pub fn clear_filters(&mut self) -> QueryChange {
        self.search_term.clear();
        self.column_filters.clear();
        self.page = 1;
        QueryChange::Filters
    }

    pub fn set_page(&mut self, page: usize) -> QueryChange {
        self.page = page.max(1);
        QueryChange::Pagination
    }

    /// Sets the page size and returns to page 1
    pub fn set_page_size(&mut self, page_size: usize) -> QueryChange {
        self.page_size = page_size.max(1);
        self.page = 1;
        QueryChange::Pagination
    }

    /// Toggles sorting on `key`.
    ///
    /// Non-additive: the sort list becomes `key` alone, ascending on first
    /// click and flipped if `key` was already sorted. Additive: `key` is
    /// flipped in place if present, otherwise appended ascending and the
    /// oldest rule is evicted once more than `max_sorts` rules are active.
    pub fn toggle_sort(&mut self, key: &str, additive: bool, max_sorts: usize) -> QueryChange {
        let existing = self.sorts.iter().position(|rule| rule.key == key);

        match (additive, existing) {
            (false, None) => {
                self.sorts = vec![SortRule::asc(key)];
            }
            (false, Some(i)) => {
                let direction = self.sorts[i].direction.toggled();
                self.sorts = vec![SortRule::new(key, direction)];
            }
            (true, None) => {
                self.sorts.push(SortRule::asc(key));
                while self.sorts.len() > max_sorts.max(1) {
                    self.sorts.remove(0);
                }
            }
            (true, Some(i)) => {
                self.sorts[i].direction = self.sorts[i].direction.toggled();
            }
        }

        QueryChange::Sorts
    }

    /// Replaces the sort list and returns to page 1
    pub fn set_sorts(&mut self, sorts: Vec<SortRule>) -> QueryChange {
        self.sorts = sorts;
        self.page = 1;
        QueryChange::Sorts
    }

    pub fn clear_sorts(&mut self) -> QueryChange {
        self.sorts.clear();
        self.page = 1;
        QueryChange::Sorts
    }

    pub fn set_column_order(&mut self, order: Vec<String>) -> QueryChange {
        self.column_order = order;
        QueryChange::Presentation
    }

    /// Sets a column width, rounded and floored at 60px
    pub fn set_column_width(&mut self, key: &str, width: f64) -> QueryChange {
        self.column_widths
            .insert(key.to_string(), normalize_width(width));
        QueryChange::Presentation
    }

    pub fn set_column_visibility(&mut self, key: &str, visible: bool) -> QueryChange {
        self.column_visibility.insert(key.to_string(), visible);
        QueryChange::Presentation
    }

    /// Merges a partial update, normalizing every present field.
    ///
    /// Unlike the individual setters, a patch does not reset the page; it
    /// carries its own page when it wants one.
    pub fn apply(&mut self, patch: QueryPatch) -> QueryChange {
        let mut change = QueryChange::Presentation;

        if let Some(page) = patch.page {
            self.page = normalize_count(page);
            change = change.max(QueryChange::Pagination);
        }
        if let Some(page_size) = patch.page_size {
            self.page_size = normalize_count(page_size);
            change = change.max(QueryChange::Pagination);
        }
        if let Some(term) = patch.search_term {
            self.search_term = normalize_term(&term);
            change = QueryChange::Filters;
        }
        if let Some(filters) = patch.column_filters {
            self.column_filters = filters
                .into_iter()
                .map(|(key, term)| (key, normalize_term(&term)))
                .filter(|(_, term)| !term.is_empty())
                .collect();
            change = QueryChange::Filters;
        }
        if let Some(sorts) = patch.sorts {
            self.sorts = sorts;
            change = change.max(QueryChange::Sorts);
        }
        if let Some(order) = patch.column_order {
            self.column_order = order;
        }
        if let Some(widths) = patch.column_widths {
            self.column_widths = widths
                .into_iter()
                .map(|(key, width)| (key, normalize_width(width)))
                .collect();
        }
        if let Some(visibility) = patch.column_visibility {
            self.column_visibility = visibility;
        }

        change
    }

    /// Column filters restricted to the given active keys
    pub fn active_filters(&self, keys: &[String]) -> BTreeMap<String, String> {
        let active: HashSet<&str> = keys.iter().map(String::as_str).collect();
        self.column_filters
            .iter()
            .filter(|(key, _)| active.contains(key.as_str()))
            .map(|(key, term)| (key.clone(), term.clone()))
            .collect()
    }

    /// Sort rules restricted to the given active keys, in rule order
    pub fn active_sorts(&self, keys: &[String]) -> Vec<SortRule> {
        let active: HashSet<&str> = keys.iter().map(String::as_str).collect();
        self.sorts
            .iter()
            .filter(|rule| active.contains(rule.key.as_str()))
            .cloned()
            .collect()
    }

    /// Columns named in `column_order` first, then the rest as given
    pub fn ordered_columns(&self, columns: &[Column]) -> Vec<Column> {
        if self.column_order.is_empty() {
            return columns.to_vec();
        }

        let mut ordered: Vec<Column> = self
            .column_order
            .iter()
            .filter_map(|key| columns.iter().find(|column| &column.key == key))
            .cloned()
            .collect();
        let selected: HashSet<String> = ordered.iter().map(|column| column.key.clone()).collect();
        ordered.extend(
            columns
                .iter()
                .filter(|column| !selected.contains(&column.key))
                .cloned(),
        );
        ordered
    }

    /// Columns not explicitly hidden
    pub fn visible_columns(&self, columns: &[Column]) -> Vec<Column> {
        columns
            .iter()
            .filter(|column| self.column_visibility.get(&column.key) != Some(&false))
            .cloned()
            .collect()
    }

    /// The subset of state a remote data source needs
    pub fn payload(&self) -> QueryPayload {
        QueryPayload {
            page: self.page,
            page_size: self.page_size,
            search_term: self.search_term.clone(),
            column_filters: self.column_filters.clone(),
            sorts: self.sorts.clone(),
        }
    }
}

fn normalize_count(value: i64) -> usize {
    usize::try_from(value.max(1)).unwrap_or(usize::MAX)
}

fn normalize_width(width: f64) -> u32 {
    if !width.is_finite() {
        return MIN_COLUMN_WIDTH;
    }
    width.round().clamp(f64::from(MIN_COLUMN_WIDTH), f64::from(u32::MAX)) as u32
}

/// A partial query update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryPatch {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_term: Option<String>,
    pub column_filters: Option<BTreeMap<String, String>>,
    pub sorts: Option<Vec<SortRule>>,
    pub column_order: Option<Vec<String>>,
    pub column_widths: Option<BTreeMap<String, f64>>,
    pub column_visibility: Option<BTreeMap<String, bool>>,
}

impl QueryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    /// Adds one entry to the patch's column filter map
    pub fn column_filter(mut self, key: impl Into<String>, term: impl Into<String>) -> Self {
        self.column_filters
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), term.into());
        self
    }

    pub fn sorts(mut self, sorts: Vec<SortRule>) -> Self {
        self.sorts = Some(sorts);
        self
    }

    pub fn sort(self, key: impl Into<String>, direction: SortDirection) -> Self {
        let mut sorts = self.sorts.clone().unwrap_or_default();
        sorts.push(SortRule::new(key, direction));
        self.sorts(sorts)
    }
}

impl From<QueryState> for QueryPatch {
    fn from(state: QueryState) -> Self {
        Self {
            page: Some(i64::try_from(state.page).unwrap_or(i64::MAX)),
            page_size: Some(i64::try_from(state.page_size).unwrap_or(i64::MAX)),
            search_term: Some(state.search_term),
            column_filters: Some(state.column_filters),
            sorts: Some(state.sorts),
            column_order: Some(state.column_order),
            column_widths: Some(
                state
                    .column_widths
                    .into_iter()
                    .map(|(key, width)| (key, f64::from(width)))
                    .collect(),
            ),
            column_visibility: Some(state.column_visibility),
        }
    }
}

/// Query payload for a remote data source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPayload {
    pub page: usize,
    pub page_size: usize,
    pub search_term: String,
    pub column_filters: BTreeMap<String, String>,
    pub sorts: Vec<SortRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_page_and_size_never_below_one() {
        let mut state = QueryState::new(0, None);
        assert_eq!(state.page_size(), 1);

        state.set_page(0);
        assert_eq!(state.page(), 1);

        state.apply(QueryPatch::new().page(-4).page_size(-1));
        assert_eq!(state.page(), 1);
        assert_eq!(state.page_size(), 1);
    }

    #[test]
    fn test_terms_are_normalized() {
        let mut state = QueryState::default();
        state.set_search_term("  BeA ");
        state.set_column_filter("city", " PARIS");
        assert_eq!(state.search_term(), "bea");
        assert_eq!(state.column_filters()["city"], "paris");
    }

    #[test]
    fn test_empty_filter_removes_entry() {
        let mut state = QueryState::default();
        state.set_column_filter("city", "rome");
        state.set_column_filter("city", "   ");
        assert!(state.column_filters().is_empty());
    }

    #[test]
    fn test_patch_drops_blank_filters() {
        let mut state = QueryState::default();
        let change = state.apply(
            QueryPatch::new()
                .column_filter("city", "Rome")
                .column_filter("name", "  "),
        );
        assert_eq!(change, QueryChange::Filters);
        assert_eq!(state.column_filters().len(), 1);
        assert_eq!(state.column_filters()["city"], "rome");
    }

    #[test]
    fn test_filter_setters_reset_page() {
        let mut state = QueryState::default();
        state.set_page(4);
        state.set_search_term("x");
        assert_eq!(state.page(), 1);

        state.set_page(3);
        state.set_page_size(25);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_change_reach() {
        let mut state = QueryState::default();
        assert_eq!(state.set_page(2), QueryChange::Pagination);
        assert_eq!(state.set_column_width("a", 100.0), QueryChange::Presentation);
        assert_eq!(state.clear_sorts(), QueryChange::Sorts);
        assert_eq!(state.clear_filters(), QueryChange::Filters);

        assert!(!QueryChange::Pagination.affects_projection());
        assert!(QueryChange::Sorts.affects_projection());
        assert!(QueryChange::Filters.affects_projection());
    }

    #[test]
    fn test_patch_change_reach() {
        let mut state = QueryState::default();
        assert_eq!(state.apply(QueryPatch::new().page(3)), QueryChange::Pagination);
        assert_eq!(
            state.apply(QueryPatch::new().sort("a", SortDirection::Asc)),
            QueryChange::Sorts
        );
        assert_eq!(
            state.apply(QueryPatch::new().search_term("x").page(2)),
            QueryChange::Filters
        );
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn test_toggle_sort_single() {
        let mut state = QueryState::default();
        state.toggle_sort("name", false, 3);
        assert_eq!(state.sorts(), [SortRule::asc("name")]);

        state.toggle_sort("name", false, 3);
        assert_eq!(state.sorts(), [SortRule::desc("name")]);

        state.toggle_sort("score", false, 3);
        assert_eq!(state.sorts(), [SortRule::asc("score")]);
    }

    #[test]
    fn test_toggle_sort_additive_evicts_oldest() {
        let mut state = QueryState::default();
        state.toggle_sort("a", true, 2);
        state.toggle_sort("b", true, 2);
        state.toggle_sort("b", true, 2);
        assert_eq!(state.sorts(), [SortRule::asc("a"), SortRule::desc("b")]);

        state.toggle_sort("c", true, 2);
        assert_eq!(state.sorts(), [SortRule::desc("b"), SortRule::asc("c")]);
    }

    #[test]
    fn test_column_width_floor() {
        let mut state = QueryState::default();
        state.set_column_width("a", 12.0);
        state.set_column_width("b", 120.6);
        state.set_column_width("c", f64::NAN);
        assert_eq!(state.column_widths()["a"], 60);
        assert_eq!(state.column_widths()["b"], 121);
        assert_eq!(state.column_widths()["c"], 60);
    }

    #[test]
    fn test_active_filters_and_sorts_ignore_unknown_columns() {
        let mut state = QueryState::default();
        state.set_column_filter("city", "paris");
        state.set_column_filter("ghost", "x");
        state.set_sorts(vec![SortRule::asc("ghost"), SortRule::desc("score")]);

        let active = keys(&["city", "score"]);
        assert_eq!(state.active_filters(&active).len(), 1);
        assert_eq!(state.active_sorts(&active), [SortRule::desc("score")]);
    }

    #[test]
    fn test_ordered_and_visible_columns() {
        let mut state = QueryState::default();
        let columns = Column::from_keys(["a", "b", "c"]);

        state.set_column_order(keys(&["c", "ghost", "a"]));
        let ordered: Vec<String> = state
            .ordered_columns(&columns)
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(ordered, keys(&["c", "a", "b"]));

        state.set_column_visibility("b", false);
        state.set_column_visibility("c", true);
        let visible = state.visible_columns(&columns);
        assert_eq!(visible, Column::from_keys(["a", "c"]));
    }

    #[test]
    fn test_state_round_trips_through_patch() {
        let mut state = QueryState::new(25, Some(SortRule::desc("score")));
        state.set_search_term("be");
        state.set_column_filter("city", "paris");
        state.set_page(3);
        state.set_column_width("name", 180.0);
        state.set_column_visibility("city", false);

        let json = serde_json::to_string(&state).unwrap();
        let patch: QueryPatch = serde_json::from_str(&json).unwrap();

        let mut restored = QueryState::default();
        restored.apply(patch);
        assert_eq!(restored, state);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let state = QueryState::default();
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["pageSize"], 10);
        assert_eq!(value["searchTerm"], "");
        assert!(value["columnFilters"].is_object());
    }
}
