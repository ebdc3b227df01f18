//! Lazily built per-column projections

use std::collections::HashMap;
use std::sync::Arc;

use crate::store::{cell_number, cell_text, has_alpha, Row};

/// Identity of an active column set, in column order.
///
/// Two column lists produce the same key only if they name the same keys in
/// the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ColumnsKey(String);

impl ColumnsKey {
    const SEPARATOR: char = '\u{1f}';

    /// Builds the key from column keys in order
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                joined.push(Self::SEPARATOR);
            }
            joined.push_str(key.as_ref());
        }
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Numeric projection of one column.
///
/// `values[i]` is a placeholder (0.0) whenever `finite[i]` is false and must
/// not be read in that case; use [`NumericColumn::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericColumn {
    values: Vec<f64>,
    finite: Vec<bool>,
}

impl NumericColumn {
    /// Builds the projection for `key` over `rows`
    pub fn build(rows: &[Row], key: &str) -> Self {
        let mut values = Vec::with_capacity(rows.len());
        let mut finite = Vec::with_capacity(rows.len());

        for row in rows {
            match cell_number(row.get(key)) {
                Some(value) => {
                    values.push(value);
                    finite.push(true);
                }
                None => {
                    values.push(0.0);
                    finite.push(false);
                }
            }
        }

        Self { values, finite }
    }

    /// Numeric value at `offset`, if the cell is a finite number
    #[inline]
    pub fn get(&self, offset: usize) -> Option<f64> {
        if self.finite[offset] {
            Some(self.values[offset])
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Both finite and non-numeric cells are present
    pub fn is_mixed(&self) -> bool {
        self.finite.contains(&true) && self.finite.contains(&false)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Column index over one row collection.
///
/// Row identity is the store offset: filter results and sort orders are
/// vectors of offsets captured against the same row version, so mapping a
/// filtered row back to its source position is the identity and duplicate
/// rows keep distinct slots.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    row_version: u64,
    columns_key: ColumnsKey,
    row_count: usize,
    text_by_key: HashMap<String, Arc<Vec<String>>>,
    numeric_by_key: HashMap<String, Arc<NumericColumn>>,
    has_alpha_by_key: HashMap<String, bool>,
    mixed_by_key: HashMap<String, bool>,
}

impl ColumnIndex {
    /// Creates an empty index bound to `(row_version, columns_key)`
    pub fn new(row_version: u64, columns_key: ColumnsKey, row_count: usize) -> Self {
        Self {
            row_version,
            columns_key,
            row_count,
            text_by_key: HashMap::new(),
            numeric_by_key: HashMap::new(),
            has_alpha_by_key: HashMap::new(),
            mixed_by_key: HashMap::new(),
        }
    }

    /// Whether this index may serve the given row version and column set
    pub fn is_valid_for(&self, row_version: u64, columns_key: &ColumnsKey) -> bool {
        self.row_version == row_version && &self.columns_key == columns_key
    }

    /// Lowercased text of every cell in `key`, built on first request.
    ///
    /// `rows` must be the collection the index was created for.
    pub fn text(&mut self, rows: &[Row], key: &str) -> Arc<Vec<String>> {
        debug_assert_eq!(rows.len(), self.row_count);

        if let Some(cached) = self.text_by_key.get(key) {
            return Arc::clone(cached);
        }

        let values: Vec<String> = rows.iter().map(|row| cell_text(row.get(key))).collect();
        let values = Arc::new(values);
        self.text_by_key.insert(key.to_string(), Arc::clone(&values));
        values
    }

    /// Numeric projection of `key`, built on first request
    pub fn numeric(&mut self, rows: &[Row], key: &str) -> Arc<NumericColumn> {
        debug_assert_eq!(rows.len(), self.row_count);

        if let Some(cached) = self.numeric_by_key.get(key) {
            return Arc::clone(cached);
        }

        let column = Arc::new(NumericColumn::build(rows, key));
        self.numeric_by_key.insert(key.to_string(), Arc::clone(&column));
        column
    }

    /// Whether any cell of `key` contains an alphabetic character
    pub fn has_alpha(&mut self, rows: &[Row], key: &str) -> bool {
        if let Some(&cached) = self.has_alpha_by_key.get(key) {
            return cached;
        }

        let found = self.text(rows, key).iter().any(|text| has_alpha(text));
        self.has_alpha_by_key.insert(key.to_string(), found);
        found
    }

    /// Whether `key` holds both finite numeric cells and non-numeric cells.
    ///
    /// Such a column compares some pairs numerically and others as text, so
    /// sorting on it is not a total order.
    pub fn is_mixed(&mut self, rows: &[Row], key: &str) -> bool {
        if let Some(&cached) = self.mixed_by_key.get(key) {
            return cached;
        }

        let mixed = self.numeric(rows, key).is_mixed();
        self.mixed_by_key.insert(key.to_string(), mixed);
        mixed
    }

    /// Columns worth scanning for `term`.
    ///
    /// A term containing a letter can only match a column that contains a
    /// letter somewhere, so letter-free columns are skipped. Numeric-only
    /// terms search every column. If narrowing would leave nothing, all keys
    /// are returned.
    pub fn searchable_keys(&mut self, rows: &[Row], keys: &[String], term: &str) -> Vec<String> {
        if !has_alpha(term) {
            return keys.to_vec();
        }

        let narrowed: Vec<String> = keys
            .iter()
            .filter(|key| self.has_alpha(rows, key))
            .cloned()
            .collect();

        if narrowed.is_empty() {
            keys.to_vec()
        } else {
            narrowed
        }
    }

    /// Builds every projection for every key up front
    pub fn warm(&mut self, rows: &[Row], keys: &[String]) {
        for key in keys {
            self.text(rows, key);
            self.numeric(rows, key);
            self.has_alpha(rows, key);
            self.is_mixed(rows, key);
        }
    }

    /// Number of text projections built so far
    #[cfg(test)]
    pub(crate) fn built_text_columns(&self) -> usize {
        self.text_by_key.len()
    }
}
