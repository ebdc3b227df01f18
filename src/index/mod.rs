//! Column index subsystem for rowview
//!
//! Per-column projections of the row store, built lazily and memoized.
//!
//! # Design Principles
//!
//! - Derived state: the index mirrors the rows, never the source of truth
//! - Lazy: each projection is built on first request, O(n) once, O(1) after
//! - Discardable: dropping the index never changes a query result
//!
//! # Invariants
//!
//! - An index is bound to exactly one `(row_version, columns_key)` pair
//! - Projections are positional: entry `i` describes the row at offset `i`
//! - A numeric value is only meaningful when its finite flag is set

mod column;

pub use column::{ColumnIndex, ColumnsKey, NumericColumn};
