//! Row storage for rowview
//!
//! Owns the current row collection and the monotonic row version.
//!
//! # Rules
//!
//! - Rows are replaced wholesale, never mutated in place
//! - Every replacement bumps the row version exactly once
//! - Row position (offset) is the only row identity the engine relies on

mod cell;
mod errors;
mod store;

pub use cell::{cell_number, cell_text, has_alpha, normalize_term};
pub use errors::{StoreError, StoreResult};
pub use store::{rows_from_json, Row, RowStore};
