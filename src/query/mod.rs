//! Query state for rowview
//!
//! Holds everything a caller can change about a view: paging, search,
//! per-column filters, sort rules and presentation state.
//!
//! # Invariants
//!
//! - `page >= 1` and `page_size >= 1` after every write
//! - Search and filter terms are stored trimmed and lowercased
//! - `column_filters` never holds an empty term
//! - Every mutation reports how far its effect reaches via [`QueryChange`]

mod columns;
mod sort_rule;
mod state;

pub use columns::Column;
pub use sort_rule::{SortDirection, SortRule};
pub use state::{QueryChange, QueryPatch, QueryPayload, QueryState};
