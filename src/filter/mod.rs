//! Search and column filtering for rowview
//!
//! Produces the ordered set of store offsets that pass the current search
//! term and column filters.
//!
//! # Invariants
//!
//! - Output offsets are strictly increasing (store order)
//! - Column filters are ANDed; the search term matches if ANY searched
//!   column contains it
//! - Filters on keys outside the active column set are ignored
//! - Refining a previous result yields exactly what a full scan would

mod criteria;
mod scan;

pub use criteria::FilterCriteria;
pub use scan::FilterEngine;
