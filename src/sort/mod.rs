//! Multi-key sorting for rowview
//!
//! Sorts vectors of store offsets with a comparator compiled over the
//! column index.
//!
//! # Invariants
//!
//! - For each rule: numeric compare when both cells are finite numbers,
//!   lowercased text compare otherwise; `desc` reverses the rule
//! - Rules are evaluated in order; full ties fall back to store offset
//! - Below [`STABLE_SORT_THRESHOLD`] rows a stable merge sort is used,
//!   at or above it an unstable sort
//!
//! Because the final tie-break makes the order total, both strategies
//! produce the same sequence.

mod comparator;
mod merge_sort;

pub use comparator::CompiledComparator;
pub use merge_sort::{merge_sort, sort_offsets, STABLE_SORT_THRESHOLD};
