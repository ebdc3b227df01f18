//! Result caches for rowview
//!
//! Four independent layers, each keyed by exactly the inputs it depends on:
//!
//! | layer       | key                                   | value                   |
//! |-------------|---------------------------------------|-------------------------|
//! | column index| row version, columns key              | lazy column projections |
//! | filter      | row version, columns key, criteria    | passing offsets         |
//! | comparator  | row version, columns key, sort rules  | compiled comparator     |
//! | projection  | revision, columns key                 | filtered+sorted offsets |
//!
//! # Invariants
//!
//! - Every entry is discardable; a miss only costs recomputation
//! - An entry is served only while every key component matches
//! - Row replacement drops the column index, filter and projection layers

mod entries;
mod layers;

pub use entries::{ComparatorCacheEntry, FilterCacheEntry, ProjectionCacheEntry};
pub use layers::QueryCaches;
