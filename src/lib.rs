//! rowview - a deterministic, cache-backed query and projection engine for
//! in-memory row collections
//!
//! Rows are JSON objects. A [`ProjectionEngine`] owns one collection plus the
//! query state over it (search, column filters, multi-column sort,
//! pagination) and serves paginated [`View`]s, reusing cached column
//! projections, filter results and comparators between calls. Large
//! collections can be projected on a shard pool with a sequential fallback.

pub mod cache;
pub mod cli;
pub mod engine;
pub mod filter;
pub mod index;
pub mod observability;
pub mod parallel;
pub mod query;
pub mod sort;
pub mod store;

pub use engine::{EngineConfig, EngineError, EngineResult, ParallelConfig, ProjectionEngine, View};
pub use query::{Column, QueryPatch, QueryState, SortDirection, SortRule};
pub use store::Row;
