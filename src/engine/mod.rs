//! Query and projection engine
//!
//! Owns the row store, the query state and the cache layers, and turns a
//! column set into a paginated [`View`]:
//!
//! ```text
//! query mutation -> cache invalidation
//!     -> shard pool (when eligible) | filter scan -> sort
//!     -> paginator -> view
//! ```
//!
//! Any shard failure permanently disables the pool for the engine; the view
//! is recomputed sequentially and the caller never sees the error.

mod config;
#[allow(clippy::module_inception)]
mod engine;
mod errors;
mod paginator;
mod view;

pub use config::{EngineConfig, ParallelConfig, WorkerCount, MIN_PARALLEL_THRESHOLD, MIN_SHARD_TIMEOUT_MS};
pub use engine::ProjectionEngine;
pub use errors::{EngineError, EngineErrorCode, EngineResult};
pub use paginator::{paginate, total_pages, PageWindow};
pub use view::View;
