//! Parallel projection for rowview
//!
//! A fixed pool of shard units, each a dedicated thread owning a copy of
//! one contiguous slice of the store. Units are reached only through
//! message channels; the engine-side join over all units is the single
//! synchronization point.
//!
//! # Invariants
//!
//! - The pool size is fixed at spawn and never changes
//! - Every request carries an id; a reply is matched to the awaited id and
//!   anything else is discarded as stale
//! - Shards report global store offsets, already sorted by the same total
//!   order the sequential path uses, so merging never re-sorts
//! - Any shard error that survives its retry budget fails the whole call

mod errors;
mod merge;
mod pool;
mod protocol;
mod worker;

pub use errors::{ShardError, ShardResult};
pub use merge::{concat_chunks, merge_sorted_chunks};
pub use pool::{plan_shards, PoolConfig, ProjectionPool};
pub use protocol::{ProjectRequest, RequestId, ShardReply, ShardRequest, ShardRequestKind, ShardResponse};
pub use worker::{ShardHandler, ShardWorker};
