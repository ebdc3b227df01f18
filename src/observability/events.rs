//! Observable events in rowview
//!
//! Events are explicit and typed; each carries its own severity.

use std::fmt;

use super::logger::Severity;

/// Observable engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Row collection replaced
    RowsIngested,
    /// A projection was computed (not served from cache)
    ProjectionComputed,
    /// The requested page exceeded the page count and was clamped
    PageClamped,
    /// Query state restored from a snapshot
    QueryStateRestored,

    // Parallel execution
    /// Shard pool spawned
    ParallelPoolStarted,
    /// Shard pool could not be spawned; running sequentially
    ParallelPoolUnavailable,
    /// A shard task failed and is being retried
    ShardTaskRetry,
    /// Shard pool torn down after a failure; sequential from now on
    ParallelPoolTornDown,
    /// Shard pool shut down on request
    ParallelPoolShutdown,
    /// A reply for a request no longer awaited was discarded
    StaleShardResponse,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RowsIngested => "ROWS_INGESTED",
            Event::ProjectionComputed => "PROJECTION_COMPUTED",
            Event::PageClamped => "PAGE_CLAMPED",
            Event::QueryStateRestored => "QUERY_STATE_RESTORED",
            Event::ParallelPoolStarted => "PARALLEL_POOL_STARTED",
            Event::ParallelPoolUnavailable => "PARALLEL_POOL_UNAVAILABLE",
            Event::ShardTaskRetry => "SHARD_TASK_RETRY",
            Event::ParallelPoolTornDown => "PARALLEL_POOL_TORN_DOWN",
            Event::ParallelPoolShutdown => "PARALLEL_POOL_SHUTDOWN",
            Event::StaleShardResponse => "STALE_SHARD_RESPONSE",
        }
    }

    /// Severity the event is logged at.
    ///
    /// Parallel degradation is a soft failure and never logs above WARN.
    pub fn severity(&self) -> Severity {
        match self {
            Event::ProjectionComputed | Event::StaleShardResponse => Severity::Trace,
            Event::RowsIngested
            | Event::PageClamped
            | Event::QueryStateRestored
            | Event::ParallelPoolStarted
            | Event::ParallelPoolShutdown => Severity::Info,
            Event::ParallelPoolUnavailable
            | Event::ShardTaskRetry
            | Event::ParallelPoolTornDown => Severity::Warn,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
