//! Shard transport errors

use thiserror::Error;

/// Result type for shard operations
pub type ShardResult<T> = Result<T, ShardError>;

/// Shard errors
#[derive(Debug, Clone, Error)]
pub enum ShardError {
    /// No reply within the deadline
    #[error("Shard {shard} timed out after {timeout_ms}ms")]
    Timeout { shard: usize, timeout_ms: u64 },

    /// The unit answered with an error
    #[error("Shard {shard} failed: {reason}")]
    Failed { shard: usize, reason: String },

    /// The unit's channel is closed; not retried
    #[error("Shard {shard} transport broken: {reason}")]
    Transport { shard: usize, reason: String },

    /// Retry budget spent
    #[error("Shard {shard} gave up after {attempts} attempts: {last}")]
    Exhausted {
        shard: usize,
        attempts: u32,
        #[source]
        last: Box<ShardError>,
    },
}

impl ShardError {
    /// Index of the shard that failed
    pub fn shard(&self) -> usize {
        match self {
            ShardError::Timeout { shard, .. }
            | ShardError::Failed { shard, .. }
            | ShardError::Transport { shard, .. }
            | ShardError::Exhausted { shard, .. } => *shard,
        }
    }

    /// Whether another attempt on the same unit can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShardError::Timeout { .. } | ShardError::Failed { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ShardError::Timeout { .. } => "timeout",
            ShardError::Failed { .. } => "failed",
            ShardError::Transport { .. } => "transport",
            ShardError::Exhausted { .. } => "exhausted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ShardError::Timeout { shard: 0, timeout_ms: 50 }.is_retryable());
        assert!(ShardError::Failed { shard: 0, reason: "x".into() }.is_retryable());
        assert!(!ShardError::Transport { shard: 0, reason: "x".into() }.is_retryable());
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let err = ShardError::Exhausted {
            shard: 3,
            attempts: 2,
            last: Box::new(ShardError::Timeout { shard: 3, timeout_ms: 50 }),
        };
        assert_eq!(err.shard(), 3);
        assert_eq!(err.kind(), "exhausted");
        assert!(err.to_string().contains("timed out after 50ms"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
