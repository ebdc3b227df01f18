//! Engine configuration
//!
//! Loaded from JSON (camelCase keys, every field optional):
//!
//! ```json
//! {
//!   "pageSize": 25,
//!   "initialSort": { "key": "score", "direction": "desc" },
//!   "maxSorts": 3,
//!   "parallel": { "enabled": true, "threshold": 20000, "workers": "auto", "timeoutMs": 4000, "retries": 1 }
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{EngineError, EngineResult};
use crate::parallel::PoolConfig;
use crate::query::SortRule;

/// Smallest row count the parallel path may be configured for
pub const MIN_PARALLEL_THRESHOLD: usize = 1_000;

/// Smallest per-attempt shard deadline
pub const MIN_SHARD_TIMEOUT_MS: u64 = 50;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub page_size: usize,
    pub initial_sort: Option<SortRule>,
    /// Cap on sort rules when toggling additively
    pub max_sorts: usize,
    pub parallel: ParallelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            initial_sort: None,
            max_sorts: 3,
            parallel: ParallelConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with the parallel path switched off
    pub fn sequential() -> Self {
        Self {
            parallel: ParallelConfig::disabled(),
            ..Self::default()
        }
    }

    /// Reads and validates a JSON config file
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            EngineError::invalid_config_from(format!("cannot read {}", path.display()), err)
        })?;
        let config: EngineConfig = serde_json::from_str(&text).map_err(|err| {
            EngineError::invalid_config_from(format!("cannot parse {}", path.display()), err)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that cannot be normalized into something usable
    pub fn validate(&self) -> EngineResult<()> {
        if self.parallel.workers == WorkerCount::Fixed(0) {
            return Err(EngineError::invalid_config(
                "parallel.workers must be \"auto\" or at least 1",
            ));
        }
        Ok(())
    }

    /// Applies the documented floors
    pub fn normalized(self) -> Self {
        Self {
            page_size: self.page_size.max(1),
            max_sorts: self.max_sorts.max(1),
            parallel: self.parallel.normalized(),
            ..self
        }
    }
}

/// Parallel projection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParallelConfig {
    pub enabled: bool,
    /// Minimum row count before the parallel path is considered
    pub threshold: usize,
    pub workers: WorkerCount,
    pub timeout_ms: u64,
    pub retries: u32,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 20_000,
            workers: WorkerCount::Auto,
            timeout_ms: 4_000,
            retries: 1,
        }
    }
}

impl ParallelConfig {
    pub fn enabled() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            threshold: self.threshold.max(MIN_PARALLEL_THRESHOLD),
            timeout_ms: self.timeout_ms.max(MIN_SHARD_TIMEOUT_MS),
            ..self
        }
    }

    /// Pool settings with the worker count resolved
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers.resolve(),
            timeout: Duration::from_millis(self.timeout_ms),
            retries: self.retries,
        }
    }
}

/// Number of shard units: `"auto"` or a fixed count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "WorkerCountRepr", into = "WorkerCountRepr")]
pub enum WorkerCount {
    /// Available cores minus one, clamped to 2..=8
    #[default]
    Auto,
    Fixed(usize),
}

impl WorkerCount {
    pub fn resolve(&self) -> usize {
        match self {
            WorkerCount::Auto => {
                let cores = thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                cores.saturating_sub(1).clamp(2, 8)
            }
            WorkerCount::Fixed(count) => (*count).max(1),
        }
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerCount::Auto => write!(f, "auto"),
            WorkerCount::Fixed(count) => write!(f, "{}", count),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WorkerCountRepr {
    Count(usize),
    Name(String),
}

impl TryFrom<WorkerCountRepr> for WorkerCount {
    type Error = String;

    fn try_from(repr: WorkerCountRepr) -> Result<Self, Self::Error> {
        match repr {
            WorkerCountRepr::Count(count) => Ok(WorkerCount::Fixed(count)),
            WorkerCountRepr::Name(name) if name.eq_ignore_ascii_case("auto") => Ok(WorkerCount::Auto),
            WorkerCountRepr::Name(name) => Err(format!("unknown worker count {:?}", name)),
        }
    }
}

impl From<WorkerCount> for WorkerCountRepr {
    fn from(count: WorkerCount) -> Self {
        match count {
            WorkerCount::Auto => WorkerCountRepr::Name("auto".to_string()),
            WorkerCount::Fixed(count) => WorkerCountRepr::Count(count),
        }
    }
}
