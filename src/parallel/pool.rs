//! Fixed-size shard pool with per-task deadlines and retries

use std::io;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::{timeout_at, Instant};

use crate::observability::{log_event, Event, MetricsRegistry, ObservationScope};
use crate::store::Row;

use super::errors::{ShardError, ShardResult};
use super::protocol::{ProjectRequest, ShardReply, ShardRequest, ShardRequestKind};
use super::worker::{ShardHandler, ShardUnit, ShardWorker};

/// Pool sizing and failure budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    /// Deadline for one attempt of one shard task
    pub timeout: Duration,
    /// Extra attempts after the first failure
    pub retries: u32,
}

/// Contiguous shard ranges covering `len` rows.
///
/// Always returns `workers` ranges; trailing ones may be empty.
pub fn plan_shards(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let size = len.max(1).div_ceil(workers);

    (0..workers)
        .map(|i| {
            let start = (i * size).min(len);
            let end = (start + size).min(len);
            start..end
        })
        .collect()
}

/// A running set of shard units
pub struct ProjectionPool {
    units: Vec<ShardUnit>,
    config: PoolConfig,
    loaded_version: Option<u64>,
    metrics: Arc<MetricsRegistry>,
}

impl ProjectionPool {
    /// Spawns `config.workers` standard shard units
    pub fn spawn(config: PoolConfig, metrics: Arc<MetricsRegistry>) -> io::Result<Self> {
        Self::spawn_with(config, metrics, |_| Box::new(ShardWorker::new()))
    }

    /// Spawns one unit per worker around handlers built by `factory`
    pub fn spawn_with<F>(config: PoolConfig, metrics: Arc<MetricsRegistry>, mut factory: F) -> io::Result<Self>
    where
        F: FnMut(usize) -> Box<dyn ShardHandler>,
    {
        let config = PoolConfig {
            workers: config.workers.max(1),
            ..config
        };
        let units = (0..config.workers)
            .map(|shard| ShardUnit::spawn(shard, factory(shard)))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self {
            units,
            config,
            loaded_version: None,
            metrics,
        })
    }

    pub fn workers(&self) -> usize {
        self.units.len()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Registry the pool reports retries to
    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Row version currently held by the shards
    pub fn loaded_version(&self) -> Option<u64> {
        self.loaded_version
    }

    /// Loads `rows` unless the shards already hold `row_version`
    pub async fn ensure_loaded(&mut self, rows: &[Row], row_version: u64) -> ShardResult<()> {
        if self.loaded_version == Some(row_version) {
            return Ok(());
        }
        self.load_rows(rows, row_version).await
    }

    /// Ships each shard an owned copy of its slice
    pub async fn load_rows(&mut self, rows: &[Row], row_version: u64) -> ShardResult<()> {
        self.loaded_version = None;

        let row_count = rows.len().to_string();
        let shards = self.workers().to_string();
        let scope = ObservationScope::with_fields(
            "SHARD_LOAD",
            &[("rows", row_count.as_str()), ("shards", shards.as_str())],
        );

        let kinds = plan_shards(rows.len(), self.workers())
            .into_iter()
            .map(|range| ShardRequestKind::LoadShard {
                offset: range.start,
                rows: Arc::new(rows[range].to_vec()),
            })
            .collect();

        match self.run_all(kinds).await {
            Ok(_) => {
                self.loaded_version = Some(row_version);
                scope.complete();
                Ok(())
            }
            Err(err) => {
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    /// Runs `request` on every shard; one offset list per shard, in shard order
    pub async fn project(&mut self, request: ProjectRequest) -> ShardResult<Vec<Vec<usize>>> {
        let request = Arc::new(request);
        let kinds = (0..self.workers())
            .map(|_| ShardRequestKind::Project(Arc::clone(&request)))
            .collect();

        self.run_all(kinds)
            .await?
            .into_iter()
            .enumerate()
            .map(|(shard, reply)| match reply {
                ShardReply::Projected(offsets) => Ok(offsets),
                other => Err(ShardError::Failed {
                    shard,
                    reason: format!("unexpected reply to project: {:?}", other),
                }),
            })
            .collect()
    }

    /// Closes every unit's request channel; unit threads exit after their
    /// current request.
    pub fn shutdown(self) {
        drop(self.units);
    }

    async fn run_all(&mut self, kinds: Vec<ShardRequestKind>) -> ShardResult<Vec<ShardReply>> {
        let config = &self.config;
        let metrics = self.metrics.as_ref();

        let tasks = self
            .units
            .iter_mut()
            .zip(kinds)
            .map(|(unit, kind)| run_task(unit, kind, config, metrics));

        join_all(tasks).await.into_iter().collect()
    }
}

/// One shard task with its retry budget
async fn run_task(
    unit: &mut ShardUnit,
    kind: ShardRequestKind,
    config: &PoolConfig,
    metrics: &MetricsRegistry,
) -> ShardResult<ShardReply> {
    let attempts = config.retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        let error = match call(unit, kind.clone(), config.timeout).await {
            Ok(reply) => return Ok(reply),
            Err(error) => error,
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if attempt >= attempts {
            return Err(ShardError::Exhausted {
                shard: unit.shard,
                attempts,
                last: Box::new(error),
            });
        }

        metrics.increment_shard_retries();
        let shard = unit.shard.to_string();
        let attempt_number = attempt.to_string();
        let reason = error.to_string();
        log_event(
            Event::ShardTaskRetry,
            &[
                ("shard", shard.as_str()),
                ("attempt", attempt_number.as_str()),
                ("request", kind.name()),
                ("reason", reason.as_str()),
            ],
        );
        attempt += 1;
    }
}

/// One attempt: send, then wait for the matching reply
async fn call(unit: &mut ShardUnit, kind: ShardRequestKind, timeout: Duration) -> ShardResult<ShardReply> {
    let shard = unit.shard;
    let id = unit.next_id;
    unit.next_id += 1;

    unit.requests
        .send(ShardRequest { id, kind })
        .map_err(|_| ShardError::Transport {
            shard,
            reason: "request channel closed".to_string(),
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        let response = match timeout_at(deadline, unit.responses.recv()).await {
            Err(_) => {
                return Err(ShardError::Timeout {
                    shard,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
            Ok(None) => {
                return Err(ShardError::Transport {
                    shard,
                    reason: "response channel closed".to_string(),
                })
            }
            Ok(Some(response)) => response,
        };

        if response.id != id {
            let (shard_name, expected, received) =
                (shard.to_string(), id.to_string(), response.id.to_string());
            log_event(
                Event::StaleShardResponse,
                &[
                    ("shard", shard_name.as_str()),
                    ("expected", expected.as_str()),
                    ("received", received.as_str()),
                ],
            );
            continue;
        }

        return response
            .result
            .map_err(|reason| ShardError::Failed { shard, reason });
    }
}
