//! The projection engine

use std::mem;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::config::EngineConfig;
use super::errors::{EngineError, EngineResult};
use super::paginator::paginate;
use super::view::View;
use crate::cache::{ComparatorCacheEntry, FilterCacheEntry, ProjectionCacheEntry, QueryCaches};
use crate::filter::{FilterCriteria, FilterEngine};
use crate::index::ColumnsKey;
use crate::observability::{log_event, Event, MetricsRegistry, Timer};
use crate::parallel::{
    concat_chunks, merge_sorted_chunks, ProjectRequest, ProjectionPool, ShardError, ShardResult,
};
use crate::query::{Column, QueryChange, QueryPatch, QueryPayload, QueryState, SortRule};
use crate::sort::{sort_offsets, CompiledComparator};
use crate::store::{rows_from_json, Row, RowStore};

/// Above this many rows an unfiltered projection builds every column
/// projection up front, so the first search does not pay for it.
const INDEX_WARM_THRESHOLD: usize = 20_000;

/// Parallel execution state; only ever moves from `Active` to `Disabled`
enum ParallelState {
    Active(ProjectionPool),
    Disabled,
}

/// Query and projection engine over one row collection.
///
/// Owns the rows, the query state and every cache. `get_view` always runs
/// sequentially; `get_view_async` may fan out to the shard pool.
pub struct ProjectionEngine {
    id: Uuid,
    config: EngineConfig,
    store: RowStore,
    query: QueryState,
    revision: u64,
    caches: QueryCaches,
    parallel: ParallelState,
    metrics: Arc<MetricsRegistry>,
}

impl ProjectionEngine {
    /// Creates an empty engine, spawning the shard pool if enabled.
    ///
    /// A pool that cannot be spawned leaves the engine sequential.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let config = config.normalized();
        let metrics = Arc::new(MetricsRegistry::new());

        let mut engine = Self::build(config, metrics);
        if engine.config.parallel.enabled {
            let pool_config = engine.config.parallel.pool_config();
            match ProjectionPool::spawn(pool_config, Arc::clone(&engine.metrics)) {
                Ok(pool) => engine.activate(pool),
                Err(err) => {
                    let (id, reason) = (engine.id.to_string(), err.to_string());
                    log_event(
                        Event::ParallelPoolUnavailable,
                        &[("engine", id.as_str()), ("reason", reason.as_str())],
                    );
                }
            }
        }
        Ok(engine)
    }

    /// Creates an engine that projects through `pool`.
    ///
    /// The engine shares the pool's metrics registry.
    pub fn with_pool(config: EngineConfig, pool: ProjectionPool) -> EngineResult<Self> {
        config.validate()?;
        let metrics = pool.metrics();
        let mut engine = Self::build(config.normalized(), metrics);
        engine.activate(pool);
        Ok(engine)
    }

    fn build(config: EngineConfig, metrics: Arc<MetricsRegistry>) -> Self {
        let query = QueryState::new(config.page_size, config.initial_sort.clone());
        Self {
            id: Uuid::new_v4(),
            config,
            store: RowStore::default(),
            query,
            revision: 0,
            caches: QueryCaches::new(),
            parallel: ParallelState::Disabled,
            metrics,
        }
    }

    fn activate(&mut self, pool: ProjectionPool) {
        let (id, workers) = (self.id.to_string(), pool.workers().to_string());
        log_event(
            Event::ParallelPoolStarted,
            &[("engine", id.as_str()), ("workers", workers.as_str())],
        );
        self.parallel = ParallelState::Active(pool);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Projection revision; bumped by any change to filter or sort inputs
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn row_version(&self) -> u64 {
        self.store.version()
    }

    pub fn rows(&self) -> &[Row] {
        self.store.rows()
    }

    pub fn row_count(&self) -> usize {
        self.store.len()
    }

    // ==================
    // Rows
    // ==================

    /// Replaces the row collection
    pub fn ingest(&mut self, rows: Vec<Row>) {
        let row_version = self.store.replace(rows);
        self.revision += 1;
        self.caches.invalidate_rows();
        self.metrics.increment_rows_ingested();

        let (id, count, version) = (
            self.id.to_string(),
            self.store.len().to_string(),
            row_version.to_string(),
        );
        log_event(
            Event::RowsIngested,
            &[
                ("engine", id.as_str()),
                ("rows", count.as_str()),
                ("row_version", version.as_str()),
            ],
        );
    }

    /// Decodes a JSON array of objects and ingests it
    pub fn ingest_json(&mut self, value: Value) -> EngineResult<()> {
        let rows = rows_from_json(value)?;
        self.ingest(rows);
        Ok(())
    }

    // ==================
    // Query state
    // ==================

    fn note(&mut self, change: QueryChange) {
        if change.affects_projection() {
            self.revision += 1;
            self.caches.invalidate_projection();
        }
    }

    /// Merges a partial query update
    pub fn set_query(&mut self, patch: QueryPatch) {
        let change = self.query.apply(patch);
        self.note(change);
    }

    pub fn set_search_term(&mut self, term: &str) {
        let change = self.query.set_search_term(term);
        self.note(change);
    }

    pub fn set_column_filter(&mut self, key: &str, term: &str) {
        let change = self.query.set_column_filter(key, term);
        self.note(change);
    }

    pub fn clear_filters(&mut self) {
        let change = self.query.clear_filters();
        self.note(change);
    }

    pub fn set_page(&mut self, page: usize) {
        let change = self.query.set_page(page);
        self.note(change);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        let change = self.query.set_page_size(page_size);
        self.note(change);
    }

    /// Toggles sorting on `key`, capped at the configured `max_sorts`
    pub fn toggle_sort(&mut self, key: &str, additive: bool) {
        let change = self.query.toggle_sort(key, additive, self.config.max_sorts);
        self.note(change);
    }

    pub fn set_sorts(&mut self, sorts: Vec<SortRule>) {
        let change = self.query.set_sorts(sorts);
        self.note(change);
    }

    pub fn clear_sorts(&mut self) {
        let change = self.query.clear_sorts();
        self.note(change);
    }

    pub fn set_column_order(&mut self, order: Vec<String>) {
        let change = self.query.set_column_order(order);
        self.note(change);
    }

    pub fn set_column_width(&mut self, key: &str, width: f64) {
        let change = self.query.set_column_width(key, width);
        self.note(change);
    }

    pub fn set_column_visibility(&mut self, key: &str, visible: bool) {
        let change = self.query.set_column_visibility(key, visible);
        self.note(change);
    }

    pub fn ordered_columns(&self, columns: &[Column]) -> Vec<Column> {
        self.query.ordered_columns(columns)
    }

    pub fn visible_columns(&self, columns: &[Column]) -> Vec<Column> {
        self.query.visible_columns(columns)
    }

    /// Payload for a remote data source
    pub fn query(&self) -> QueryPayload {
        self.query.payload()
    }

    /// Snapshot of the full query state
    pub fn get_state(&self) -> QueryState {
        self.query.clone()
    }

    /// Restores a snapshot taken with [`ProjectionEngine::get_state`], or any
    /// partial patch
    pub fn set_state(&mut self, state: impl Into<QueryPatch>) {
        let change = self.query.apply(state.into());
        self.note(change);

        let (id, page, revision) = (
            self.id.to_string(),
            self.query.page().to_string(),
            self.revision.to_string(),
        );
        log_event(
            Event::QueryStateRestored,
            &[
                ("engine", id.as_str()),
                ("page", page.as_str()),
                ("revision", revision.as_str()),
            ],
        );
    }

    /// Decodes a JSON query state and restores it
    pub fn set_state_json(&mut self, json: &str) -> EngineResult<()> {
        let patch: QueryPatch = serde_json::from_str(json).map_err(EngineError::invalid_state)?;
        self.set_state(patch);
        Ok(())
    }

    // ==================
    // Parallel execution
    // ==================

    /// Whether the next async projection may run on the shard pool
    pub fn can_use_parallel(&self) -> bool {
        matches!(self.parallel, ParallelState::Active(_))
            && self.store.len() >= self.config.parallel.threshold
            && (self.query.has_filters() || self.query.has_sorts())
    }

    pub fn parallel_active(&self) -> bool {
        matches!(self.parallel, ParallelState::Active(_))
    }

    /// Stops the shard pool for good; later projections run sequentially
    pub fn shutdown(&mut self) {
        if let ParallelState::Active(pool) = mem::replace(&mut self.parallel, ParallelState::Disabled) {
            pool.shutdown();
            let id = self.id.to_string();
            log_event(Event::ParallelPoolShutdown, &[("engine", id.as_str())]);
        }
    }

    fn tear_down(&mut self, err: &ShardError) {
        if let ParallelState::Active(pool) = mem::replace(&mut self.parallel, ParallelState::Disabled) {
            pool.shutdown();
        }
        self.metrics.increment_pool_teardowns();

        let (id, shard, reason) = (self.id.to_string(), err.shard().to_string(), err.to_string());
        log_event(
            Event::ParallelPoolTornDown,
            &[
                ("engine", id.as_str()),
                ("shard", shard.as_str()),
                ("kind", err.kind()),
                ("reason", reason.as_str()),
            ],
        );
    }

    // ==================
    // Views
    // ==================

    /// Computes the current page on this thread
    pub fn get_view(&mut self, columns: &[Column]) -> View {
        let (keys, columns_key) = column_keys(columns);

        let projection = match self.cached_projection(&columns_key) {
            Some(projection) => projection,
            None => {
                let timer = Timer::new();
                let projection = self.project_sequential(&keys, &columns_key);
                self.finish_projection(&columns_key, &projection, "sequential", &timer);
                projection
            }
        };

        self.build_view(&projection)
    }

    /// Computes the current page, on the shard pool when eligible.
    ///
    /// Never fails: any shard error tears the pool down and the projection
    /// is recomputed sequentially. Sorting on a column that mixes numbers
    /// and text also runs sequentially, but leaves the pool in place.
    pub async fn get_view_async(&mut self, columns: &[Column]) -> View {
        let (keys, columns_key) = column_keys(columns);

        let projection = match self.cached_projection(&columns_key) {
            Some(projection) => projection,
            None => {
                let timer = Timer::new();
                let (projection, path) = if self.can_use_parallel()
                    && self.sorts_merge_safely(&keys, &columns_key)
                {
                    match self.project_parallel(&keys, &columns_key).await {
                        Ok(projection) => (projection, "parallel"),
                        Err(err) => {
                            self.tear_down(&err);
                            (self.project_sequential(&keys, &columns_key), "fallback")
                        }
                    }
                } else {
                    (self.project_sequential(&keys, &columns_key), "sequential")
                };
                self.finish_projection(&columns_key, &projection, path, &timer);
                projection
            }
        };

        self.build_view(&projection)
    }

    /// Whether per-shard sorted runs would merge into the sequential order.
    ///
    /// Holds unless an active sort column mixes numbers and text.
    fn sorts_merge_safely(&mut self, keys: &[String], columns_key: &ColumnsKey) -> bool {
        let sorts = self.query.active_sorts(keys);
        sorts.is_empty() || self.comparator(columns_key, &sorts).is_total_order()
    }

    fn cached_projection(&self, columns_key: &ColumnsKey) -> Option<Arc<Vec<usize>>> {
        let cached = self.caches.projection(self.revision, columns_key);
        self.metrics.record_projection(cached.is_some());
        cached
    }

    fn finish_projection(
        &mut self,
        columns_key: &ColumnsKey,
        projection: &Arc<Vec<usize>>,
        path: &str,
        timer: &Timer,
    ) {
        self.caches.store_projection(ProjectionCacheEntry {
            revision: self.revision,
            columns_key: columns_key.clone(),
            offsets: Arc::clone(projection),
        });
        self.metrics.increment_projections_computed();

        let (id, rows, revision, elapsed) = (
            self.id.to_string(),
            projection.len().to_string(),
            self.revision.to_string(),
            timer.elapsed_ms(),
        );
        log_event(
            Event::ProjectionComputed,
            &[
                ("engine", id.as_str()),
                ("path", path),
                ("rows", rows.as_str()),
                ("revision", revision.as_str()),
                ("elapsed_ms", elapsed.as_str()),
            ],
        );
    }

    fn build_view(&mut self, projection: &[usize]) -> View {
        let page_size = self.query.page_size();
        let window = paginate(projection.len(), self.query.page(), page_size);

        if window.clamped {
            let requested = self.query.page().to_string();
            self.query.set_page(window.page);
            self.metrics.increment_page_clamps();

            let (id, page) = (self.id.to_string(), window.page.to_string());
            log_event(
                Event::PageClamped,
                &[
                    ("engine", id.as_str()),
                    ("requested", requested.as_str()),
                    ("page", page.as_str()),
                ],
            );
        }

        let rows = projection[window.range]
            .iter()
            .filter_map(|&offset| self.store.get(offset).cloned())
            .collect();

        self.metrics.increment_views_served();
        View {
            rows,
            total_rows: projection.len(),
            total_pages: window.total_pages,
            page: window.page,
            page_size,
        }
    }

    // ==================
    // Sequential projection
    // ==================

    fn project_sequential(&mut self, keys: &[String], columns_key: &ColumnsKey) -> Arc<Vec<usize>> {
        let criteria = FilterCriteria::from_query(&self.query, keys);
        let sorts = self.query.active_sorts(keys);

        let filtered = self.filtered(keys, columns_key, &criteria);
        let projection = if sorts.is_empty() {
            filtered
        } else {
            let comparator = self.comparator(columns_key, &sorts);
            let mut offsets = filtered.as_ref().clone();
            sort_offsets(&mut offsets, &comparator);
            Arc::new(offsets)
        };

        if criteria.is_empty() && self.store.len() > INDEX_WARM_THRESHOLD {
            let (index, hit) = self.caches.column_index(self.store.version(), columns_key, self.store.len());
            self.metrics.record_column_index(hit);
            index.warm(self.store.rows(), keys);
        }

        projection
    }

    /// Filter result for `criteria`: cached, refined from the previous
    /// result, or scanned from the full store.
    fn filtered(
        &mut self,
        keys: &[String],
        columns_key: &ColumnsKey,
        criteria: &FilterCriteria,
    ) -> Arc<Vec<usize>> {
        let row_version = self.store.version();

        if let Some(hit) = self.caches.filter(row_version, columns_key, criteria) {
            self.metrics.record_filter(true);
            return hit;
        }
        self.metrics.record_filter(false);

        let offsets = match self.caches.refinement_base(row_version, columns_key, criteria) {
            // a base covering every row is no narrower than the store itself
            Some(base) if base.len() < self.store.len() => {
                self.metrics.increment_incremental_refinements();
                FilterEngine::refine(self.store.rows(), &base, keys, criteria)
            }
            _ => {
                let (index, hit) = self.caches.column_index(row_version, columns_key, self.store.len());
                self.metrics.record_column_index(hit);
                FilterEngine::scan_indexed(index, self.store.rows(), keys, criteria)
            }
        };

        let offsets = Arc::new(offsets);
        self.caches.store_filter(FilterCacheEntry {
            row_version,
            columns_key: columns_key.clone(),
            criteria: criteria.clone(),
            offsets: Arc::clone(&offsets),
        });
        offsets
    }

    /// Compiled comparator for `sorts`, reused across calls
    fn comparator(&mut self, columns_key: &ColumnsKey, sorts: &[SortRule]) -> Arc<CompiledComparator> {
        let row_version = self.store.version();

        if let Some(hit) = self.caches.comparator(row_version, columns_key, sorts) {
            self.metrics.record_comparator(true);
            return hit;
        }
        self.metrics.record_comparator(false);

        let (index, hit) = self.caches.column_index(row_version, columns_key, self.store.len());
        self.metrics.record_column_index(hit);
        let comparator = Arc::new(CompiledComparator::compile(index, self.store.rows(), sorts));

        self.caches.store_comparator(ComparatorCacheEntry {
            row_version,
            columns_key: columns_key.clone(),
            comparator: Arc::clone(&comparator),
        });
        comparator
    }

    // ==================
    // Parallel projection
    // ==================

    async fn project_parallel(
        &mut self,
        keys: &[String],
        columns_key: &ColumnsKey,
    ) -> ShardResult<Arc<Vec<usize>>> {
        let criteria = FilterCriteria::from_query(&self.query, keys);
        let sorts = self.query.active_sorts(keys);

        let pool = match &mut self.parallel {
            ParallelState::Active(pool) => pool,
            ParallelState::Disabled => return Ok(self.project_sequential(keys, columns_key)),
        };

        pool.ensure_loaded(self.store.rows(), self.store.version()).await?;
        let chunks = pool
            .project(ProjectRequest {
                keys: keys.to_vec(),
                criteria: criteria.clone(),
                sorts: sorts.clone(),
            })
            .await?;
        self.metrics.increment_parallel_projections();

        if sorts.is_empty() {
            // store order, so this is also a valid filter result
            let offsets = Arc::new(concat_chunks(chunks));
            self.caches.store_filter(FilterCacheEntry {
                row_version: self.store.version(),
                columns_key: columns_key.clone(),
                criteria,
                offsets: Arc::clone(&offsets),
            });
            return Ok(offsets);
        }

        let comparator = self.comparator(columns_key, &sorts);
        Ok(Arc::new(merge_sorted_chunks(chunks, &comparator)))
    }
}

impl Drop for ProjectionEngine {
    fn drop(&mut self) {
        if let ParallelState::Active(pool) = mem::replace(&mut self.parallel, ParallelState::Disabled) {
            pool.shutdown();
        }
    }
}

fn column_keys(columns: &[Column]) -> (Vec<String>, ColumnsKey) {
    let keys: Vec<String> = columns.iter().map(|column| column.key.clone()).collect();
    let columns_key = ColumnsKey::from_keys(&keys);
    (keys, columns_key)
}
