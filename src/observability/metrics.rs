//! Metrics registry for rowview
//!
//! - Counters only, monotonic
//! - Thread-safe, lock-free
//! - Passive: nothing in the engine reads a counter to make a decision

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one engine
///
/// Uses Relaxed ordering; counters are independent of each other.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    rows_ingested: AtomicU64,
    views_served: AtomicU64,
    projections_computed: AtomicU64,
    column_index_hits: AtomicU64,
    column_index_misses: AtomicU64,
    filter_hits: AtomicU64,
    filter_misses: AtomicU64,
    incremental_refinements: AtomicU64,
    comparator_hits: AtomicU64,
    comparator_misses: AtomicU64,
    projection_hits: AtomicU64,
    projection_misses: AtomicU64,
    parallel_projections: AtomicU64,
    shard_retries: AtomicU64,
    pool_teardowns: AtomicU64,
    page_clamps: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_rows_ingested(&self) {
        bump(&self.rows_ingested);
    }

    pub fn increment_views_served(&self) {
        bump(&self.views_served);
    }

    pub fn increment_projections_computed(&self) {
        bump(&self.projections_computed);
    }

    /// Records a column index lookup
    pub fn record_column_index(&self, hit: bool) {
        bump(if hit {
            &self.column_index_hits
        } else {
            &self.column_index_misses
        });
    }

    /// Records a filter cache lookup
    pub fn record_filter(&self, hit: bool) {
        bump(if hit { &self.filter_hits } else { &self.filter_misses });
    }

    pub fn increment_incremental_refinements(&self) {
        bump(&self.incremental_refinements);
    }

    /// Records a comparator cache lookup
    pub fn record_comparator(&self, hit: bool) {
        bump(if hit {
            &self.comparator_hits
        } else {
            &self.comparator_misses
        });
    }

    /// Records a projection cache lookup
    pub fn record_projection(&self, hit: bool) {
        bump(if hit {
            &self.projection_hits
        } else {
            &self.projection_misses
        });
    }

    pub fn increment_parallel_projections(&self) {
        bump(&self.parallel_projections);
    }

    pub fn increment_shard_retries(&self) {
        bump(&self.shard_retries);
    }

    pub fn increment_pool_teardowns(&self) {
        bump(&self.pool_teardowns);
    }

    pub fn increment_page_clamps(&self) {
        bump(&self.page_clamps);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MetricsSnapshot {
            rows_ingested: load(&self.rows_ingested),
            views_served: load(&self.views_served),
            projections_computed: load(&self.projections_computed),
            column_index_hits: load(&self.column_index_hits),
            column_index_misses: load(&self.column_index_misses),
            filter_hits: load(&self.filter_hits),
            filter_misses: load(&self.filter_misses),
            incremental_refinements: load(&self.incremental_refinements),
            comparator_hits: load(&self.comparator_hits),
            comparator_misses: load(&self.comparator_misses),
            projection_hits: load(&self.projection_hits),
            projection_misses: load(&self.projection_misses),
            parallel_projections: load(&self.parallel_projections),
            shard_retries: load(&self.shard_retries),
            pool_teardowns: load(&self.pool_teardowns),
            page_clamps: load(&self.page_clamps),
        }
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_ingested: u64,
    pub views_served: u64,
    pub projections_computed: u64,
    pub column_index_hits: u64,
    pub column_index_misses: u64,
    pub filter_hits: u64,
    pub filter_misses: u64,
    pub incremental_refinements: u64,
    pub comparator_hits: u64,
    pub comparator_misses: u64,
    pub projection_hits: u64,
    pub projection_misses: u64,
    pub parallel_projections: u64,
    pub shard_retries: u64,
    pub pool_teardowns: u64,
    pub page_clamps: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_hit_and_miss_counted_separately() {
        let registry = MetricsRegistry::new();
        registry.record_filter(true);
        registry.record_filter(false);
        registry.record_filter(false);
        registry.record_projection(true);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.filter_hits, 1);
        assert_eq!(snapshot.filter_misses, 2);
        assert_eq!(snapshot.projection_hits, 1);
        assert_eq!(snapshot.projection_misses, 0);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.increment_views_served();
        registry.increment_pool_teardowns();

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["views_served"], 1);
        assert_eq!(parsed["pool_teardowns"], 1);
        assert_eq!(parsed["shard_retries"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        reg.increment_shard_retries();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.snapshot().shard_retries, 800);
    }
}
