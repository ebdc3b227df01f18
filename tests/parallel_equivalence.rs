//! Parallel Equivalence Tests
//!
//! Tests for the shard pool path:
//! - Parallel views equal sequential views for the same query
//! - Retried shard failures do not change the result
//! - Exhausted shards tear the pool down for good and fall back

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rowview::engine::WorkerCount;
use rowview::observability::MetricsRegistry;
use rowview::parallel::{
    PoolConfig, ProjectionPool, ShardHandler, ShardReply, ShardRequest, ShardRequestKind,
    ShardResponse, ShardWorker,
};
use rowview::{Column, EngineConfig, ParallelConfig, ProjectionEngine, SortRule};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

const ROWS: usize = 2_500;
const WORDS: &[&str] = &["amber", "birch", "cedar", "delta", "ember", "fjord", "grove"];

fn random_rows(count: usize, seed: u64) -> Value {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Value> = (0..count)
        .map(|id| {
            json!({
                "id": id,
                "word": WORDS[rng.gen_range(0..WORDS.len())],
                "tag": format!("t{}", rng.gen_range(0..50)),
                "rank": rng.gen_range(0..20),
                "weight": rng.gen_range(-500.0..500.0),
            })
        })
        .collect();
    Value::Array(rows)
}

fn columns() -> Vec<Column> {
    Column::from_keys(["id", "word", "tag", "rank", "weight"])
}

fn parallel_config() -> EngineConfig {
    EngineConfig {
        page_size: 25,
        parallel: ParallelConfig {
            threshold: 1_000,
            workers: WorkerCount::Fixed(3),
            timeout_ms: 2_000,
            retries: 1,
            ..ParallelConfig::enabled()
        },
        ..EngineConfig::default()
    }
}

fn pool_config() -> PoolConfig {
    PoolConfig {
        workers: 3,
        timeout: Duration::from_millis(500),
        retries: 1,
    }
}

fn sequential_engine(rows: Value) -> ProjectionEngine {
    let config = EngineConfig {
        page_size: 25,
        ..EngineConfig::sequential()
    };
    let mut engine = ProjectionEngine::new(config).unwrap();
    engine.ingest_json(rows).unwrap();
    engine
}

fn engine_with_handlers<F>(rows: Value, factory: F) -> ProjectionEngine
where
    F: FnMut(usize) -> Box<dyn ShardHandler>,
{
    let pool = ProjectionPool::spawn_with(pool_config(), Arc::new(MetricsRegistry::new()), factory).unwrap();
    let mut engine = ProjectionEngine::with_pool(parallel_config(), pool).unwrap();
    engine.ingest_json(rows).unwrap();
    engine
}

/// Loads normally, fails every projection
struct FailingShard(ShardWorker);

impl ShardHandler for FailingShard {
    fn handle(&mut self, request: ShardRequest) -> Option<ShardResponse> {
        match request.kind {
            ShardRequestKind::Project(_) => Some(ShardResponse::error(request.id, "injected failure")),
            _ => self.0.handle(request),
        }
    }
}

/// Fails its first projection only
struct FlakyShard {
    inner: ShardWorker,
    failed: bool,
}

impl ShardHandler for FlakyShard {
    fn handle(&mut self, request: ShardRequest) -> Option<ShardResponse> {
        if matches!(request.kind, ShardRequestKind::Project(_)) && !self.failed {
            self.failed = true;
            return Some(ShardResponse::error(request.id, "transient"));
        }
        self.inner.handle(request)
    }
}

/// Answers projections with the wrong reply type
struct ConfusedShard(ShardWorker);

impl ShardHandler for ConfusedShard {
    fn handle(&mut self, request: ShardRequest) -> Option<ShardResponse> {
        match request.kind {
            ShardRequestKind::Project(_) => Some(ShardResponse::ok(request.id, ShardReply::Loaded { rows: 0 })),
            _ => self.0.handle(request),
        }
    }
}

// =============================================================================
// Equivalence
// =============================================================================

/// Every query shape produces the same view on both paths.
#[tokio::test]
async fn test_parallel_matches_sequential() {
    let rows = random_rows(ROWS, 42);
    let columns = columns();

    let mut parallel = ProjectionEngine::new(parallel_config()).unwrap();
    parallel.ingest_json(rows.clone()).unwrap();
    let mut sequential = sequential_engine(rows);

    type Step = fn(&mut ProjectionEngine);
    let steps: [Step; 10] = [
        |e| e.set_search_term("e"),
        |e| e.set_search_term("em"),
        |e| e.set_column_filter("tag", "t1"),
        |e| e.set_sorts(vec![SortRule::asc("rank")]),
        |e| e.toggle_sort("weight", true),
        |e| e.toggle_sort("weight", true),
        |e| e.set_page(3),
        |e| e.clear_filters(),
        |e| e.set_sorts(vec![SortRule::desc("word"), SortRule::asc("tag")]),
        |e| e.set_search_term("9"),
    ];

    for step in steps {
        step(&mut parallel);
        step(&mut sequential);
        assert!(parallel.can_use_parallel());

        let expected = sequential.get_view(&columns);
        let actual = parallel.get_view_async(&columns).await;
        assert_eq!(actual, expected);
    }

    let snapshot = parallel.metrics().snapshot();
    assert!(snapshot.parallel_projections > 0);
    assert_eq!(snapshot.pool_teardowns, 0);
    assert!(parallel.parallel_active());
}

/// A full sorted projection matches offset by offset, not just the first page.
#[tokio::test]
async fn test_full_sorted_projection_matches() {
    let rows = random_rows(ROWS, 7);
    let columns = columns();

    let mut parallel = ProjectionEngine::new(parallel_config()).unwrap();
    parallel.ingest_json(rows.clone()).unwrap();
    let mut sequential = sequential_engine(rows);

    for engine in [&mut parallel, &mut sequential] {
        engine.set_sorts(vec![SortRule::asc("rank"), SortRule::desc("word")]);
        engine.set_page_size(ROWS);
    }

    let actual = parallel.get_view_async(&columns).await;
    assert_eq!(actual.total_rows, ROWS);
    assert_eq!(actual, sequential.get_view(&columns));
}

/// A sort column mixing numbers and text projects sequentially and still
/// matches, without giving up the pool.
#[tokio::test]
async fn test_mixed_sort_column_matches_sequential() {
    let cells = [json!(10), json!(9), json!("1a"), json!(100), json!("2b"), json!(3), json!("x")];
    let mut rng = StdRng::seed_from_u64(31);
    let rows: Vec<Value> = (0..ROWS)
        .map(|id| json!({"id": id, "v": cells[rng.gen_range(0..cells.len())].clone()}))
        .collect();
    let rows = Value::Array(rows);
    let columns = Column::from_keys(["id", "v"]);

    let mut parallel = ProjectionEngine::new(parallel_config()).unwrap();
    parallel.ingest_json(rows.clone()).unwrap();
    let mut sequential = sequential_engine(rows);

    for engine in [&mut parallel, &mut sequential] {
        engine.set_sorts(vec![SortRule::asc("v")]);
        engine.set_page_size(ROWS);
    }
    assert!(parallel.can_use_parallel());
    assert_eq!(parallel.get_view_async(&columns).await, sequential.get_view(&columns));

    // a clean sort column goes back to the shards
    for engine in [&mut parallel, &mut sequential] {
        engine.set_sorts(vec![SortRule::desc("id")]);
    }
    assert_eq!(parallel.get_view_async(&columns).await, sequential.get_view(&columns));

    let snapshot = parallel.metrics().snapshot();
    assert_eq!(snapshot.parallel_projections, 1);
    assert_eq!(snapshot.pool_teardowns, 0);
    assert!(parallel.parallel_active());
}

/// Rows replaced between views are reshipped to the shards.
#[tokio::test]
async fn test_reingest_reloads_shards() {
    let columns = columns();
    let mut parallel = ProjectionEngine::new(parallel_config()).unwrap();
    parallel.ingest_json(random_rows(ROWS, 1)).unwrap();
    parallel.set_search_term("cedar");
    parallel.get_view_async(&columns).await;

    let rows = random_rows(ROWS + 100, 2);
    parallel.ingest_json(rows.clone()).unwrap();
    let mut sequential = sequential_engine(rows);
    sequential.set_search_term("cedar");

    assert_eq!(parallel.get_view_async(&columns).await, sequential.get_view(&columns));
}

/// Below the threshold, or with no filters and sorts, the pool is skipped.
#[tokio::test]
async fn test_eligibility() {
    let mut engine = ProjectionEngine::new(parallel_config()).unwrap();
    engine.ingest_json(random_rows(999, 3)).unwrap();
    engine.set_search_term("a");
    assert!(!engine.can_use_parallel());

    engine.ingest_json(random_rows(1_000, 3)).unwrap();
    assert!(engine.can_use_parallel());

    engine.clear_filters();
    assert!(!engine.can_use_parallel());
    engine.get_view_async(&columns()).await;
    assert_eq!(engine.metrics().snapshot().parallel_projections, 0);
}

// =============================================================================
// Failure Handling
// =============================================================================

/// A transient shard failure is retried and the result is unchanged.
#[tokio::test]
async fn test_retried_failure_is_invisible() {
    let rows = random_rows(ROWS, 9);
    let columns = columns();
    let mut engine = engine_with_handlers(rows.clone(), |shard| {
        if shard == 1 {
            Box::new(FlakyShard {
                inner: ShardWorker::new(),
                failed: false,
            })
        } else {
            Box::new(ShardWorker::new())
        }
    });
    let mut sequential = sequential_engine(rows);

    engine.set_search_term("birch");
    sequential.set_search_term("birch");

    assert_eq!(engine.get_view_async(&columns).await, sequential.get_view(&columns));
    let snapshot = engine.metrics().snapshot();
    assert_eq!(snapshot.shard_retries, 1);
    assert_eq!(snapshot.pool_teardowns, 0);
    assert!(engine.parallel_active());
}

/// An exhausted shard falls back to a correct sequential view.
#[tokio::test]
async fn test_exhausted_shard_falls_back() {
    let rows = random_rows(ROWS, 5);
    let columns = columns();
    let mut engine = engine_with_handlers(rows.clone(), |_| Box::new(FailingShard(ShardWorker::new())));
    let mut sequential = sequential_engine(rows);

    engine.set_sorts(vec![SortRule::desc("weight")]);
    sequential.set_sorts(vec![SortRule::desc("weight")]);

    assert_eq!(engine.get_view_async(&columns).await, sequential.get_view(&columns));
    assert!(!engine.parallel_active());
    assert_eq!(engine.metrics().snapshot().pool_teardowns, 1);
}

/// Once torn down, the pool is never used again.
#[tokio::test]
async fn test_fallback_is_permanent() {
    let rows = random_rows(ROWS, 6);
    let columns = columns();
    let mut engine = engine_with_handlers(rows, |shard| {
        if shard == 2 {
            Box::new(ConfusedShard(ShardWorker::new()))
        } else {
            Box::new(ShardWorker::new())
        }
    });

    engine.set_search_term("grove");
    engine.get_view_async(&columns).await;
    assert!(!engine.parallel_active());

    for term in ["amber", "fjord", "delta"] {
        engine.set_search_term(term);
        assert!(!engine.can_use_parallel());
        let view = engine.get_view_async(&columns).await;
        assert!(view.rows.iter().all(|row| row["word"] == term));
    }

    let snapshot = engine.metrics().snapshot();
    assert_eq!(snapshot.pool_teardowns, 1);
    assert_eq!(snapshot.parallel_projections, 0);
}

/// An explicit shutdown behaves like a teardown without counting as one.
#[tokio::test]
async fn test_shutdown_disables_parallel() {
    let mut engine = ProjectionEngine::new(parallel_config()).unwrap();
    engine.ingest_json(random_rows(ROWS, 8)).unwrap();
    engine.set_search_term("ember");
    assert!(engine.can_use_parallel());

    engine.shutdown();
    assert!(!engine.can_use_parallel());
    let view = engine.get_view_async(&columns()).await;
    assert!(view.total_rows > 0);
    assert_eq!(engine.metrics().snapshot().pool_teardowns, 0);
}
