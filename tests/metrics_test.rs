//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

mod common;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use rfd_solver::cache::MemoryBackend;
use rfd_solver::clock::ManualClock;
use rfd_solver::telemetry;
use rfd_solver::{CacheConfig, CacheStore, DataGenerator, Pipeline, RetryConfig, SolverError};
use serde_json::json;

use common::{FakePokeApi, rfd};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_where(snapshot, name, |_| true)
}

/// Sum counter values for `name` carrying `label=value`.
fn counter_labelled(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    counter_where(snapshot, name, |key| {
        key.labels().any(|l| l.key() == label && l.value() == value)
    })
}

fn counter_where(
    snapshot: &SnapshotVec,
    name: &str,
    filter: impl Fn(&metrics::Key) -> bool,
) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter && key.key().name() == name && filter(key.key())
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn recorded<F: Future>(fut: F) -> (F::Output, SnapshotVec) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let output = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    });
    (output, snapshotter.snapshot().into_vec())
}

fn pipeline(api: FakePokeApi, backend: Arc<MemoryBackend>) -> Pipeline {
    let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
    let cache = CacheStore::new(backend, CacheConfig::default()).with_clock(clock);
    let generator = DataGenerator::new(
        Arc::new(api),
        RetryConfig::new().initial_delay(Duration::from_millis(1)),
    )
    .with_concurrency(1);
    Pipeline::new(Arc::new(cache), generator)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn live_then_cached_records_metrics() {
    let pipeline = pipeline(FakePokeApi::new(), Arc::new(MemoryBackend::new()));
    let request = rfd(json!({"rfd_id": "1", "era": 1, "num_records": 3}));

    let ((first, second), snapshot) = recorded(async {
        let first = pipeline.solve(&request).await;
        let second = pipeline.solve(&request).await;
        (first, second)
    });
    assert!(first.is_ok());
    assert!(second.is_ok());

    assert_eq!(counter_total(&snapshot, telemetry::RFDS_TOTAL), 2);
    assert_eq!(
        counter_labelled(&snapshot, telemetry::RFDS_TOTAL, "source", "live"),
        1
    );
    assert_eq!(
        counter_labelled(&snapshot, telemetry::RFDS_TOTAL, "source", "cache"),
        1
    );
    assert!(has_histogram(&snapshot, telemetry::RFD_DURATION_SECONDS));

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(
        counter_labelled(&snapshot, telemetry::CACHE_MISSES_TOTAL, "reason", "absent"),
        1
    );
    assert_eq!(
        counter_labelled(&snapshot, telemetry::CACHE_WRITES_TOTAL, "status", "ok"),
        1
    );
    assert_eq!(
        counter_labelled(
            &snapshot,
            telemetry::UPSTREAM_REQUESTS_TOTAL,
            "endpoint",
            "pokemon"
        ),
        3
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_generation_records_error() {
    let api = FakePokeApi::new().failing_first(1, || SolverError::AuthenticationFailed);
    let pipeline = pipeline(api, Arc::new(MemoryBackend::new()));
    let request = rfd(json!({"rfd_id": "1", "data_type": "types", "num_records": 2}));

    let (outcome, snapshot) = recorded(pipeline.solve(&request));
    assert!(outcome.is_err());

    assert_eq!(
        counter_labelled(&snapshot, telemetry::RFDS_TOTAL, "status", "error"),
        1
    );
    assert_eq!(
        counter_labelled(
            &snapshot,
            telemetry::UPSTREAM_REQUESTS_TOTAL,
            "status",
            "error"
        ),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_WRITES_TOTAL), 0);
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn retries_are_counted() {
    let api = FakePokeApi::new().failing_first(2, || SolverError::Http("reset".into()));
    let pipeline = pipeline(api, Arc::new(MemoryBackend::new()));
    let request = rfd(json!({"rfd_id": "1", "data_type": "moves", "num_records": 1}));

    let (outcome, snapshot) = recorded(pipeline.solve(&request));
    assert!(outcome.is_ok());
    assert_eq!(
        counter_labelled(&snapshot, telemetry::RETRIES_TOTAL, "endpoint", "move"),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_outage_records_write_error() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_reachable(false);
    let pipeline = pipeline(FakePokeApi::new(), backend);
    let request = rfd(json!({"rfd_id": "1", "data_type": "abilities", "num_records": 1}));

    let (outcome, snapshot) = recorded(pipeline.solve(&request));
    assert!(outcome.is_ok());
    assert_eq!(
        counter_labelled(&snapshot, telemetry::CACHE_MISSES_TOTAL, "reason", "unavailable"),
        1
    );
    assert_eq!(
        counter_labelled(&snapshot, telemetry::CACHE_WRITES_TOTAL, "status", "error"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn disabled_cache_records_skipped_write() {
    let cache = CacheStore::disabled(CacheConfig::default());
    let generator = DataGenerator::new(Arc::new(FakePokeApi::new()), RetryConfig::disabled());
    let pipeline = Pipeline::new(Arc::new(cache), generator);
    let request = rfd(json!({"rfd_id": "1", "data_type": "types", "num_records": 1}));

    let (outcome, snapshot) = recorded(pipeline.solve(&request));
    assert!(outcome.is_ok());
    assert_eq!(
        counter_labelled(&snapshot, telemetry::CACHE_WRITES_TOTAL, "status", "skipped"),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let pipeline = pipeline(FakePokeApi::new(), Arc::new(MemoryBackend::new()));
    let request = rfd(json!({"rfd_id": "1", "data_type": "types", "num_records": 1}));
    pipeline.solve(&request).await.unwrap();
}
