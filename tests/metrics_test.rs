//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hamstr::{
    CacheConfig, CatalogClient, Collector, CollectorConfig, MemoryStore, Record, RecordCache,
    telemetry,
};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
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

fn sample_record(id: u32) -> Record {
    Record {
        id,
        name: format!("item-{id}"),
        categories: Vec::new(),
        numeric_attributes: Default::default(),
        attribute_groups: Default::default(),
        images: Default::default(),
    }
}

// ============================================================================
// Cache metrics
// ============================================================================

#[test]
fn cache_hits_and_misses_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let cache = RecordCache::new(
            &CacheConfig::new().ttl(Duration::from_secs(3600)),
            Arc::new(MemoryStore::new()),
        );
        cache.set(1, sample_record(1));
        cache.get(1);
        cache.get(1);
        cache.get(404);
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 2);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
}

// ============================================================================
// Fetch and collection metrics
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn successful_fetch_records_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/item/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":1,"name":"one"}"#))
        .mount(&server)
        .await;

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let client = CatalogClient::new(server.uri()).unwrap();
                client.fetch_item(1, &CancellationToken::new()).await
            })
        })
    });
    assert!(result.unwrap().is_some());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::FETCHES_TOTAL), 1);
    assert!(
        has_histogram(&snapshot, telemetry::FETCH_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_retrievals_record_resamples() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let cache = Arc::new(RecordCache::new(
                    &CacheConfig::default(),
                    Arc::new(MemoryStore::new()),
                ));
                let client = CatalogClient::new(server.uri()).unwrap();
                let collector = Collector::new(
                    cache,
                    client,
                    CollectorConfig::new()
                        .space_size(10)
                        .batch_size(1)
                        .max_single_attempts(3)
                        .max_sequential_attempts(0),
                );
                collector.collect(1, &CancellationToken::new(), None).await
            })
        })
    })
    .unwrap();

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::RESAMPLES_TOTAL), 3);
    assert_eq!(
        counter_total(&snapshot, telemetry::RECORDS_COLLECTED_TOTAL),
        0
    );
}
