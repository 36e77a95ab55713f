//! Retry behavior observed through the engine

use std::sync::Arc;
use std::time::Duration;

use cloudpull_store::InMemoryRemoteStore;
use cloudpull_sync::engine::SyncEngine;
use cloudpull_sync::retry::{Backoff, RetryPolicy};

use crate::common::{self, FlakyStore, ReadFault};

#[tokio::test]
async fn test_transient_read_failures_below_budget_succeed() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let root = inner.add_folder(None, "root");
    let id = inner.add_file(Some(&root), "x.txt", b"x");
    let flaky = Arc::new(FlakyStore::new(inner));
    flaky.fault_reads(&id, ReadFault::TimeoutTimes(2));

    let dir = tempfile::tempdir().unwrap();
    let report = common::engine(flaky.clone(), 5)
        .download_tree(&root, dir.path(), true)
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(flaky.reads_of(&id), 3);
}

#[tokio::test]
async fn test_permanent_read_failure_is_not_retried() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let root = inner.add_folder(None, "root");
    let id = inner.add_file(Some(&root), "secret.txt", b"x");
    let flaky = Arc::new(FlakyStore::new(inner));
    flaky.fault_reads(&id, ReadFault::Forbidden);

    let dir = tempfile::tempdir().unwrap();
    let report = common::engine(flaky.clone(), 5)
        .download_tree(&root, dir.path(), true)
        .await
        .unwrap();

    assert_eq!(report.counts.failed, 1);
    assert_eq!(flaky.reads_of(&id), 1);
}

#[tokio::test]
async fn test_listing_recovers_from_transient_failures() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let root = common::seed_example(&inner);
    let flaky = Arc::new(FlakyStore::new(inner));
    flaky.fail_lists(2);

    let dir = tempfile::tempdir().unwrap();
    let report = common::engine(flaky.clone(), 3)
        .download_tree(&root, dir.path(), true)
        .await
        .unwrap();

    assert_eq!(report.counts.succeeded, 3);
    // two failures, then one call for root and one for B
    assert_eq!(flaky.list_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_between_read_attempts() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let root = inner.add_folder(None, "root");
    let id = inner.add_file(Some(&root), "slow.txt", b"s");
    let flaky = Arc::new(FlakyStore::new(inner));
    flaky.fault_reads(&id, ReadFault::TimeoutTimes(3));

    let policy = RetryPolicy::new(
        4,
        Backoff {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(3),
            multiplier: 2.0,
            jitter: false,
        },
    );
    let engine = SyncEngine::new(flaky.clone(), policy);

    let dir = tempfile::tempdir().unwrap();
    let start = tokio::time::Instant::now();
    let report = engine.download_tree(&root, dir.path(), true).await.unwrap();

    assert!(report.is_clean());
    assert_eq!(flaky.reads_of(&id), 4);
    // 1s + 2s + 3s (capped)
    assert!(start.elapsed() >= Duration::from_secs(6));
}
