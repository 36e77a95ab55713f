//! Resume semantics: idempotent re-runs and failure-only retries

use std::sync::Arc;

use cloudpull_core::domain::TransferOutcome;
use cloudpull_store::InMemoryRemoteStore;

use crate::common::{self, FlakyStore, ReadFault};

#[tokio::test]
async fn test_second_run_is_all_skipped() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = common::seed_example(&store);
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(store.clone(), 3);

    let first = engine.download_tree(&root, dir.path(), true).await.unwrap();
    assert_eq!(first.counts.succeeded, 3);
    let reads_after_first = store.read_calls();

    let second = engine.download_tree(&root, dir.path(), true).await.unwrap();

    assert_eq!(second.counts.skipped, 3);
    assert_eq!(second.counts.total(), 3);
    assert!(second
        .outcomes
        .iter()
        .all(|r| r.outcome == TransferOutcome::SkippedExists));
    assert_eq!(store.read_calls(), reads_after_first);
}

#[tokio::test]
async fn test_resume_disabled_transfers_again() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = common::seed_example(&store);
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(store.clone(), 3);

    engine.download_tree(&root, dir.path(), true).await.unwrap();
    std::fs::write(dir.path().join("A.txt"), b"local edit").unwrap();

    let report = engine.download_tree(&root, dir.path(), false).await.unwrap();

    assert_eq!(report.counts.succeeded, 3);
    assert_eq!(store.read_calls(), 4);
    assert_eq!(std::fs::read(dir.path().join("A.txt")).unwrap(), b"alpha");
}

#[tokio::test]
async fn test_partial_file_is_not_mistaken_for_complete() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = store.add_folder(None, "root");
    store.add_file(Some(&root), "movie.mkv", b"0123456789");
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("movie.mkv.part"), b"01234").unwrap();

    let report = common::engine(store.clone(), 3)
        .download_tree(&root, dir.path(), true)
        .await
        .unwrap();

    assert_eq!(report.counts.succeeded, 1);
    assert_eq!(
        std::fs::read(dir.path().join("movie.mkv")).unwrap(),
        b"0123456789"
    );
    assert!(!dir.path().join("movie.mkv.part").exists());
}

#[tokio::test]
async fn test_retry_failed_touches_only_failures() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let root = inner.add_folder(None, "root");
    let ok = inner.add_file(Some(&root), "ok.txt", b"fine");
    let bad = inner.add_file(Some(&root), "bad.txt", b"eventually");
    let flaky = Arc::new(FlakyStore::new(inner));
    // fails the whole first run (3 attempts), succeeds on the retry run
    flaky.fault_reads(&bad, ReadFault::TimeoutTimes(3));

    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(flaky.clone(), 3);

    let first = engine.download_tree(&root, dir.path(), true).await.unwrap();
    assert_eq!(first.counts.failed, 1);

    let retry = engine.retry_failed(&root, dir.path()).await.unwrap();

    assert_eq!(retry.counts.total(), 1);
    assert_eq!(retry.counts.succeeded, 1);
    assert_eq!(retry.outcomes[0].id, bad);
    assert_eq!(flaky.reads_of(&ok), 1);
    assert_eq!(flaky.reads_of(&bad), 4);
    assert_eq!(
        std::fs::read(dir.path().join("bad.txt")).unwrap(),
        b"eventually"
    );

    let artifacts = engine.artifact_paths(&root, dir.path());
    assert!(artifacts.read_failures().await.unwrap().is_empty());
    assert_eq!(artifacts.read_manifest().await.unwrap().len(), 2);
    assert_eq!(artifacts.read_report().await.unwrap(), retry);
}

#[tokio::test]
async fn test_retry_failed_without_prior_run_is_io_error() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = common::seed_example(&store);
    let dir = tempfile::tempdir().unwrap();

    let err = common::engine(store, 3)
        .retry_failed(&root, dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, cloudpull_sync::SyncError::Io(_)));
}

#[tokio::test]
async fn test_retry_failed_keeps_refused_subtree_contained() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = store.add_folder(None, "root");
    let up = store.add_folder(Some(&root), "..");
    store.add_file(Some(&up), "child.txt", b"outside");
    store.add_file(Some(&root), "keep.txt", b"inside");

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let engine = common::engine(store.clone(), 3).with_concurrency(2);

    let first = engine.download_tree(&root, &out, true).await.unwrap();
    assert_eq!(first.counts.failed, 2);
    assert_eq!(first.counts.succeeded, 1);

    let retried = engine.retry_failed(&root, &out).await.unwrap();
    assert_eq!(retried.counts.failed, 2);
    assert_eq!(
        retried.outcomes[1].outcome,
        TransferOutcome::Failed(cloudpull_sync::engine::PARENT_REFUSED.to_string())
    );

    assert_eq!(store.read_calls(), 1);
    assert!(!dir.path().join("child.txt").exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(std::fs::read(out.join("keep.txt")).unwrap(), b"inside");
}
