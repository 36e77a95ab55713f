//! Tree download: manifest shape, local layout, artifacts, failure isolation

use std::sync::Arc;

use cloudpull_core::domain::{ManifestEntry, Node, NodeId, NodeKind, TransferOutcome};
use cloudpull_store::InMemoryRemoteStore;

use crate::common::{self, FlakyStore, ReadFault};

// ============================================================================
// Layout and manifest
// ============================================================================

#[tokio::test]
async fn test_example_tree_layout_and_manifest() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = common::seed_example(&store);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let engine = common::engine(store.clone(), 3);
    let report = engine.download_tree(&root, &out, true).await.unwrap();

    let prefix = out.to_string_lossy().to_string();
    let manifest = engine
        .artifact_paths(&root, &out)
        .read_manifest()
        .await
        .unwrap();
    let paths: Vec<String> = manifest.iter().map(|e| e.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            format!("{prefix}/A.txt"),
            format!("{prefix}/B"),
            format!("{prefix}/B/C.txt"),
        ]
    );

    let files = common::read_tree(&out);
    assert_eq!(files.get("A.txt").map(Vec::as_slice), Some(&b"alpha"[..]));
    assert_eq!(files.get("B/C.txt").map(Vec::as_slice), Some(&b"gamma"[..]));
    assert!(out.join("B").is_dir());

    assert_eq!(report.counts.succeeded, 3);
    assert_eq!(report.counts.total(), manifest.len());
    assert_eq!(store.read_calls(), 2);
}

#[tokio::test]
async fn test_parent_entries_precede_descendants() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = store.add_folder(None, "root");
    let a = store.add_folder(Some(&root), "a");
    store.add_file(Some(&root), "top.txt", b"t");
    let b = store.add_folder(Some(&a), "b");
    store.add_file(Some(&a), "a1.txt", b"1");
    store.add_file(Some(&b), "b1.txt", b"2");
    let c = store.add_folder(Some(&root), "c");
    store.add_file(Some(&c), "c1.txt", b"3");

    let dir = tempfile::tempdir().unwrap();
    let manifest = common::engine(store.clone(), 3)
        .walker()
        .walk(&root, true, &dir.path().to_string_lossy())
        .await
        .unwrap();

    for (index, entry) in manifest.iter().enumerate() {
        let parent = entry.parent_path();
        if let Some(parent_index) = manifest.iter().position(|e| e.path == parent) {
            assert!(
                parent_index < index,
                "{} listed before its parent {}",
                entry.path,
                parent
            );
            assert!(manifest[parent_index].node.is_folder());
        }
    }
    assert_eq!(manifest.len(), 7);
}

#[tokio::test]
async fn test_empty_root_produces_empty_report() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = store.add_folder(None, "empty");
    let dir = tempfile::tempdir().unwrap();

    let engine = common::engine(store.clone(), 3);
    let report = engine.download_tree(&root, dir.path(), true).await.unwrap();

    assert_eq!(report.counts.total(), 0);
    assert!(report.is_clean());
    let artifacts = engine.artifact_paths(&root, dir.path());
    assert!(artifacts.read_manifest().await.unwrap().is_empty());
    assert!(artifacts.read_failures().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_artifact_dir_override() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = common::seed_example(&store);
    let data = tempfile::tempdir().unwrap();
    let meta = tempfile::tempdir().unwrap();

    let engine =
        common::engine(store.clone(), 3).with_artifact_dir(Some(meta.path().to_path_buf()));
    engine.download_tree(&root, data.path(), true).await.unwrap();

    let stem = root.artifact_stem();
    assert!(meta.path().join(format!("{stem}.filelist.json")).exists());
    assert!(meta.path().join(format!("{stem}.skipped.json")).exists());
    assert!(meta.path().join(format!("{stem}.report.json")).exists());
    assert!(!data.path().join(format!("{stem}.filelist.json")).exists());
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_single_failure_does_not_abort_run() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let root = inner.add_folder(None, "root");
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(inner.add_file(Some(&root), &format!("f{i}.bin"), b"payload"));
    }
    let flaky = Arc::new(FlakyStore::new(inner.clone()));
    flaky.fault_reads(&ids[2], ReadFault::AlwaysTimeout);

    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(flaky.clone(), 3);
    let report = engine.download_tree(&root, dir.path(), true).await.unwrap();

    assert_eq!(report.counts.succeeded, 4);
    assert_eq!(report.counts.failed, 1);
    assert!(report.outcomes[2].outcome.is_failed());
    assert_eq!(flaky.reads_of(&ids[2]), 3);

    let failures: Vec<ManifestEntry> = engine
        .artifact_paths(&root, dir.path())
        .read_failures()
        .await
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].node.id, ids[2]);
    assert!(!dir.path().join("f2.bin").exists());
    assert!(!dir.path().join("f2.bin.part").exists());
}

#[tokio::test]
async fn test_typed_document_fails_permanently() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = store.add_folder(None, "root");
    let doc = Node::new(
        NodeId::new("doc-1").unwrap(),
        "Roadmap",
        NodeKind::TypedDocument,
        None,
    );
    store.add_node(Some(&root), doc, None);
    store.add_file(Some(&root), "plain.txt", b"text");

    let dir = tempfile::tempdir().unwrap();
    let report = common::engine(store.clone(), 5)
        .download_tree(&root, dir.path(), true)
        .await
        .unwrap();

    assert_eq!(report.counts.failed, 1);
    assert_eq!(report.counts.succeeded, 1);
    match &report.outcomes[0].outcome {
        TransferOutcome::Failed(reason) => assert!(reason.contains("no byte content")),
        other => panic!("unexpected outcome {other:?}"),
    }
    // permanent errors are not retried
    assert_eq!(store.read_calls(), 2);
}

#[tokio::test]
async fn test_truncated_transfer_is_retried() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let root = inner.add_folder(None, "root");
    let id = inner.add_file(Some(&root), "big.bin", &[7u8; 4096]);
    let flaky = Arc::new(FlakyStore::new(inner));
    flaky.fault_reads(&id, ReadFault::TruncateTimes(1));

    let dir = tempfile::tempdir().unwrap();
    let report = common::engine(flaky.clone(), 3)
        .download_tree(&root, dir.path(), true)
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(flaky.reads_of(&id), 2);
    assert_eq!(std::fs::read(dir.path().join("big.bin")).unwrap().len(), 4096);
}

#[tokio::test]
async fn test_listing_exhaustion_aborts_without_artifacts() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let root = common::seed_example(&inner);
    let flaky = Arc::new(FlakyStore::new(inner));
    flaky.fail_lists(u32::MAX);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let engine = common::engine(flaky.clone(), 4);
    let err = engine.download_tree(&root, &out, true).await.unwrap_err();

    assert!(err.is_store_unavailable());
    assert_eq!(flaky.list_calls(), 4);
    assert_eq!(flaky.total_reads(), 0);
    assert!(!engine.artifact_paths(&root, &out).manifest.exists());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_transfers_keep_manifest_order() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let root = store.add_folder(None, "root");
    for d in 0..3 {
        let folder = store.add_folder(Some(&root), &format!("d{d}"));
        for f in 0..4 {
            let body = format!("{d}-{f}");
            store.add_file(Some(&folder), &format!("f{f}.txt"), body.as_bytes());
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(store.clone(), 3).with_concurrency(4);
    let report = engine.download_tree(&root, dir.path(), true).await.unwrap();

    let manifest = engine
        .artifact_paths(&root, dir.path())
        .read_manifest()
        .await
        .unwrap();
    let report_paths: Vec<_> = report.outcomes.iter().map(|r| r.path.as_str()).collect();
    let manifest_paths: Vec<_> = manifest.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(report_paths, manifest_paths);

    assert!(report.is_clean());
    assert_eq!(report.counts.succeeded, 15);
    let files = common::read_tree(dir.path());
    assert_eq!(files.get("d1/f2.txt").map(Vec::as_slice), Some(&b"1-2"[..]));
}
