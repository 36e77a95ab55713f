//! Single-node operations: upload, download, folder creation, deletion

use std::sync::Arc;

use cloudpull_core::domain::{NodeId, Query};
use cloudpull_core::ports::IRemoteStore;
use cloudpull_store::{InMemoryRemoteStore, LocalDirStore};
use cloudpull_sync::retry::RetryError;
use cloudpull_sync::SyncError;

use crate::common::{self, FlakyStore};

#[tokio::test]
async fn test_upload_defaults_to_root() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    std::fs::write(&source, b"remember").unwrap();

    let id = common::engine(store.clone(), 3)
        .upload_file(&source, None)
        .await
        .unwrap();

    assert_eq!(store.parent_of(&id).as_ref(), Some(store.root_id()));
    assert_eq!(store.content(&id).unwrap(), b"remember");
}

#[tokio::test]
async fn test_upload_retry_restarts_from_first_byte() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let flaky = Arc::new(FlakyStore::new(inner.clone()));
    flaky.fail_writes(2);

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("data.csv");
    std::fs::write(&source, b"id,value\n1,alpha\n2,beta\n").unwrap();

    let id = common::engine(flaky.clone(), 3)
        .upload_file(&source, None)
        .await
        .unwrap();

    assert_eq!(flaky.write_calls(), 3);
    assert_eq!(inner.content(&id).unwrap(), b"id,value\n1,alpha\n2,beta\n");
}

#[tokio::test]
async fn test_upload_exhaustion_reports_attempts() {
    let inner = Arc::new(InMemoryRemoteStore::new());
    let flaky = Arc::new(FlakyStore::new(inner.clone()));
    flaky.fail_writes(10);

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("data.csv");
    std::fs::write(&source, b"x").unwrap();

    let err = common::engine(flaky.clone(), 2)
        .upload_file(&source, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Transfer {
            source: RetryError::Exhausted { attempts: 2, .. },
            ..
        }
    ));
    assert!(inner.is_empty());
}

#[tokio::test]
async fn test_local_dir_round_trip() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalDirStore::new(remote.path()).unwrap());
    let engine = common::engine(store.clone(), 3);

    let folder = engine.create_folder("photos", None).await.unwrap();
    let source = local.path().join("cat.jpg");
    std::fs::write(&source, [0xFFu8, 0xD8, 0xFF, 0xE0]).unwrap();
    let uploaded = engine.upload_file(&source, Some(&folder.id)).await.unwrap();
    assert_eq!(uploaded.as_str(), "photos/cat.jpg");

    let target = local.path().join("copy/cat.jpg");
    let bytes = engine.download_file(&uploaded, &target).await.unwrap();
    assert_eq!(bytes, 4);
    assert_eq!(std::fs::read(&target).unwrap(), [0xFFu8, 0xD8, 0xFF, 0xE0]);

    let out = local.path().join("mirror");
    let report = engine
        .download_tree(&NodeId::root(), &out, true)
        .await
        .unwrap();
    assert_eq!(report.counts.succeeded, 2);
    assert!(out.join("photos/cat.jpg").exists());

    engine.delete_node(&folder.id).await.unwrap();
    let page = store
        .list(&Query::children_of(&NodeId::root()), None)
        .await
        .unwrap();
    assert!(page.nodes.is_empty());
}
