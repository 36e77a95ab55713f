//! Shared helpers: seeded stores, a fault-injecting store wrapper and
//! local tree inspection.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cloudpull_core::domain::{Node, NodeId, PageToken, Query};
use cloudpull_core::ports::{ByteStream, IRemoteStore, NodePage, StoreError};
use cloudpull_store::InMemoryRemoteStore;
use cloudpull_sync::engine::SyncEngine;
use cloudpull_sync::retry::{Backoff, RetryPolicy};
use tokio::io::AsyncReadExt;

/// Seeds the tree `root{A.txt, B/{C.txt}}` and returns the root folder id
pub fn seed_example(store: &InMemoryRemoteStore) -> NodeId {
    let root = store.add_folder(None, "root");
    store.add_file(Some(&root), "A.txt", b"alpha");
    let b = store.add_folder(Some(&root), "B");
    store.add_file(Some(&b), "C.txt", b"gamma");
    root
}

/// Engine with `max_attempts` and no backoff delay
pub fn engine(store: Arc<dyn IRemoteStore>, max_attempts: u32) -> SyncEngine {
    SyncEngine::new(store, RetryPolicy::new(max_attempts, Backoff::none()))
}

/// Every regular file below `root`, keyed by its `/`-joined relative path
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                files.insert(key, std::fs::read(&path).unwrap());
            }
        }
    }
    files
}

// ============================================================================
// FlakyStore
// ============================================================================

/// How a node's reads misbehave
#[derive(Debug, Clone, Copy)]
pub enum ReadFault {
    /// The first `n` reads time out
    TimeoutTimes(u32),
    /// Every read times out
    AlwaysTimeout,
    /// The first `n` reads deliver only the first half of the content
    TruncateTimes(u32),
    /// Every read is refused as forbidden
    Forbidden,
}

/// Wraps a store and injects failures into `list` and `read`
pub struct FlakyStore {
    inner: Arc<InMemoryRemoteStore>,
    list_timeouts: Mutex<u32>,
    read_faults: Mutex<HashMap<NodeId, ReadFault>>,
    reads: Mutex<HashMap<NodeId, usize>>,
    write_timeouts: Mutex<u32>,
    list_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryRemoteStore>) -> Self {
        Self {
            inner,
            list_timeouts: Mutex::new(0),
            read_faults: Mutex::new(HashMap::new()),
            reads: Mutex::new(HashMap::new()),
            write_timeouts: Mutex::new(0),
            list_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
        }
    }

    /// The next `n` list calls time out; `u32::MAX` means all of them
    pub fn fail_lists(&self, n: u32) {
        *self.list_timeouts.lock().unwrap() = n;
    }

    /// The next `n` writes consume part of their content, then time out
    pub fn fail_writes(&self, n: u32) {
        *self.write_timeouts.lock().unwrap() = n;
    }

    pub fn fault_reads(&self, id: &NodeId, fault: ReadFault) {
        self.read_faults.lock().unwrap().insert(id.clone(), fault);
    }

    /// Read attempts made for `id`, faulty ones included
    pub fn reads_of(&self, id: &NodeId) -> usize {
        self.reads.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().unwrap().values().sum()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IRemoteStore for FlakyStore {
    async fn list(
        &self,
        query: &Query,
        page_token: Option<&PageToken>,
    ) -> Result<NodePage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut remaining = self.list_timeouts.lock().unwrap();
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(StoreError::Timeout("list".into()));
            }
        }
        self.inner.list(query, page_token).await
    }

    async fn get(&self, id: &NodeId) -> Result<Node, StoreError> {
        self.inner.get(id).await
    }

    async fn read(&self, id: &NodeId) -> Result<ByteStream, StoreError> {
        let attempt = {
            let mut reads = self.reads.lock().unwrap();
            let count = reads.entry(id.clone()).or_insert(0);
            *count += 1;
            *count as u32
        };
        let fault = self.read_faults.lock().unwrap().get(id).copied();

        match fault {
            Some(ReadFault::TimeoutTimes(n)) if attempt <= n => {
                Err(StoreError::Timeout(format!("read {id}")))
            }
            Some(ReadFault::AlwaysTimeout) => Err(StoreError::Timeout(format!("read {id}"))),
            Some(ReadFault::Forbidden) => Err(StoreError::PermissionDenied(id.to_string())),
            Some(ReadFault::TruncateTimes(n)) if attempt <= n => {
                let content = self.inner.content(id).unwrap_or_default();
                let half = content[..content.len() / 2].to_vec();
                Ok(Box::new(std::io::Cursor::new(half)))
            }
            _ => self.inner.read(id).await,
        }
    }

    async fn write(
        &self,
        parent_id: Option<&NodeId>,
        name: &str,
        mut content: ByteStream,
    ) -> Result<Node, StoreError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let fail = {
            let mut remaining = self.write_timeouts.lock().unwrap();
            let fail = *remaining > 0;
            if fail {
                *remaining -= 1;
            }
            fail
        };
        if fail {
            let mut head = [0u8; 4];
            let _ = content.read(&mut head).await;
            return Err(StoreError::Timeout(format!("write {name}")));
        }
        self.inner.write(parent_id, name, content).await
    }

    async fn create_folder(
        &self,
        parent_id: Option<&NodeId>,
        name: &str,
    ) -> Result<Node, StoreError> {
        self.inner.create_folder(parent_id, name).await
    }

    async fn delete(&self, id: &NodeId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }
}
