//! In-memory remote store
//!
//! Keeps nodes in insertion order under a synthetic root folder, so listings
//! are deterministic. Every `list`, `read` and `write` call is counted, which
//! lets tests assert how often the engine went to the store.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use cloudpull_core::domain::{Node, NodeId, NodeKind, PageToken, Query};
use cloudpull_core::ports::{ByteStream, IRemoteStore, NodePage, StoreError};
use tokio::io::AsyncReadExt;
use tracing::debug;

const DEFAULT_PAGE_SIZE: usize = 100;

struct StoredNode {
    node: Node,
    parent: Option<NodeId>,
    content: Option<Vec<u8>>,
}

/// A remote store held entirely in memory
pub struct InMemoryRemoteStore {
    nodes: Mutex<Vec<StoredNode>>,
    root: NodeId,
    page_size: usize,
    list_calls: AtomicUsize,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates a store returning at most `page_size` nodes per listing page
    pub fn with_page_size(page_size: usize) -> Self {
        let root = NodeId::root();
        Self {
            nodes: Mutex::new(vec![StoredNode {
                node: Node::new(root.clone(), "", NodeKind::Folder, None),
                parent: None,
                content: None,
            }]),
            root,
            page_size: page_size.max(1),
            list_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
        }
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    // ------------------------------------------------------------------
    // Seeding helpers
    // ------------------------------------------------------------------

    /// Adds a folder under `parent` (`None` = root) and returns its id
    pub fn add_folder(&self, parent: Option<&NodeId>, name: &str) -> NodeId {
        let node = Node::new(NodeId::generate(), name, NodeKind::Folder, None);
        self.insert(parent, node, None)
    }

    /// Adds a file with `content` under `parent` and returns its id
    pub fn add_file(&self, parent: Option<&NodeId>, name: &str, content: &[u8]) -> NodeId {
        let node = Node::new(NodeId::generate(), name, NodeKind::File, Some(content.len() as u64));
        self.insert(parent, node, Some(content.to_vec()))
    }

    /// Adds an arbitrary node; `content = None` makes it unreadable
    pub fn add_node(&self, parent: Option<&NodeId>, node: Node, content: Option<Vec<u8>>) -> NodeId {
        self.insert(parent, node, content)
    }

    fn insert(&self, parent: Option<&NodeId>, node: Node, content: Option<Vec<u8>>) -> NodeId {
        let id = node.id.clone();
        self.state().push(StoredNode {
            node,
            parent: Some(parent.unwrap_or(&self.root).clone()),
            content,
        });
        id
    }

    // ------------------------------------------------------------------
    // Inspection helpers
    // ------------------------------------------------------------------

    /// Stored content of a node, if it exists and has any
    pub fn content(&self, id: &NodeId) -> Option<Vec<u8>> {
        self.state()
            .iter()
            .find(|s| &s.node.id == id)
            .and_then(|s| s.content.clone())
    }

    /// Parent of a node, if it exists
    pub fn parent_of(&self, id: &NodeId) -> Option<NodeId> {
        self.state()
            .iter()
            .find(|s| &s.node.id == id)
            .and_then(|s| s.parent.clone())
    }

    /// Number of nodes, excluding the root
    pub fn len(&self) -> usize {
        self.state().len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, Vec<StoredNode>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_parent(
        nodes: &[StoredNode],
        root: &NodeId,
        parent: Option<&NodeId>,
    ) -> Result<NodeId, StoreError> {
        let parent = parent.unwrap_or(root);
        match nodes.iter().find(|s| &s.node.id == parent) {
            Some(s) if s.node.is_folder() => Ok(parent.clone()),
            Some(_) => Err(StoreError::InvalidRequest(format!("{parent} is not a folder"))),
            None => Err(StoreError::NotFound(parent.to_string())),
        }
    }
}

#[async_trait]
impl IRemoteStore for InMemoryRemoteStore {
    async fn list(
        &self,
        query: &Query,
        page_token: Option<&PageToken>,
    ) -> Result<NodePage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let offset = match page_token {
            Some(token) => token
                .as_str()
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidRequest(format!("bad page token {token}")))?,
            None => 0,
        };

        let nodes = self.state();
        if let Some(parent) = query.parent() {
            Self::resolve_parent(&nodes, &self.root, Some(parent))?;
        }

        let matching: Vec<&StoredNode> = nodes
            .iter()
            .filter(|s| s.parent.is_some())
            .filter(|s| match query.parent() {
                Some(parent) => s.parent.as_ref() == Some(parent),
                None => true,
            })
            .filter(|s| query.matches(&s.node))
            .collect();

        let page: Vec<Node> = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|s| s.node.clone())
            .collect();
        let end = offset + page.len();
        let next_page_token = (end < matching.len()).then(|| PageToken::new(end.to_string()));

        debug!(query = %query, offset, returned = page.len(), "memory list");
        Ok(NodePage {
            nodes: page,
            next_page_token,
        })
    }

    async fn get(&self, id: &NodeId) -> Result<Node, StoreError> {
        self.state()
            .iter()
            .find(|s| &s.node.id == id)
            .map(|s| s.node.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn read(&self, id: &NodeId) -> Result<ByteStream, StoreError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        let nodes = self.state();
        let stored = nodes
            .iter()
            .find(|s| &s.node.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if stored.node.is_folder() {
            return Err(StoreError::Unsupported(format!("{id} is a folder")));
        }
        let content = stored
            .content
            .clone()
            .ok_or_else(|| StoreError::Unsupported(format!("{id} has no byte content")))?;
        Ok(Box::new(Cursor::new(content)))
    }

    async fn write(
        &self,
        parent_id: Option<&NodeId>,
        name: &str,
        mut content: ByteStream,
    ) -> Result<Node, StoreError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes).await?;

        let mut nodes = self.state();
        let parent = Self::resolve_parent(&nodes, &self.root, parent_id)?;
        let node = Node::new(NodeId::generate(), name, NodeKind::File, Some(bytes.len() as u64));
        nodes.push(StoredNode {
            node: node.clone(),
            parent: Some(parent),
            content: Some(bytes),
        });
        Ok(node)
    }

    async fn create_folder(
        &self,
        parent_id: Option<&NodeId>,
        name: &str,
    ) -> Result<Node, StoreError> {
        let mut nodes = self.state();
        let parent = Self::resolve_parent(&nodes, &self.root, parent_id)?;
        let node = Node::new(NodeId::generate(), name, NodeKind::Folder, None);
        nodes.push(StoredNode {
            node: node.clone(),
            parent: Some(parent),
            content: None,
        });
        Ok(node)
    }

    async fn delete(&self, id: &NodeId) -> Result<(), StoreError> {
        if id == &self.root {
            return Err(StoreError::InvalidRequest("cannot delete the root".into()));
        }

        let mut nodes = self.state();
        if !nodes.iter().any(|s| &s.node.id == id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let mut doomed = vec![id.clone()];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i].clone();
            doomed.extend(
                nodes
                    .iter()
                    .filter(|s| s.parent.as_ref() == Some(&current))
                    .map(|s| s.node.id.clone()),
            );
            i += 1;
        }
        nodes.retain(|s| !doomed.contains(&s.node.id));
        Ok(())
    }
}
