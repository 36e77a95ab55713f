//! Directory-backed remote store
//!
//! Serves a local directory tree through the [`IRemoteStore`] port. Node ids
//! are `/`-separated paths relative to the store root, with `root` naming
//! the root itself; children are listed sorted by name so that pagination
//! is stable between calls.
//!
//! Ids are validated component by component before touching the disk, so a
//! crafted id can never resolve outside the root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudpull_core::domain::{validate_component, Node, NodeId, NodeKind, PageToken, Query};
use cloudpull_core::ports::{ByteStream, IRemoteStore, NodePage, StoreError};
use tracing::{debug, instrument};

const DEFAULT_PAGE_SIZE: usize = 100;

/// A local directory exposed as a remote store
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
    page_size: usize,
}

impl LocalDirStore {
    /// Opens the store rooted at `root`, which must be an existing directory
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        if !std::fs::metadata(&root)?.is_dir() {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self {
            root,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a node id to its path below the root
    fn resolve(&self, id: &NodeId) -> Result<PathBuf, StoreError> {
        if id == &NodeId::root() {
            return Ok(self.root.clone());
        }
        let mut path = self.root.clone();
        for component in id.as_str().split('/') {
            validate_component(component)
                .map_err(|_| StoreError::InvalidRequest(format!("malformed node id {id}")))?;
            path.push(component);
        }
        Ok(path)
    }

    fn child_id(parent: &NodeId, name: &str) -> Result<NodeId, StoreError> {
        let raw = if parent == &NodeId::root() {
            name.to_string()
        } else {
            format!("{parent}/{name}")
        };
        NodeId::new(raw).map_err(|e| StoreError::InvalidRequest(e.to_string()))
    }

    async fn describe(&self, id: NodeId, path: &Path) -> Result<Node, StoreError> {
        let meta = tokio::fs::metadata(path).await.map_err(|e| map_io(e, &id))?;
        let kind = if meta.is_dir() {
            NodeKind::Folder
        } else {
            NodeKind::File
        };
        let size = (!meta.is_dir()).then(|| meta.len());
        let modified: DateTime<Utc> = meta.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());
        let created: DateTime<Utc> = meta.created().map(DateTime::from).unwrap_or(modified);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Node::new(id, name, kind, size).with_times(created, modified))
    }

    /// Every node below `folder`, parents before children
    async fn descendants(&self, folder: &NodeId) -> Result<Vec<Node>, StoreError> {
        let mut out = Vec::new();
        let mut pending = vec![folder.clone()];
        while let Some(current) = pending.pop() {
            for node in self.children(&current).await? {
                if node.is_folder() {
                    pending.push(node.id.clone());
                }
                out.push(node);
            }
        }
        Ok(out)
    }

    async fn children(&self, folder: &NodeId) -> Result<Vec<Node>, StoreError> {
        let dir = self.resolve(folder)?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| map_io(e, folder))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            let id = Self::child_id(folder, &name)?;
            nodes.push(self.describe(id, &dir.join(&name)).await?);
        }
        Ok(nodes)
    }

    fn parent_dir(&self, parent_id: Option<&NodeId>) -> Result<(NodeId, PathBuf), StoreError> {
        let parent = parent_id.cloned().unwrap_or_else(NodeId::root);
        let dir = self.resolve(&parent)?;
        Ok((parent, dir))
    }
}

#[async_trait]
impl IRemoteStore for LocalDirStore {
    #[instrument(skip(self, query, page_token), fields(query = %query))]
    async fn list(
        &self,
        query: &Query,
        page_token: Option<&PageToken>,
    ) -> Result<NodePage, StoreError> {
        let offset = match page_token {
            Some(token) => token
                .as_str()
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidRequest(format!("bad page token {token}")))?,
            None => 0,
        };

        let candidates = match query.parent() {
            Some(parent) => self.children(parent).await?,
            None => self.descendants(&NodeId::root()).await?,
        };
        let matching: Vec<Node> = candidates
            .into_iter()
            .filter(|n| query.matches(n))
            .collect();

        let total = matching.len();
        let nodes: Vec<Node> = matching
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .collect();
        let end = offset + nodes.len();
        let next_page_token = (end < total).then(|| PageToken::new(end.to_string()));

        debug!(offset, returned = nodes.len(), total, "local_dir list");
        Ok(NodePage {
            nodes,
            next_page_token,
        })
    }

    async fn get(&self, id: &NodeId) -> Result<Node, StoreError> {
        let path = self.resolve(id)?;
        self.describe(id.clone(), &path).await
    }

    async fn read(&self, id: &NodeId) -> Result<ByteStream, StoreError> {
        let path = self.resolve(id)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_io(e, id))?;
        if file.metadata().await?.is_dir() {
            return Err(StoreError::Unsupported(format!("{id} is a folder")));
        }
        Ok(Box::new(file))
    }

    #[instrument(skip(self, parent_id, content))]
    async fn write(
        &self,
        parent_id: Option<&NodeId>,
        name: &str,
        mut content: ByteStream,
    ) -> Result<Node, StoreError> {
        validate_component(name).map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
        let (parent, dir) = self.parent_dir(parent_id)?;
        let path = dir.join(name);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| map_io(e, &parent))?;
        let written = tokio::io::copy(&mut content, &mut file).await?;
        file.sync_all().await?;
        debug!(bytes = written, "local_dir write");

        self.describe(Self::child_id(&parent, name)?, &path).await
    }

    #[instrument(skip(self, parent_id))]
    async fn create_folder(
        &self,
        parent_id: Option<&NodeId>,
        name: &str,
    ) -> Result<Node, StoreError> {
        validate_component(name).map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
        let (parent, dir) = self.parent_dir(parent_id)?;
        let path = dir.join(name);

        tokio::fs::create_dir(&path).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                StoreError::InvalidRequest(format!("{} already exists", path.display()))
            }
            _ => map_io(e, &parent),
        })?;

        self.describe(Self::child_id(&parent, name)?, &path).await
    }

    async fn delete(&self, id: &NodeId) -> Result<(), StoreError> {
        if id == &NodeId::root() {
            return Err(StoreError::InvalidRequest("cannot delete the root".into()));
        }
        let path = self.resolve(id)?;
        let meta = tokio::fs::metadata(&path).await.map_err(|e| map_io(e, id))?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

fn map_io(err: std::io::Error, id: &NodeId) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound(id.to_string()),
        ErrorKind::PermissionDenied => StoreError::PermissionDenied(id.to_string()),
        _ => StoreError::Io(err),
    }
}
