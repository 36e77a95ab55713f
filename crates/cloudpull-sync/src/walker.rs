//! Remote tree enumeration
//!
//! [`TreeWalker::walk`] turns a remote subtree into an ordered manifest:
//! depth-first, pre-order, each folder emitted before its descendants and
//! siblings kept in the order the store listed them. Listing is paginated
//! and every page request is retried under the walker's [`RetryPolicy`].
//!
//! A listing failure that survives the retries aborts the whole walk; no
//! partial manifest is ever returned.

use std::sync::Arc;

use cloudpull_core::domain::{ManifestEntry, Node, NodeId, PageToken, Query};
use cloudpull_core::ports::{IRemoteStore, StoreError};
use futures_util::future::{BoxFuture, FutureExt};
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;
use crate::SyncError;

/// Enumerates remote folders into manifests
pub struct TreeWalker {
    store: Arc<dyn IRemoteStore>,
    retry: RetryPolicy,
    max_depth: Option<usize>,
}

impl TreeWalker {
    pub fn new(store: Arc<dyn IRemoteStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            max_depth: None,
        }
    }

    /// Limits how many folder levels below the root are enumerated
    ///
    /// Children of the root are at depth 1. Folders at the limit still appear
    /// in the manifest but are not listed.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Returns every node matching `query`, following pagination to the end
    ///
    /// Pages are concatenated in the order they were returned.
    #[tracing::instrument(skip(self, query), fields(query = %query))]
    pub async fn search(&self, query: &Query) -> Result<Vec<Node>, SyncError> {
        let mut nodes = Vec::new();
        let mut token: Option<PageToken> = None;
        let mut pages = 0usize;

        loop {
            let current = token.as_ref();
            let page = self
                .retry
                .execute_store("list", move || self.store.list(query, current))
                .await
                .map_err(|err| SyncError::structural("list", err))?;
            pages += 1;
            nodes.extend(page.nodes);

            match page.next_page_token {
                Some(next) if token.as_ref() == Some(&next) => {
                    return Err(SyncError::Store {
                        operation: "list".to_string(),
                        source: StoreError::InvalidRequest(format!(
                            "store returned page token {next} twice"
                        )),
                    });
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(pages, count = nodes.len(), "Search complete");
        Ok(nodes)
    }

    /// Enumerates the children of `root_id` into a manifest
    ///
    /// Each entry's path is `path_prefix + "/" + name`, with folders
    /// extending the prefix for their own children. With `recursive` unset
    /// only the direct children are listed.
    #[tracing::instrument(skip(self, root_id), fields(root = %root_id))]
    pub async fn walk(
        &self,
        root_id: &NodeId,
        recursive: bool,
        path_prefix: &str,
    ) -> Result<Vec<ManifestEntry>, SyncError> {
        let mut manifest = Vec::new();
        self.walk_folder(
            root_id.clone(),
            recursive,
            path_prefix.to_string(),
            1,
            &mut manifest,
        )
        .await?;

        info!(entries = manifest.len(), "Walk complete");
        Ok(manifest)
    }

    fn walk_folder<'a>(
        &'a self,
        folder_id: NodeId,
        recursive: bool,
        prefix: String,
        depth: usize,
        manifest: &'a mut Vec<ManifestEntry>,
    ) -> BoxFuture<'a, Result<(), SyncError>> {
        async move {
            let children = self.search(&Query::children_of(&folder_id)).await?;

            for node in children {
                let descend = recursive && node.is_folder();
                let entry = ManifestEntry::new(node, &prefix);
                debug!(path = %entry.path, kind = %entry.node.kind, "Enumerated");

                let child = descend.then(|| (entry.node.id.clone(), entry.path.clone()));
                manifest.push(entry);

                if let Some((child_id, child_prefix)) = child {
                    if self.max_depth.is_some_and(|max| depth >= max) {
                        warn!(path = %child_prefix, depth, "Depth limit reached, not descending");
                        continue;
                    }
                    self.walk_folder(child_id, recursive, child_prefix, depth + 1, manifest)
                        .await?;
                }
            }

            Ok(())
        }
        .boxed()
    }
}
