//! Sync engine - download/upload orchestration
//!
//! The [`SyncEngine`] ties the walker, the retry policy and the local
//! filesystem adapter together:
//!
//! 1. Walk the remote subtree into a manifest (fatal on listing failure)
//! 2. Persist the manifest artifact
//! 3. Realize every entry locally: folders become directories, files are
//!    streamed down unless they already exist and resume is on
//! 4. Record one outcome per entry, persist the failure subset and the report
//!
//! Failures of individual entries never abort a run. Only structural calls
//! (listing, metadata, folder creation, deletion) surface as fatal errors.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cloudpull_core::config::Config;
use cloudpull_core::domain::{
    validate_component, DomainError, ManifestEntry, Node, NodeId, SyncReport, TransferOutcome,
};
use cloudpull_core::ports::{IRemoteStore, StoreError};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::artifacts::ArtifactPaths;
use crate::filesystem::LocalFileSystemAdapter;
use crate::retry::RetryPolicy;
use crate::walker::TreeWalker;
use crate::SyncError;

/// Failure reason recorded for entries below a folder that failed
pub const PARENT_REFUSED: &str = "parent folder refused";

// ============================================================================
// SyncEngine struct
// ============================================================================

/// Orchestrates transfers between a remote store and the local filesystem
pub struct SyncEngine {
    store: Arc<dyn IRemoteStore>,
    retry: RetryPolicy,
    walker: TreeWalker,
    local_fs: LocalFileSystemAdapter,
    concurrency: usize,
    artifact_dir: Option<PathBuf>,
}

impl SyncEngine {
    /// Creates an engine with sequential transfers and artifacts next to the
    /// downloaded tree
    pub fn new(store: Arc<dyn IRemoteStore>, retry: RetryPolicy) -> Self {
        let walker = TreeWalker::new(Arc::clone(&store), retry.clone());
        Self {
            store,
            retry,
            walker,
            local_fs: LocalFileSystemAdapter::new(),
            concurrency: 1,
            artifact_dir: None,
        }
    }

    /// Creates an engine from the `retry` and `sync` configuration sections
    pub fn from_config(store: Arc<dyn IRemoteStore>, config: &Config) -> Self {
        Self::new(store, RetryPolicy::from(&config.retry))
            .with_concurrency(config.sync.concurrency)
            .with_max_depth(config.sync.max_depth)
            .with_artifact_dir(config.sync.artifact_dir.clone())
    }

    /// Number of file transfers in flight at once (0 behaves like 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.walker = self.walker.with_max_depth(max_depth);
        self
    }

    /// Directory for manifest, failure and report artifacts
    /// (`None` = the download root)
    pub fn with_artifact_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.artifact_dir = dir;
        self
    }

    pub fn walker(&self) -> &TreeWalker {
        &self.walker
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Artifact locations for a run rooted at `root_id` downloading into
    /// `local_root`
    pub fn artifact_paths(&self, root_id: &NodeId, local_root: &Path) -> ArtifactPaths {
        let dir = self.artifact_dir.as_deref().unwrap_or(local_root);
        ArtifactPaths::new(dir, root_id)
    }

    // ========================================================================
    // Tree download
    // ========================================================================

    /// Downloads the subtree under `root_id` into `local_root`
    ///
    /// With `resume` set, files already present locally are skipped without
    /// contacting the store. The returned report has one outcome per manifest
    /// entry; per-item failures are recorded there and in the failure
    /// artifact, not returned as errors.
    ///
    /// # Errors
    /// Returns [`SyncError::StoreUnavailable`] or [`SyncError::Store`] if the
    /// tree cannot be enumerated, in which case no artifact is written, and
    /// [`SyncError::Io`] / [`SyncError::Artifact`] if artifacts cannot be
    /// persisted.
    #[instrument(skip(self, root_id, local_root), fields(root = %root_id, local_root = %local_root.display()))]
    pub async fn download_tree(
        &self,
        root_id: &NodeId,
        local_root: &Path,
        resume: bool,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(root_id.clone());

        let manifest = self
            .walker
            .walk(root_id, true, &path_prefix(local_root))
            .await?;

        self.local_fs.ensure_dir(local_root).await?;
        let artifacts = self.artifact_paths(root_id, local_root);
        artifacts.write_manifest(&manifest).await?;
        info!(
            entries = manifest.len(),
            manifest = %artifacts.manifest.display(),
            "Manifest written"
        );

        let outcomes = self.transfer_entries(&manifest, resume).await;
        self.finish_run(&mut report, &artifacts, &manifest, outcomes)
            .await?;

        Ok(report)
    }

    /// Re-attempts only the entries recorded as failed by the last run
    ///
    /// Reads the failure artifact of `root_id`, transfers those entries with
    /// resume on, and rewrites the failure artifact and report. The manifest
    /// artifact is left untouched.
    #[instrument(skip(self, root_id, local_root), fields(root = %root_id, local_root = %local_root.display()))]
    pub async fn retry_failed(
        &self,
        root_id: &NodeId,
        local_root: &Path,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(root_id.clone());
        let artifacts = self.artifact_paths(root_id, local_root);
        let failed = artifacts.read_failures().await?;
        info!(entries = failed.len(), "Retrying failed entries");

        let outcomes = self.transfer_entries(&failed, true).await;
        self.finish_run(&mut report, &artifacts, &failed, outcomes)
            .await?;

        Ok(report)
    }

    async fn finish_run(
        &self,
        report: &mut SyncReport,
        artifacts: &ArtifactPaths,
        entries: &[ManifestEntry],
        outcomes: Vec<TransferOutcome>,
    ) -> Result<(), SyncError> {
        let mut failures = Vec::new();
        for (entry, outcome) in entries.iter().zip(outcomes) {
            if outcome.is_failed() {
                failures.push(entry.clone());
            }
            report.record(entry, outcome);
        }
        report.finish();

        artifacts.write_failures(&failures).await?;
        artifacts.write_report(report).await?;

        if report.is_clean() {
            info!(
                succeeded = report.counts.succeeded,
                skipped = report.counts.skipped,
                duration_ms = report.duration_ms().unwrap_or(0),
                "Download complete"
            );
        } else {
            warn!(
                succeeded = report.counts.succeeded,
                skipped = report.counts.skipped,
                failed = report.counts.failed,
                failures = %artifacts.failures.display(),
                "Download finished with failures"
            );
        }
        Ok(())
    }

    // ========================================================================
    // Per-entry transfers
    // ========================================================================

    /// Realizes `entries`, returning one outcome per entry in entry order
    ///
    /// Sequential when concurrency is 1. Otherwise every folder is created
    /// first, in manifest order, and files are then transferred with at most
    /// `concurrency` in flight.
    ///
    /// Entries listed under a folder that failed (including one refused for
    /// an unsafe name) fail without touching the store or the filesystem.
    /// Parents precede children in `entries`, so one pass is enough.
    async fn transfer_entries(
        &self,
        entries: &[ManifestEntry],
        resume: bool,
    ) -> Vec<TransferOutcome> {
        let total = entries.len();
        let mut outcomes: Vec<Option<TransferOutcome>> = vec![None; total];
        let mut refused: HashSet<&str> = HashSet::new();

        if self.concurrency <= 1 {
            for (index, entry) in entries.iter().enumerate() {
                let outcome = match refused_parent(entry, &refused) {
                    Some(outcome) => outcome,
                    None => self.transfer_entry(entry, resume).await,
                };
                if entry.node.is_folder() && outcome.is_failed() {
                    refused.insert(entry.path.as_str());
                }
                log_progress(index, total, entry, &outcome);
                outcomes[index] = Some(outcome);
            }
        } else {
            for (index, entry) in entries.iter().enumerate() {
                if entry.node.is_folder() {
                    let outcome = match refused_parent(entry, &refused) {
                        Some(outcome) => outcome,
                        None => self.realize_folder(entry, resume).await,
                    };
                    if outcome.is_failed() {
                        refused.insert(entry.path.as_str());
                    }
                    log_progress(index, total, entry, &outcome);
                    outcomes[index] = Some(outcome);
                }
            }

            let mut pending = Vec::new();
            for (index, entry) in entries.iter().enumerate() {
                if entry.node.is_folder() {
                    continue;
                }
                match refused_parent(entry, &refused) {
                    Some(outcome) => {
                        log_progress(index, total, entry, &outcome);
                        outcomes[index] = Some(outcome);
                    }
                    None => pending.push((index, entry)),
                }
            }

            let mut files = stream::iter(pending)
                .map(move |(index, entry)| async move {
                    (index, self.transfer_file(entry, resume).await)
                })
                .buffer_unordered(self.concurrency);

            while let Some((index, outcome)) = files.next().await {
                log_progress(index, total, &entries[index], &outcome);
                outcomes[index] = Some(outcome);
            }
        }

        outcomes
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|| TransferOutcome::Failed("not scheduled".to_string()))
            })
            .collect()
    }

    async fn transfer_entry(&self, entry: &ManifestEntry, resume: bool) -> TransferOutcome {
        if entry.node.is_folder() {
            self.realize_folder(entry, resume).await
        } else {
            self.transfer_file(entry, resume).await
        }
    }

    /// Ensures the directory of a folder entry exists
    ///
    /// Under resume an existing directory counts as skipped, so a repeated
    /// run over a complete tree reports nothing but skips.
    async fn realize_folder(&self, entry: &ManifestEntry, resume: bool) -> TransferOutcome {
        if let Err(err) = validate_component(&entry.node.name) {
            warn!(id = %entry.node.id, error = %err, "Refusing folder name");
            return TransferOutcome::Failed(err.to_string());
        }
        let path = entry.local_path();
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if resume && is_dir {
            return TransferOutcome::SkippedExists;
        }
        match self.local_fs.ensure_dir(&path).await {
            Ok(()) => TransferOutcome::Succeeded,
            Err(err) => {
                warn!(path = %entry.path, error = %err, "Couldn't create directory");
                TransferOutcome::Failed(err.to_string())
            }
        }
    }

    async fn transfer_file(&self, entry: &ManifestEntry, resume: bool) -> TransferOutcome {
        if let Err(err) = validate_component(&entry.node.name) {
            warn!(id = %entry.node.id, error = %err, "Refusing file name");
            return TransferOutcome::Failed(err.to_string());
        }

        let path = entry.local_path();
        if resume {
            match self.local_fs.exists(&path).await {
                Ok(true) => return TransferOutcome::SkippedExists,
                Ok(false) => {}
                Err(err) => return TransferOutcome::Failed(err.to_string()),
            }
        }

        match self
            .fetch(&entry.node.id, &path, entry.node.size_bytes)
            .await
        {
            Ok(bytes) => {
                debug!(path = %entry.path, bytes, "Downloaded");
                TransferOutcome::Succeeded
            }
            Err(err) => {
                warn!(id = %entry.node.id, path = %entry.path, error = %err, "Couldn't download");
                TransferOutcome::Failed(err.to_string())
            }
        }
    }

    /// Read-and-write of one node, retried as a unit
    async fn fetch(
        &self,
        id: &NodeId,
        path: &Path,
        expected_size: Option<u64>,
    ) -> Result<u64, crate::retry::RetryError<StoreError>> {
        self.retry
            .execute_store("read", move || async move {
                let content = self.store.read(id).await?;
                let written = self
                    .local_fs
                    .write_stream(path, content, expected_size)
                    .await?;
                Ok::<u64, StoreError>(written)
            })
            .await
    }

    // ========================================================================
    // Single-node operations
    // ========================================================================

    /// Downloads one node to `local_path`, returning the bytes written
    #[instrument(skip(self, id, local_path), fields(id = %id, path = %local_path.display()))]
    pub async fn download_file(&self, id: &NodeId, local_path: &Path) -> Result<u64, SyncError> {
        let node = self
            .retry
            .execute_store("get", move || self.store.get(id))
            .await
            .map_err(|err| SyncError::structural("get", err))?;

        if node.is_folder() {
            return Err(SyncError::Store {
                operation: "read".to_string(),
                source: StoreError::Unsupported(format!("{id} is a folder")),
            });
        }

        let bytes = self
            .fetch(id, local_path, node.size_bytes)
            .await
            .map_err(|source| SyncError::Transfer {
                target: id.to_string(),
                source,
            })?;
        info!(bytes, "File downloaded");
        Ok(bytes)
    }

    /// Uploads `local_path` under `parent_id` (`None` = store root)
    ///
    /// The file is reopened for every attempt, so a retried upload starts
    /// over from the first byte.
    #[instrument(skip(self, local_path, parent_id), fields(path = %local_path.display()))]
    pub async fn upload_file(
        &self,
        local_path: &Path,
        parent_id: Option<&NodeId>,
    ) -> Result<NodeId, SyncError> {
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DomainError::UnsafeName(local_path.display().to_string()))?;
        validate_component(name)?;

        let node = self
            .retry
            .execute_store("write", move || async move {
                let (content, _len) = self.local_fs.open(local_path).await?;
                self.store.write(parent_id, name, content).await
            })
            .await
            .map_err(|source| SyncError::Transfer {
                target: local_path.display().to_string(),
                source,
            })?;

        info!(id = %node.id, "File uploaded");
        Ok(node.id)
    }

    /// Creates a remote folder called `name` under `parent_id`
    #[instrument(skip(self, parent_id))]
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&NodeId>,
    ) -> Result<Node, SyncError> {
        validate_component(name)?;
        let node = self
            .retry
            .execute_store("create_folder", move || {
                self.store.create_folder(parent_id, name)
            })
            .await
            .map_err(|err| SyncError::structural("create_folder", err))?;
        info!(id = %node.id, "Folder created");
        Ok(node)
    }

    /// Deletes a remote node
    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn delete_node(&self, id: &NodeId) -> Result<(), SyncError> {
        self.retry
            .execute_store("delete", move || self.store.delete(id))
            .await
            .map_err(|err| {
                error!(error = %err, "Delete failed");
                SyncError::structural("delete", err)
            })?;
        info!("Node deleted");
        Ok(())
    }
}

/// Outcome for an entry whose parent folder failed, if it did
fn refused_parent(entry: &ManifestEntry, refused: &HashSet<&str>) -> Option<TransferOutcome> {
    if !refused.contains(entry.parent_path()) {
        return None;
    }
    warn!(id = %entry.node.id, path = %entry.path, "Parent folder refused, skipping entry");
    Some(TransferOutcome::Failed(PARENT_REFUSED.to_string()))
}

/// Path prefix for the children of `local_root`, without a trailing slash
fn path_prefix(local_root: &Path) -> String {
    local_root
        .to_string_lossy()
        .trim_end_matches('/')
        .to_string()
}

fn log_progress(index: usize, total: usize, entry: &ManifestEntry, outcome: &TransferOutcome) {
    let status = match outcome {
        TransferOutcome::Succeeded => "succeeded",
        TransferOutcome::SkippedExists => "skipped",
        TransferOutcome::Failed(_) => "failed",
    };
    info!(
        index = index + 1,
        total,
        path = %entry.path,
        outcome = status,
        "Processed entry"
    );
}
