//! Persistent artifacts of a download run
//!
//! A run rooted at node `X` writes three JSON files into the artifact
//! directory, named after `X`'s file-name-safe stem:
//!
//! | File | Content |
//! |------|---------|
//! | `<stem>.filelist.json` | the full manifest, in walk order |
//! | `<stem>.skipped.json`  | manifest entries whose transfer failed |
//! | `<stem>.report.json`   | the [`SyncReport`] |
//!
//! The failure subset is always rewritten at the end of a run, so an empty
//! list means the last run completed cleanly. All writes go through a
//! temporary file and a rename.

use std::path::{Path, PathBuf};

use cloudpull_core::domain::{ManifestEntry, NodeId, SyncReport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::filesystem::partial_path;
use crate::SyncError;

const MANIFEST_SUFFIX: &str = ".filelist.json";
const FAILURES_SUFFIX: &str = ".skipped.json";
const REPORT_SUFFIX: &str = ".report.json";
const FILE_INFO_SUFFIX: &str = ".file.json";
const PATHS_SUFFIX: &str = ".paths.txt";

/// Locations of the artifacts of one root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub manifest: PathBuf,
    pub failures: PathBuf,
    pub report: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, root_id: &NodeId) -> Self {
        let stem = root_id.artifact_stem();
        Self {
            manifest: dir.join(format!("{stem}{MANIFEST_SUFFIX}")),
            failures: dir.join(format!("{stem}{FAILURES_SUFFIX}")),
            report: dir.join(format!("{stem}{REPORT_SUFFIX}")),
        }
    }

    pub async fn write_manifest(&self, manifest: &[ManifestEntry]) -> Result<(), SyncError> {
        write_json(&self.manifest, &manifest).await
    }

    pub async fn read_manifest(&self) -> Result<Vec<ManifestEntry>, SyncError> {
        read_json(&self.manifest).await
    }

    pub async fn write_failures(&self, failures: &[ManifestEntry]) -> Result<(), SyncError> {
        write_json(&self.failures, &failures).await
    }

    pub async fn read_failures(&self) -> Result<Vec<ManifestEntry>, SyncError> {
        read_json(&self.failures).await
    }

    pub async fn write_report(&self, report: &SyncReport) -> Result<(), SyncError> {
        write_json(&self.report, report).await
    }

    pub async fn read_report(&self) -> Result<SyncReport, SyncError> {
        read_json(&self.report).await
    }
}

/// Writes `<prefix>.file.json` (full entries) and `<prefix>.paths.txt`
/// (one path per line) for an arbitrary listing
///
/// Returns the two paths written.
pub async fn dump_files_info(
    entries: &[ManifestEntry],
    prefix: &Path,
) -> Result<(PathBuf, PathBuf), SyncError> {
    let info_path = with_suffix(prefix, FILE_INFO_SUFFIX);
    let paths_path = with_suffix(prefix, PATHS_SUFFIX);

    write_json(&info_path, &entries).await?;

    let mut listing = String::new();
    for entry in entries {
        listing.push_str(&entry.path);
        listing.push('\n');
    }
    write_atomic(&paths_path, listing.as_bytes()).await?;

    Ok((info_path, paths_path))
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SyncError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).await
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SyncError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = partial_path(path);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
