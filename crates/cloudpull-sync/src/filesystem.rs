//! Local filesystem adapter
//!
//! Wraps the `tokio::fs` calls the engine needs on the local side.
//!
//! ## Design Decisions
//!
//! - **Streamed writes**: content is copied from the store's reader straight
//!   into a `<path>.part` file, never buffered in memory.
//! - **Atomic publish**: the `.part` file is renamed onto the final path only
//!   after the byte count matches the node's announced size, so a file that
//!   exists at its final path is always complete. That is what makes
//!   existence a sound resume test.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cloudpull_core::ports::{ByteStream, StoreError};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Suffix of in-flight downloads
pub const PARTIAL_SUFFIX: &str = ".part";

/// Adapter for the local side of transfers
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if anything (file, directory, symlink) exists at `path`
    pub async fn exists(&self, path: &Path) -> std::io::Result<bool> {
        match tokio::fs::symlink_metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Creates `path` and any missing parents; an existing directory is fine
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ensure_dir(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await?;
        debug!("directory ensured");
        Ok(())
    }

    /// Streams `content` to `path` via a `.part` file and returns the byte count
    ///
    /// When `expected_size` is known and differs from what was received, the
    /// partial file is removed and [`StoreError::SizeMismatch`] is returned.
    #[instrument(skip(self, content), fields(path = %path.display()))]
    pub async fn write_stream(
        &self,
        path: &Path,
        mut content: ByteStream,
        expected_size: Option<u64>,
    ) -> Result<u64, StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = partial_path(path);
        let result = async {
            let mut file = tokio::fs::File::create(&part).await?;
            let written = tokio::io::copy(&mut content, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, StoreError>(written)
        }
        .await;

        let written = match result {
            Ok(written) => written,
            Err(err) => {
                discard(&part).await;
                return Err(err);
            }
        };

        if let Some(expected) = expected_size {
            if expected != written {
                discard(&part).await;
                return Err(StoreError::SizeMismatch {
                    expected,
                    actual: written,
                });
            }
        }

        tokio::fs::rename(&part, path).await?;
        debug!(bytes = written, "write complete");
        Ok(written)
    }

    /// Opens a local file for upload, returning the stream and its length
    pub async fn open(&self, path: &Path) -> std::io::Result<(ByteStream, u64)> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok((Box::new(file), len))
    }
}

/// `<path>.part`
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn discard(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await {
        if e.kind() != ErrorKind::NotFound {
            debug!(path = %part.display(), error = %e, "failed to remove partial file");
        }
    }
}
