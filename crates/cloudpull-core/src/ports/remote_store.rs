//! Remote store port (driven/secondary port)
//!
//! This module defines the minimal capability cloudpull needs from a
//! hierarchical remote object store. Vendor specifics (authentication,
//! token storage, API field names) stay inside the adapter; the adapter is
//! handed to the sync engine already authenticated.
//!
//! ## Design Notes
//!
//! - Errors are classified through [`StoreError`] so the retry policy can
//!   tell transient failures (rate limits, timeouts, dropped connections)
//!   from permanent ones (not found, forbidden).
//! - Content flows as a boxed [`AsyncRead`] in both directions, so large
//!   objects are never buffered wholesale.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncRead;

use crate::domain::newtypes::{NodeId, PageToken};
use crate::domain::node::Node;
use crate::domain::query::Query;

/// Byte content flowing to or from the store
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct NodePage {
    /// Nodes on this page
    pub nodes: Vec<Node>,
    /// Token for the next page (None on the last page)
    pub next_page_token: Option<PageToken>,
}

/// Errors reported by a remote store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// The node does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller lacks permission for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The store asked the caller to slow down
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-provided delay hint
        retry_after: Option<Duration>,
    },

    /// The request timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The store is temporarily unavailable (5xx, maintenance, ...)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The node has no byte content the store can export
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A transfer delivered a different number of bytes than announced
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// The request was rejected as malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An I/O error occurred while streaming content
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Whether retrying the same call may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. }
            | Self::Timeout(_)
            | Self::Unavailable(_)
            | Self::SizeMismatch { .. } => true,
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::BrokenPipe
            ),
            Self::NotFound(_)
            | Self::PermissionDenied(_)
            | Self::Unsupported(_)
            | Self::InvalidRequest(_) => false,
        }
    }

    /// Delay requested by the store before the next attempt
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-readable class name, used in retry telemetry
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::RateLimited { .. } => "rate_limited",
            Self::Timeout(_) => "timeout",
            Self::Unavailable(_) => "unavailable",
            Self::Unsupported(_) => "unsupported",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Io(_) => "io",
        }
    }
}

/// Port trait for remote store operations
///
/// All methods assume an authenticated session; establishing and refreshing
/// it is the adapter's responsibility.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists nodes matching `query`, one page at a time
    ///
    /// Pass `None` for the first page and the returned `next_page_token`
    /// for the following ones until it comes back `None`.
    async fn list(&self, query: &Query, page_token: Option<&PageToken>)
        -> Result<NodePage, StoreError>;

    /// Retrieves metadata for a node
    async fn get(&self, id: &NodeId) -> Result<Node, StoreError>;

    /// Opens the byte content of a node
    async fn read(&self, id: &NodeId) -> Result<ByteStream, StoreError>;

    /// Creates a new file node called `name` under `parent_id`
    ///
    /// `None` places the node under the store root.
    async fn write(
        &self,
        parent_id: Option<&NodeId>,
        name: &str,
        content: ByteStream,
    ) -> Result<Node, StoreError>;

    /// Creates a folder called `name` under `parent_id` (`None` = store root)
    async fn create_folder(&self, parent_id: Option<&NodeId>, name: &str)
        -> Result<Node, StoreError>;

    /// Deletes a node
    async fn delete(&self, id: &NodeId) -> Result<(), StoreError>;
}
