//! cloudpull sync - resumable bulk download engine
//!
//! Provides:
//! - Bounded retry with exponential backoff around every store call
//! - Paginated, depth-first enumeration of a remote subtree into a manifest
//! - Resumable downloads with per-item failure isolation
//!
//! ## Modules
//!
//! - [`retry`] - Retry policy and backoff schedule
//! - [`walker`] - Tree walker producing the manifest
//! - [`engine`] - Download/upload orchestration and reporting
//! - [`filesystem`] - Local filesystem adapter (streamed, verified, atomic writes)
//! - [`artifacts`] - Manifest, failure and report files

pub mod artifacts;
pub mod engine;
pub mod filesystem;
pub mod retry;
pub mod walker;

use cloudpull_core::domain::errors::DomainError;
use cloudpull_core::ports::StoreError;
use thiserror::Error;

use crate::retry::RetryError;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Caller input was rejected before any store call
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),

    /// A structural store call failed permanently
    #[error("Store error during {operation}: {source}")]
    Store {
        operation: String,
        #[source]
        source: StoreError,
    },

    /// A structural store call exhausted its retry budget
    #[error("Store unavailable: {operation} failed after {attempts} attempts: {source}")]
    StoreUnavailable {
        operation: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// A single-item transfer failed
    #[error("Transfer failed for {target}: {source}")]
    Transfer {
        target: String,
        #[source]
        source: RetryError<StoreError>,
    },

    /// An I/O error occurred on the local side
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON artifact could not be written or parsed
    #[error("Artifact error: {0}")]
    Artifact(#[from] serde_json::Error),
}

impl SyncError {
    /// Maps the outcome of a retried structural call (listing, metadata,
    /// folder creation, deletion) to the fatal error taxonomy
    pub fn structural(operation: &str, err: RetryError<StoreError>) -> Self {
        match err {
            RetryError::Permanent(source) => Self::Store {
                operation: operation.to_string(),
                source,
            },
            RetryError::Exhausted { attempts, last } => Self::StoreUnavailable {
                operation: operation.to_string(),
                attempts,
                source: last,
            },
        }
    }

    /// Returns true if the retry budget of a structural call ran out
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}
