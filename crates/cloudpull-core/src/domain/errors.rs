//! Domain error types
//!
//! Errors raised while validating caller input: node identifiers,
//! filter expressions and names used as local path components.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid node identifier
    #[error("Invalid node ID: {0}")]
    InvalidNodeId(String),

    /// A `+`-separated filter expression contained an empty token
    #[error("Empty token in filter expression: {0:?}")]
    EmptyFilterToken(String),

    /// No filter was given and match-all was not requested
    #[error("Query has no conditions; pass an explicit match-all to list the whole store")]
    UnboundedQuery,

    /// A node name cannot be used as a single local path component
    #[error("Unsafe node name: {0:?}")]
    UnsafeName(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
