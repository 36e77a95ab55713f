//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for identifiers handed out by the remote store.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// NodeId
// ============================================================================

/// Opaque identifier of a node in the remote store
///
/// The store decides the format; the only rules enforced here are that the
/// identifier is non-empty and free of control characters, so it can be
/// logged and written to JSON artifacts safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

/// Identifier accepted by stores as "the top-level folder"
pub const ROOT_ALIAS: &str = "root";

impl NodeId {
    /// Create a new NodeId
    ///
    /// # Errors
    /// Returns error if the identifier is empty or contains control characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidNodeId(
                "Node ID cannot be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_control) {
            return Err(DomainError::InvalidNodeId(format!(
                "Node ID contains control characters: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// The conventional alias of a store's top-level folder
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_ALIAS.to_string())
    }

    /// A fresh random identifier, for stores that mint their own ids
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-name-safe rendering of the identifier
    ///
    /// Every character outside `[A-Za-z0-9._-]` becomes `_`. Used to name the
    /// manifest, failure and report artifacts of a walk rooted at this node.
    #[must_use]
    pub fn artifact_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

// ============================================================================
// PageToken
// ============================================================================

/// Continuation token returned by a paginated listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    /// Wrap a store-issued continuation token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PageToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
