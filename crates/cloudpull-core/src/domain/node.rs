//! Remote nodes and manifest entries
//!
//! A [`Node`] is an immutable snapshot of one object in the remote store,
//! taken at enumeration time. A [`ManifestEntry`] pairs a node with the local
//! path assigned to it during a walk.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::NodeId;

/// Kind of a remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Regular file with byte content
    File,
    /// Container of other nodes
    Folder,
    /// Link to another node
    Shortcut,
    /// Store-native document (spreadsheet, slides, ...) without raw bytes
    TypedDocument,
}

impl NodeKind {
    /// Returns true for [`NodeKind::Folder`]
    #[must_use]
    pub fn is_folder(self) -> bool {
        matches!(self, Self::Folder)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::File => "file",
            Self::Folder => "folder",
            Self::Shortcut => "shortcut",
            Self::TypedDocument => "typed_document",
        };
        f.write_str(s)
    }
}

/// Snapshot of one remote object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Store-assigned identifier
    pub id: NodeId,
    /// Display name, unique among siblings
    pub name: String,
    /// Node kind
    pub kind: NodeKind,
    /// Content length in bytes, when the store knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
}

impl Node {
    /// Creates a node with both timestamps set to now
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind, size_bytes: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            kind,
            size_bytes,
            created_at: now,
            modified_at: now,
        }
    }

    /// Overrides the creation and modification timestamps
    #[must_use]
    pub fn with_times(mut self, created_at: DateTime<Utc>, modified_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.modified_at = modified_at;
        self
    }

    /// Returns true if this node is a folder
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

/// Checks that `name` can be used as exactly one local path component
///
/// # Errors
/// Returns [`DomainError::UnsafeName`] for empty names, `.`, `..`, and names
/// containing a path separator or NUL.
pub fn validate_component(name: &str) -> Result<(), DomainError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(&['/', '\\', '\0'][..]);
    if unsafe_name {
        return Err(DomainError::UnsafeName(name.to_string()));
    }
    Ok(())
}

/// A node together with the local path assigned during a walk
///
/// Serialized flat: the node's fields followed by `path`, which is the shape
/// of the manifest and failure artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub node: Node,
    /// `parent_prefix + "/" + node.name`, fixed at enumeration time
    pub path: String,
}

impl ManifestEntry {
    /// Builds the entry for `node` listed under `prefix`
    pub fn new(node: Node, prefix: &str) -> Self {
        let path = Self::child_path(prefix, &node.name);
        Self { node, path }
    }

    /// Path of a child called `name` under `prefix`
    #[must_use]
    pub fn child_path(prefix: &str, name: &str) -> String {
        format!("{prefix}/{name}")
    }

    /// The entry's path as a filesystem path
    #[must_use]
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    /// The path of the folder this entry was listed under
    #[must_use]
    pub fn parent_path(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .unwrap_or("")
    }
}
