//! Structured store queries
//!
//! A [`Query`] is an ordered conjunction of [`Condition`]s. There is no OR and
//! no nesting; stores translate the conjunction into their native grammar.
//!
//! [`QueryBuilder`] turns the compact filter expression used on the command
//! line (`hello+!cruel+world`) into conditions:
//!
//! ```
//! use cloudpull_core::domain::query::{build, Condition};
//!
//! let query = build("hello+!cruel", Some(false), None).unwrap();
//! assert_eq!(query.conditions()[1], Condition::NameExcludes("cruel".into()));
//! ```

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::NodeId;
use super::node::Node;

/// Token separator in filter expressions
pub const TOKEN_SEPARATOR: char = '+';

/// Prefix that turns a token into an exclusion
pub const EXCLUDE_PREFIX: char = '!';

/// Folder / not-folder restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFilter {
    Folder,
    NotFolder,
}

/// One AND-combined query condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Name contains the substring
    NameContains(String),
    /// Name does not contain the substring
    NameExcludes(String),
    /// Node is / is not a folder
    KindIs(KindFilter),
    /// Node is a direct child of the given folder
    ParentIs(NodeId),
}

impl Condition {
    /// Evaluates a name or kind condition against a node
    ///
    /// `ParentIs` depends on store topology and always returns true here;
    /// stores apply it through [`Query::parent`].
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Self::NameContains(s) => node.name.contains(s.as_str()),
            Self::NameExcludes(s) => !node.name.contains(s.as_str()),
            Self::KindIs(KindFilter::Folder) => node.is_folder(),
            Self::KindIs(KindFilter::NotFolder) => !node.is_folder(),
            Self::ParentIs(_) => true,
        }
    }
}

fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameContains(s) => write!(f, "name contains {}", quote(s)),
            Self::NameExcludes(s) => write!(f, "not name contains {}", quote(s)),
            Self::KindIs(KindFilter::Folder) => f.write_str("kind = folder"),
            Self::KindIs(KindFilter::NotFolder) => f.write_str("kind != folder"),
            Self::ParentIs(id) => write!(f, "{} in parents", quote(id.as_str())),
        }
    }
}

/// Ordered conjunction of conditions
///
/// An empty query matches every node in the store. It can only be obtained
/// through an explicit match-all request on [`QueryBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    conditions: Vec<Condition>,
}

impl Query {
    /// Query listing the direct children of `parent`
    #[must_use]
    pub fn children_of(parent: &NodeId) -> Self {
        Self {
            conditions: vec![Condition::ParentIs(parent.clone())],
        }
    }

    /// The conditions, in insertion order
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns true when the query has no conditions (matches everything)
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The parent scope, if the query has a `ParentIs` condition
    #[must_use]
    pub fn parent(&self) -> Option<&NodeId> {
        self.conditions.iter().find_map(|c| match c {
            Condition::ParentIs(id) => Some(id),
            _ => None,
        })
    }

    /// Evaluates every name and kind condition against `node`
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        self.conditions.iter().all(|c| c.matches(node))
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return f.write_str("*");
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{condition}")?;
        }
        Ok(())
    }
}

/// Builds a [`Query`] from filter criteria
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    name_filter: String,
    kind: Option<bool>,
    parent: Option<NodeId>,
    match_all: bool,
}

impl QueryBuilder {
    /// Creates an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `+`-separated name filter expression
    #[must_use]
    pub fn name_filter(mut self, expr: impl Into<String>) -> Self {
        self.name_filter = expr.into();
        self
    }

    /// `Some(true)` restricts to folders, `Some(false)` to non-folders
    #[must_use]
    pub fn kind(mut self, is_folder: Option<bool>) -> Self {
        self.kind = is_folder;
        self
    }

    /// Restricts the query to direct children of `parent`
    #[must_use]
    pub fn parent(mut self, parent: Option<NodeId>) -> Self {
        self.parent = parent;
        self
    }

    /// Allows a query without any condition
    #[must_use]
    pub fn match_all(mut self, match_all: bool) -> Self {
        self.match_all = match_all;
        self
    }

    /// Produces the query
    ///
    /// # Errors
    /// - [`DomainError::EmptyFilterToken`] if a non-empty expression contains
    ///   an empty token (`a++b`, a trailing `+`, a bare `!`)
    /// - [`DomainError::UnboundedQuery`] if no condition would be produced and
    ///   match-all was not requested
    pub fn build(self) -> Result<Query, DomainError> {
        let mut conditions = Vec::new();

        if !self.name_filter.is_empty() {
            for token in self.name_filter.split(TOKEN_SEPARATOR) {
                let (fragment, excluded) = match token.strip_prefix(EXCLUDE_PREFIX) {
                    Some(rest) => (rest, true),
                    None => (token, false),
                };
                if fragment.is_empty() {
                    return Err(DomainError::EmptyFilterToken(self.name_filter.clone()));
                }
                conditions.push(if excluded {
                    Condition::NameExcludes(fragment.to_string())
                } else {
                    Condition::NameContains(fragment.to_string())
                });
            }
        }

        if let Some(is_folder) = self.kind {
            let filter = if is_folder {
                KindFilter::Folder
            } else {
                KindFilter::NotFolder
            };
            conditions.push(Condition::KindIs(filter));
        }

        if let Some(parent) = self.parent {
            conditions.push(Condition::ParentIs(parent));
        }

        if conditions.is_empty() && !self.match_all {
            return Err(DomainError::UnboundedQuery);
        }

        Ok(Query { conditions })
    }
}

/// Builds a query from a name filter, optional kind filter and optional parent
///
/// # Errors
/// See [`QueryBuilder::build`]; this form never opts into match-all.
pub fn build(
    name_filter_expr: &str,
    kind_filter: Option<bool>,
    parent_id: Option<&NodeId>,
) -> Result<Query, DomainError> {
    QueryBuilder::new()
        .name_filter(name_filter_expr)
        .kind(kind_filter)
        .parent(parent_id.cloned())
        .build()
}
