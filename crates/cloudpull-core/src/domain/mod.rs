//! Domain entities and business logic
//!
//! This module contains the core domain types for cloudpull:
//! - Newtypes for store identifiers
//! - Remote nodes and manifest entries
//! - The structured query grammar and its builder
//! - Transfer outcomes and sync reports
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod node;
pub mod query;
pub mod report;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::{NodeId, PageToken};
pub use node::{validate_component, ManifestEntry, Node, NodeKind};
pub use query::{Condition, KindFilter, Query, QueryBuilder};
pub use report::{OutcomeRecord, SyncCounts, SyncReport, TransferOutcome};
