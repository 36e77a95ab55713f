//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the core depends on while their implementations
//! live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - hierarchical remote object store (list, get, read, write, delete)

pub mod remote_store;

pub use remote_store::{ByteStream, IRemoteStore, NodePage, StoreError};
