//! cloudpull core - domain model and port definitions
//!
//! This crate contains the hexagonal core of cloudpull:
//! - **Domain types** - `Node`, `ManifestEntry`, `Query`, `SyncReport`
//! - **Query grammar** - `QueryBuilder` turning filter expressions into conditions
//! - **Port definitions** - the `IRemoteStore` trait that store adapters implement
//! - **Configuration** - the YAML configuration file
//!
//! # Architecture
//!
//! The domain module has no I/O. Ports define the trait that adapter crates
//! implement; the sync crate drives the domain through those ports.

pub mod config;
pub mod domain;
pub mod ports;
