//! cloudpull store - remote store adapters
//!
//! Implements the [`IRemoteStore`] port from `cloudpull-core`:
//!
//! - [`local_dir::LocalDirStore`] - a directory tree acting as the remote,
//!   useful for mirrors, mounted shares and end-to-end testing
//! - [`memory::InMemoryRemoteStore`] - a fully in-memory store with call
//!   counters, used by the engine's test suites

pub mod local_dir;
pub mod memory;

use std::sync::Arc;

use anyhow::Context;
use cloudpull_core::config::{StoreBackend, StoreConfig};
use cloudpull_core::ports::IRemoteStore;

pub use local_dir::LocalDirStore;
pub use memory::InMemoryRemoteStore;

/// Builds the store adapter selected by the `store` configuration section
pub fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn IRemoteStore>> {
    match config.backend {
        StoreBackend::LocalDir => {
            let store = LocalDirStore::new(&config.root)
                .with_context(|| format!("Failed to open store root {}", config.root.display()))?
                .with_page_size(config.page_size);
            Ok(Arc::new(store))
        }
    }
}
