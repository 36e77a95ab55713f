//! CLI subcommands and the context they share

pub mod config;
pub mod download;
pub mod find;
pub mod ls;
pub mod manage;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cloudpull_core::config::Config;
use cloudpull_core::ports::IRemoteStore;
use cloudpull_sync::engine::SyncEngine;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Configuration and flags resolved once per invocation
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub quiet: bool,
}

impl AppContext {
    /// Loads `--config` (or the default path) when the file exists, else
    /// built-in defaults
    ///
    /// An explicitly named file that exists but does not parse is an error.
    pub fn load(explicit: Option<PathBuf>, quiet: bool) -> Result<Self> {
        let (config, config_path) = match explicit {
            Some(path) if path.exists() => (Config::load(&path)?, path),
            Some(path) => (Config::default(), path),
            None => {
                let path = Config::default_path();
                (Config::load_or_default(&path), path)
            }
        };
        Ok(Self {
            config,
            config_path,
            quiet,
        })
    }

    pub fn formatter(&self, format: OutputFormat) -> Box<dyn OutputFormatter> {
        get_formatter(format, self.quiet)
    }

    pub fn store(&self) -> Result<Arc<dyn IRemoteStore>> {
        cloudpull_store::open_store(&self.config.store).context("Failed to open remote store")
    }

    pub fn engine(&self) -> Result<SyncEngine> {
        Ok(SyncEngine::from_config(self.store()?, &self.config))
    }
}
