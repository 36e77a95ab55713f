//! Config command - View and manage cloudpull configuration
//!
//! Provides the `cloudpull config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Writes a default configuration file
//! 4. Sets individual values via dot-notation keys

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use cloudpull_core::config::Config;
use tracing::info;

use super::AppContext;
use crate::output::OutputFormat;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "retry.max_attempts")
        key: String,
        /// New value
        value: String,
    },
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx, format),
            ConfigCommand::Validate => self.execute_validate(ctx, format),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force, format),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value, format),
        }
    }

    fn execute_show(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");
            for line in ctx.config.to_yaml()?.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let config_path = &ctx.config_path;

        // Load explicitly so parse errors surface instead of falling back
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {e:#}")
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                    formatter.info("Run 'cloudpull config init' to create one.");
                }
                bail!("{message}");
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");
        let errors = config.validate();

        if format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        if !errors.is_empty() {
            bail!(
                "{} is invalid ({} errors)",
                config_path.display(),
                errors.len()
            );
        }
        Ok(())
    }

    fn execute_init(&self, ctx: &AppContext, force: bool, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let config_path = &ctx.config_path;

        if config_path.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            );
        }
        save(&Config::default(), config_path)?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Wrote {}", config_path.display()));
        }
        Ok(())
    }

    fn execute_set(
        &self,
        ctx: &AppContext,
        key: &str,
        value: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = ctx.formatter(format);
        let mut config = ctx.config.clone();

        info!(key = %key, value = %value, "Setting configuration value");
        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<26} - {help}"));
                }
            }
            return Ok(());
        }

        // The store root may be created after the value is set
        let errors: Vec<String> = config
            .validate()
            .into_iter()
            .filter(|e| e.field != "store.root")
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    errors.join("; ")
                ));
            }
            return Ok(());
        }

        save(&config, &ctx.config_path)?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("store.root", "Directory served by the local_dir backend"),
    ("store.page_size", "Nodes per listing page"),
    ("retry.max_attempts", "Attempts per store call"),
    ("retry.initial_backoff_ms", "First retry delay"),
    ("retry.max_backoff_ms", "Upper bound for a retry delay"),
    ("retry.multiplier", "Delay growth factor"),
    ("retry.jitter", "true|false"),
    ("sync.resume", "Skip files that exist locally (true|false)"),
    ("sync.concurrency", "Parallel file transfers"),
    ("sync.max_depth", "Folder depth limit, or 'none'"),
    ("sync.artifact_dir", "Artifact directory, or 'none'"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.format", "pretty|json"),
];

fn save(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    std::fs::write(path, config.to_yaml()?).context("Failed to write configuration file")?;
    Ok(())
}

fn parse_optional<T: std::str::FromStr>(value: &str) -> Option<std::result::Result<T, T::Err>> {
    (value != "none").then(|| value.parse::<T>())
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- store ---
        "store.root" => config.store.root = PathBuf::from(value),
        "store.page_size" => {
            config.store.page_size = value
                .parse::<usize>()
                .context("Expected a positive integer for store.page_size")?;
        }

        // --- retry ---
        "retry.max_attempts" => {
            config.retry.max_attempts = value
                .parse::<u32>()
                .context("Expected a positive integer for retry.max_attempts")?;
        }
        "retry.initial_backoff_ms" => {
            config.retry.initial_backoff_ms = value
                .parse::<u64>()
                .context("Expected milliseconds for retry.initial_backoff_ms")?;
        }
        "retry.max_backoff_ms" => {
            config.retry.max_backoff_ms = value
                .parse::<u64>()
                .context("Expected milliseconds for retry.max_backoff_ms")?;
        }
        "retry.multiplier" => {
            config.retry.multiplier = value
                .parse::<f64>()
                .context("Expected a number for retry.multiplier")?;
        }
        "retry.jitter" => {
            config.retry.jitter = value
                .parse::<bool>()
                .context("Expected true or false for retry.jitter")?;
        }

        // --- sync ---
        "sync.resume" => {
            config.sync.resume = value
                .parse::<bool>()
                .context("Expected true or false for sync.resume")?;
        }
        "sync.concurrency" => {
            config.sync.concurrency = value
                .parse::<usize>()
                .context("Expected a positive integer for sync.concurrency")?;
        }
        "sync.max_depth" => {
            config.sync.max_depth = parse_optional::<usize>(value)
                .transpose()
                .context("Expected a positive integer or 'none' for sync.max_depth")?;
        }
        "sync.artifact_dir" => {
            config.sync.artifact_dir = (value != "none").then(|| PathBuf::from(value));
        }

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.format" => config.logging.format = value.to_string(),

        _ => bail!("Unknown configuration key: {}", key),
    }
    Ok(())
}
