//! cloudpull CLI - bulk transfers against a remote object store
//!
//! Provides commands for:
//! - Searching and listing remote nodes
//! - Resumable tree downloads and failure-only retries
//! - Single-file download and upload, folder creation, deletion
//! - Viewing and editing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand,
    download::{DownloadCommand, GetCommand, RetryFailedCommand},
    find::FindCommand,
    ls::LsCommand,
    manage::{MkdirCommand, RmCommand, UploadCommand},
    AppContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "cloudpull",
    version,
    about = "Resumable bulk transfers against a remote object store"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search nodes by name filter expression
    Find(FindCommand),
    /// List the children of a folder
    Ls(LsCommand),
    /// Download a folder tree
    Download(DownloadCommand),
    /// Re-attempt the entries that failed in the last download
    RetryFailed(RetryFailedCommand),
    /// Download a single file
    Get(GetCommand),
    /// Upload a local file
    Upload(UploadCommand),
    /// Create a remote folder
    Mkdir(MkdirCommand),
    /// Delete a remote node
    Rm(RmCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = AppContext::load(cli.config.clone(), cli.quiet)?;
    init_tracing(&ctx, cli.verbose, cli.quiet);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Find(cmd) => cmd.execute(&ctx, format).await,
        Commands::Ls(cmd) => cmd.execute(&ctx, format).await,
        Commands::Download(cmd) => cmd.execute(&ctx, format).await,
        Commands::RetryFailed(cmd) => cmd.execute(&ctx, format).await,
        Commands::Get(cmd) => cmd.execute(&ctx, format).await,
        Commands::Upload(cmd) => cmd.execute(&ctx, format).await,
        Commands::Mkdir(cmd) => cmd.execute(&ctx, format).await,
        Commands::Rm(cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(cmd) => cmd.execute(&ctx, format).await,
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`/`-q`, which win over the
/// configured level
fn init_tracing(ctx: &AppContext, verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => ctx.config.logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if ctx.config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
