//! Ls command - list the children of a folder
//!
//! With `--recursive` the whole subtree is listed depth-first, each path
//! built from `--prefix`. `--dump PREFIX` also writes `PREFIX.file.json`
//! and `PREFIX.paths.txt`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use cloudpull_core::domain::NodeId;
use cloudpull_sync::artifacts::dump_files_info;

use super::AppContext;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct LsCommand {
    /// Folder id (`root` for the top-level folder)
    pub id: String,

    /// Descend into sub-folders
    #[arg(short, long)]
    pub recursive: bool,

    /// Path prefix for listed entries
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Write `<PREFIX>.file.json` and `<PREFIX>.paths.txt`
    #[arg(long, value_name = "PREFIX")]
    pub dump: Option<PathBuf>,
}

impl LsCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let id = NodeId::new(self.id.as_str())?;

        let entries = ctx
            .engine()?
            .walker()
            .walk(&id, self.recursive, &self.prefix)
            .await?;

        if let Some(prefix) = &self.dump {
            let (info, paths) = dump_files_info(&entries, prefix).await?;
            formatter.info(&format!("Wrote {} and {}", info.display(), paths.display()));
        }

        if format.is_json() {
            formatter.print_json(&serde_json::to_value(&entries)?);
            return Ok(());
        }

        for entry in &entries {
            let suffix = if entry.node.is_folder() { "/" } else { "" };
            println!("{}{}", entry.path, suffix);
        }
        formatter.success(&format!("{} entries", entries.len()));
        Ok(())
    }
}
