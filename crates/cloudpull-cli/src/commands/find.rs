//! Find command - search nodes by name filter expression
//!
//! `cloudpull find "report+!draft" --files --parent <ID>` lists every file
//! whose name contains `report` but not `draft` directly under `<ID>`.

use anyhow::{Context, Result};
use clap::Args;
use cloudpull_core::domain::{Node, NodeId, QueryBuilder};
use tracing::info;

use super::AppContext;
use crate::output::{human_size, OutputFormat};

#[derive(Debug, Args)]
pub struct FindCommand {
    /// Filter expression: `+`-separated tokens, `!` excludes
    #[arg(default_value = "")]
    pub expr: String,

    /// Only folders
    #[arg(long, conflicts_with = "files")]
    pub folders: bool,

    /// Only non-folders
    #[arg(long)]
    pub files: bool,

    /// Restrict to the direct children of this folder
    #[arg(long)]
    pub parent: Option<String>,

    /// Allow a query without any condition (lists the whole store)
    #[arg(long)]
    pub all: bool,
}

impl FindCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);

        let parent = self.parent.as_deref().map(NodeId::new).transpose()?;
        let query = QueryBuilder::new()
            .name_filter(self.expr.as_str())
            .kind(self.kind_filter())
            .parent(parent)
            .match_all(self.all)
            .build()
            .context("Invalid filter expression")?;

        info!(query = %query, "Searching");
        let nodes = ctx.engine()?.walker().search(&query).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::to_value(&nodes)?);
            return Ok(());
        }

        formatter.success(&format!(
            "{} match{}",
            nodes.len(),
            if nodes.len() == 1 { "" } else { "es" }
        ));
        for node in &nodes {
            println!("{}", describe(node));
        }
        Ok(())
    }

    fn kind_filter(&self) -> Option<bool> {
        match (self.folders, self.files) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }
}

/// One listing line: kind marker, size, id, name
pub fn describe(node: &Node) -> String {
    let marker = if node.is_folder() { 'd' } else { '-' };
    let size = node.size_bytes.map(human_size).unwrap_or_else(|| "-".into());
    format!("{marker} {size:>8}  {:<34} {}", node.id, node.name)
}
