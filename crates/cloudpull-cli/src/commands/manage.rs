//! Remote-side commands: upload, mkdir, rm

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use cloudpull_core::domain::NodeId;

use super::AppContext;
use crate::output::{OutputFormat, OutputFormatter};

fn parse_parent(parent: Option<&str>) -> Result<Option<NodeId>> {
    Ok(parent.map(NodeId::new).transpose()?)
}

fn report_node(formatter: &dyn OutputFormatter, format: OutputFormat, verb: &str, id: &NodeId) {
    if format.is_json() {
        formatter.print_json(&serde_json::json!({"success": true, "id": id}));
    } else {
        formatter.success(&format!("{verb} {id}"));
    }
}

/// Upload a local file
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Local file to upload
    pub path: PathBuf,

    /// Destination folder id (defaults to the top-level folder)
    #[arg(long)]
    pub parent: Option<String>,
}

impl UploadCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let parent = parse_parent(self.parent.as_deref())?;

        let id = ctx
            .engine()?
            .upload_file(&self.path, parent.as_ref())
            .await?;

        report_node(formatter.as_ref(), format, "Uploaded as", &id);
        Ok(())
    }
}

/// Create a remote folder
#[derive(Debug, Args)]
pub struct MkdirCommand {
    /// Folder name
    pub name: String,

    /// Parent folder id (defaults to the top-level folder)
    #[arg(long)]
    pub parent: Option<String>,
}

impl MkdirCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let parent = parse_parent(self.parent.as_deref())?;

        let node = ctx
            .engine()?
            .create_folder(&self.name, parent.as_ref())
            .await?;

        report_node(formatter.as_ref(), format, "Created folder", &node.id);
        Ok(())
    }
}

/// Delete a remote node
#[derive(Debug, Args)]
pub struct RmCommand {
    /// Id of the node to delete
    pub id: String,
}

impl RmCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let id = NodeId::new(self.id.as_str())?;

        ctx.engine()?.delete_node(&id).await?;

        report_node(formatter.as_ref(), format, "Deleted", &id);
        Ok(())
    }
}
