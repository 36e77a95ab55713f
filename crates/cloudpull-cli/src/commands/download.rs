//! Download commands - tree download, failure retry, single file
//!
//! `download` and `retry-failed` print the run's report and exit non-zero
//! when any entry failed, pointing at the failure artifact to retry from.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use cloudpull_core::domain::{NodeId, SyncReport, TransferOutcome};
use cloudpull_core::ports::IRemoteStore;
use tracing::info;

use super::AppContext;
use crate::output::{human_size, OutputFormat, OutputFormatter};

/// Download a folder tree
#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// Id of the folder to download
    pub id: String,

    /// Local directory to download into
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Transfer every file even if it already exists locally
    #[arg(long)]
    pub no_resume: bool,

    /// Number of files transferred at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl DownloadCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let id = NodeId::new(self.id.as_str())?;
        let resume = ctx.config.sync.resume && !self.no_resume;

        let mut engine = ctx.engine()?;
        if let Some(concurrency) = self.concurrency {
            engine = engine.with_concurrency(concurrency);
        }

        info!(root = %id, out = %self.out.display(), resume, "Starting download");
        let report = engine.download_tree(&id, &self.out, resume).await?;
        let failures = engine.artifact_paths(&id, &self.out).failures;

        print_report(formatter.as_ref(), format, &report)?;
        if !report.is_clean() {
            formatter.info(&format!(
                "Retry with: cloudpull retry-failed {} --out {}",
                id,
                self.out.display()
            ));
            bail!(
                "{} entries failed, see {}",
                report.counts.failed,
                failures.display()
            );
        }
        Ok(())
    }
}

/// Re-attempt the entries that failed in the last download
#[derive(Debug, Args)]
pub struct RetryFailedCommand {
    /// Id of the folder that was downloaded
    pub id: String,

    /// Local directory the folder was downloaded into
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}

impl RetryFailedCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let id = NodeId::new(self.id.as_str())?;

        let engine = ctx.engine()?;
        let report = engine.retry_failed(&id, &self.out).await?;

        print_report(formatter.as_ref(), format, &report)?;
        if !report.is_clean() {
            bail!("{} entries still failing", report.counts.failed);
        }
        Ok(())
    }
}

/// Download a single file
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Id of the file
    pub id: String,

    /// Destination path (defaults to the file's name in the current directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl GetCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = ctx.formatter(format);
        let id = NodeId::new(self.id.as_str())?;
        let store = ctx.store()?;

        let target = match &self.out {
            Some(path) => path.clone(),
            None => {
                let node = store.get(&id).await?;
                cloudpull_core::domain::validate_component(&node.name)?;
                PathBuf::from(node.name)
            }
        };

        let bytes = ctx.engine()?.download_file(&id, &target).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "id": id,
                "path": target.display().to_string(),
                "bytes": bytes,
            }));
        } else {
            formatter.success(&format!(
                "Downloaded {} ({})",
                target.display(),
                human_size(bytes)
            ));
        }
        Ok(())
    }
}

fn print_report(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    report: &SyncReport,
) -> Result<()> {
    if format.is_json() {
        formatter.print_json(&serde_json::to_value(report)?);
        return Ok(());
    }

    let summary = format!(
        "{} succeeded, {} skipped, {} failed",
        report.counts.succeeded, report.counts.skipped, report.counts.failed
    );
    if report.is_clean() {
        formatter.success(&summary);
    } else {
        formatter.warn(&summary);
    }
    if let Some(ms) = report.duration_ms() {
        formatter.info(&format!("Finished in {:.1}s", ms as f64 / 1000.0));
    }
    for record in report.failures() {
        if let TransferOutcome::Failed(reason) = &record.outcome {
            formatter.info(&format!("\u{2717} {} ({})", record.path, reason));
        }
    }
    Ok(())
}
