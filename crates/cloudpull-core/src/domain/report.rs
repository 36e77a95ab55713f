//! Per-entry transfer outcomes and the aggregate sync report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::NodeId;
use super::node::{ManifestEntry, NodeKind};

/// Result of processing one manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferOutcome {
    /// Content transferred (or, for folders, directory ensured)
    Succeeded,
    /// A local object already existed and resume was requested
    SkippedExists,
    /// Transfer failed; the entry is part of the failure subset
    Failed(String),
}

impl TransferOutcome {
    /// Returns true for [`TransferOutcome::Failed`]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome of one manifest entry, as recorded in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: NodeId,
    pub path: String,
    pub kind: NodeKind,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
}

/// Aggregate counts of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncCounts {
    /// Total number of entries counted
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Completion report of a download run
///
/// Outcomes are kept in manifest order regardless of the order in which
/// transfers completed, so two reports of the same tree can be diffed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub root_id: NodeId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: SyncCounts,
    pub outcomes: Vec<OutcomeRecord>,
}

impl SyncReport {
    /// Starts an empty report for a run rooted at `root_id`
    pub fn new(root_id: NodeId) -> Self {
        Self {
            root_id,
            started_at: Utc::now(),
            finished_at: None,
            counts: SyncCounts::default(),
            outcomes: Vec::new(),
        }
    }

    /// Appends the outcome of `entry` and updates the counts
    pub fn record(&mut self, entry: &ManifestEntry, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Succeeded => self.counts.succeeded += 1,
            TransferOutcome::SkippedExists => self.counts.skipped += 1,
            TransferOutcome::Failed(_) => self.counts.failed += 1,
        }
        self.outcomes.push(OutcomeRecord {
            id: entry.node.id.clone(),
            path: entry.path.clone(),
            kind: entry.node.kind,
            outcome,
        });
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Returns true if no entry failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.counts.failed == 0
    }

    /// Failed records, in manifest order
    pub fn failures(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.outcomes.iter().filter(|r| r.outcome.is_failed())
    }

    /// Wall-clock duration in milliseconds, once finished
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0) as u64)
    }
}
