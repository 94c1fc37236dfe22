//! Run reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{FailedReference, Playlist};

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    /// One entry per item reference, in input order
    pub playlist: Playlist,
    /// Collections that contributed no items; each also has a failed entry
    /// in `playlist`
    pub collection_failures: Vec<FailedReference>,
    /// Whether the run was cancelled before every item was dispatched
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Counts for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub total: usize,
    pub resolved: usize,
    pub failed: usize,
    pub failed_references: usize,
    pub cancelled: bool,
}

impl PipelineReport {
    pub fn summary(&self) -> PipelineSummary {
        let resolved = self.playlist.resolved().count();
        PipelineSummary {
            total: self.playlist.len(),
            resolved,
            failed: self.playlist.len() - resolved,
            failed_references: self.collection_failures.len(),
            cancelled: self.cancelled,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} items resolved, {} failed",
            self.resolved, self.total, self.failed
        )?;
        if self.failed_references > 0 {
            write!(f, ", {} collections empty or unavailable", self.failed_references)?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}
