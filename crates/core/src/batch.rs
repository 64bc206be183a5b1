//! Batch job status types shared by the job engine, event log and API.

use serde::{Deserialize, Serialize};

/// Lifecycle of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Created,
    Running,
    Completed,
}

/// Terminal outcome of one item in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Skipped,
    Error,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// Recorded result of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub filename: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-status tallies for a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub error: usize,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, status: ItemStatus) {
        match status {
            ItemStatus::Success => self.success += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Error => self.error += 1,
        }
    }

    /// Number of items with a terminal status.
    pub fn finished(&self) -> usize {
        self.success + self.skipped + self.error
    }

    pub fn is_complete(&self) -> bool {
        self.finished() == self.total
    }
}
