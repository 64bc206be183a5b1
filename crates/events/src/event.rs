//! Progress events emitted by batch annotation jobs.
//!
//! Events serialize with an internal `type` tag, e.g.
//! `{"type": "image_done", "filename": "a.png", "status": "success", ...}`.

use groundmark_core::batch::{BatchSummary, ItemStatus};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// Snapshot of the job's counters at the moment an observer attached.
    Init {
        total: usize,
        completed: usize,
        success: usize,
        skipped: usize,
        error: usize,
    },

    /// Detection started for an item.
    PreprocessStart { filename: String },

    /// Detection finished; `hints` candidates will be offered to the model.
    Preprocessed { filename: String, hints: usize },

    /// The language-model request for an item was sent.
    RequestSent { filename: String },

    /// An item reached its terminal status. `completed` counts finished items
    /// and strictly increases within a job.
    ImageDone {
        filename: String,
        status: ItemStatus,
        completed: usize,
        total: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Every item has finished. Emitted exactly once, always last.
    Complete { summary: BatchSummary },
}

impl JobEvent {
    pub fn init(summary: &BatchSummary) -> Self {
        Self::Init {
            total: summary.total,
            completed: summary.finished(),
            success: summary.success,
            skipped: summary.skipped,
            error: summary.error,
        }
    }

    pub fn image_done(
        filename: impl Into<String>,
        status: ItemStatus,
        completed: usize,
        total: usize,
        error: Option<String>,
    ) -> Self {
        Self::ImageDone {
            filename: filename.into(),
            status,
            completed,
            total,
            error,
        }
    }

    /// Whether this is the job's final event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// The tag used on the wire, also used as the SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::PreprocessStart { .. } => "preprocess_start",
            Self::Preprocessed { .. } => "preprocessed",
            Self::RequestSent { .. } => "request_sent",
            Self::ImageDone { .. } => "image_done",
            Self::Complete { .. } => "complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_done_wire_shape() {
        let ev = JobEvent::ImageDone {
            filename: "a.png".into(),
            status: ItemStatus::Error,
            completed: 2,
            total: 5,
            error: Some("timeout".into()),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({
                "type": "image_done",
                "filename": "a.png",
                "status": "error",
                "completed": 2,
                "total": 5,
                "error": "timeout"
            })
        );
    }

    #[test]
    fn complete_wire_shape() {
        let mut summary = BatchSummary::new(2);
        summary.record(ItemStatus::Success);
        summary.record(ItemStatus::Skipped);
        let ev = JobEvent::Complete { summary };
        assert!(ev.is_terminal());
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({
                "type": "complete",
                "summary": {"total": 2, "success": 1, "skipped": 1, "error": 0}
            })
        );
    }

    #[test]
    fn kind_matches_tag() {
        let ev = JobEvent::Preprocessed {
            filename: "a.png".into(),
            hints: 3,
        };
        assert_eq!(serde_json::to_value(&ev).unwrap()["type"], ev.kind());
    }
}
