//! A single batch job: its targets, results, state and event log.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use groundmark_core::annotation::DetailLevel;
use groundmark_core::batch::{BatchSummary, ItemResult, JobState};
use groundmark_core::types::Timestamp;
use groundmark_events::{JobEvent, JobLog};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct Progress {
    state: JobState,
    results: Vec<ItemResult>,
    completed_at: Option<Timestamp>,
}

pub struct BatchJob {
    pub id: Uuid,
    pub targets: Vec<String>,
    pub force: bool,
    pub detail_level: DetailLevel,
    pub created_at: Timestamp,
    pub log: Arc<JobLog>,
    pub cancel: CancellationToken,
    progress: Mutex<Progress>,
}

/// Point-in-time view returned by `GET /batch/{job_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub job_id: Uuid,
    pub state: JobState,
    pub total: usize,
    pub completed: usize,
    pub success: usize,
    pub skipped: usize,
    pub error: usize,
    pub results: Vec<ItemResult>,
    pub force: bool,
    pub cancelled: bool,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl BatchJob {
    pub fn new(targets: Vec<String>, force: bool, detail_level: DetailLevel) -> Arc<Self> {
        let total = targets.len();
        Arc::new(Self {
            id: Uuid::new_v4(),
            targets,
            force,
            detail_level,
            created_at: Utc::now(),
            log: JobLog::new(total),
            cancel: CancellationToken::new(),
            progress: Mutex::new(Progress {
                state: JobState::Created,
                results: Vec::with_capacity(total),
                completed_at: None,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn total(&self) -> usize {
        self.targets.len()
    }

    /// Move to `running`; a job with no targets completes immediately.
    pub fn start(&self) {
        let mut progress = self.lock();
        if progress.state != JobState::Created {
            return;
        }
        progress.state = JobState::Running;
        self.finish_if_done(&mut progress);
    }

    /// Record one item's terminal result.
    ///
    /// The result list, the `completed` counter and the event log are
    /// updated under one lock, so `image_done.completed` strictly increases
    /// and `complete` is appended exactly once, after the last item.
    pub fn record(&self, result: ItemResult) {
        let mut progress = self.lock();
        if progress.state == JobState::Completed {
            tracing::warn!(job_id = %self.id, filename = %result.filename, "Result after completion ignored");
            return;
        }
        progress.results.push(result.clone());
        let completed = progress.results.len();

        self.log.append(JobEvent::image_done(
            result.filename,
            result.status,
            completed,
            self.total(),
            result.error,
        ));
        self.finish_if_done(&mut progress);
    }

    fn finish_if_done(&self, progress: &mut Progress) {
        if progress.results.len() < self.total() {
            return;
        }
        progress.state = JobState::Completed;
        progress.completed_at = Some(Utc::now());
        let summary = self.log.summary();
        self.log.append(JobEvent::Complete { summary });
        tracing::info!(
            job_id = %self.id,
            total = summary.total,
            success = summary.success,
            skipped = summary.skipped,
            error = summary.error,
            "Batch job completed"
        );
    }

    pub fn state(&self) -> JobState {
        self.lock().state
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.lock().completed_at
    }

    pub fn summary(&self) -> BatchSummary {
        self.log.summary()
    }

    pub fn status(&self) -> JobStatus {
        let progress = self.lock();
        let summary = self.log.summary();
        JobStatus {
            job_id: self.id,
            state: progress.state,
            total: self.total(),
            completed: progress.results.len(),
            success: summary.success,
            skipped: summary.skipped,
            error: summary.error,
            results: progress.results.clone(),
            force: self.force,
            cancelled: self.cancel.is_cancelled(),
            created_at: self.created_at,
            completed_at: progress.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundmark_core::batch::ItemStatus;

    fn item(name: &str, status: ItemStatus) -> ItemResult {
        ItemResult {
            filename: name.into(),
            status,
            error: None,
        }
    }

    #[test]
    fn empty_job_completes_on_start() {
        let job = BatchJob::new(Vec::new(), false, DetailLevel::High);
        job.start();
        assert_eq!(job.state(), JobState::Completed);
        let events = job.log.snapshot();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
    }

    #[test]
    fn completes_after_last_result() {
        let job = BatchJob::new(vec!["a.png".into(), "b.png".into()], false, DetailLevel::High);
        job.start();
        job.record(item("a.png", ItemStatus::Success));
        assert_eq!(job.state(), JobState::Running);
        job.record(item("b.png", ItemStatus::Skipped));

        let status = job.status();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!((status.completed, status.success, status.skipped), (2, 1, 1));
        assert!(status.completed_at.is_some());

        let kinds: Vec<&str> = job.log.snapshot().iter().map(JobEvent::kind).collect();
        assert_eq!(kinds, vec!["image_done", "image_done", "complete"]);
    }

    #[test]
    fn late_results_are_ignored() {
        let job = BatchJob::new(vec!["a.png".into()], false, DetailLevel::High);
        job.start();
        job.record(item("a.png", ItemStatus::Error));
        job.record(item("a.png", ItemStatus::Success));
        assert_eq!(job.status().results.len(), 1);
        assert_eq!(job.summary().error, 1);
    }
}
