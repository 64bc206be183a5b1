//! Registry of batch jobs and the worker pool that drives each one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use groundmark_core::annotation::DetailLevel;
use groundmark_core::batch::{ItemResult, ItemStatus, JobState};
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::engine::job::BatchJob;
use crate::engine::processor::{process_item, ItemContext};

/// Tracks every live batch job by id.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct JobManager {
    jobs: RwLock<HashMap<Uuid, Arc<BatchJob>>>,
    tasks: TaskTracker,
    retention: chrono::Duration,
}

impl JobManager {
    /// Create an empty manager. Completed jobs are kept for `retention`.
    pub fn new(retention: chrono::Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            tasks: TaskTracker::new(),
            retention,
        }
    }

    /// Register a job and start processing it in the background.
    ///
    /// Returns as soon as the job is registered; at most `max_workers`
    /// items run concurrently.
    pub async fn start(
        &self,
        ctx: ItemContext,
        targets: Vec<String>,
        force: bool,
        detail_level: DetailLevel,
        max_workers: usize,
    ) -> Arc<BatchJob> {
        let job = BatchJob::new(targets, force, detail_level);
        self.jobs.write().await.insert(job.id, Arc::clone(&job));

        tracing::info!(
            job_id = %job.id,
            total = job.total(),
            max_workers,
            force,
            detail_level = %detail_level,
            "Batch job started"
        );
        self.tasks.spawn(run(Arc::clone(&job), ctx, max_workers.max(1)));
        job
    }

    pub async fn get(&self, job_id: Uuid) -> Option<Arc<BatchJob>> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Raise the job's cancellation signal. Items already running finish;
    /// the rest resolve to `skipped`.
    pub async fn cancel(&self, job_id: Uuid) -> Option<Arc<BatchJob>> {
        let job = self.get(job_id).await?;
        if !job.cancel.is_cancelled() {
            job.cancel.cancel();
            tracing::info!(job_id = %job_id, "Batch job cancellation requested");
        }
        Some(job)
    }

    /// Cancel every job that has not completed yet.
    pub async fn cancel_all(&self) {
        for job in self.jobs.read().await.values() {
            if job.state() != JobState::Completed {
                job.cancel.cancel();
            }
        }
    }

    /// Cancel every job and wait for their in-flight items to finish.
    ///
    /// No new jobs are tracked afterwards. Returns `false` if `timeout`
    /// elapsed first.
    pub async fn shutdown(&self, timeout: std::time::Duration) -> bool {
        self.cancel_all().await;
        self.tasks.close();
        tokio::time::timeout(timeout, self.tasks.wait()).await.is_ok()
    }

    /// Drop completed jobs whose retention period has elapsed. Returns how
    /// many were removed.
    pub async fn reap(&self) -> usize {
        let cutoff = Utc::now() - self.retention;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.completed_at().map_or(true, |at| at > cutoff));
        before - jobs.len()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Drive `job` to completion.
///
/// Targets are pulled in order. Each item runs in its own task so a panic
/// is contained and recorded as an `error` result.
async fn run(job: Arc<BatchJob>, ctx: ItemContext, max_workers: usize) {
    job.start();

    futures::stream::iter(job.targets.clone())
        .for_each_concurrent(max_workers, |filename| {
            let job = Arc::clone(&job);
            let ctx = ctx.clone();
            async move {
                let result = if job.cancel.is_cancelled() {
                    ItemResult {
                        filename,
                        status: ItemStatus::Skipped,
                        error: None,
                    }
                } else {
                    let task = tokio::spawn(process_item(ctx, Arc::clone(&job), filename.clone()));
                    match task.await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::error!(job_id = %job.id, filename = %filename, error = %e, "Batch item task failed");
                            ItemResult {
                                filename,
                                status: ItemStatus::Error,
                                error: Some(format!("Task failed: {e}")),
                            }
                        }
                    }
                };
                job.record(result);
            }
        })
        .await;
}
