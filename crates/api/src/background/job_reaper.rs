//! Periodic disposal of completed batch jobs.
//!
//! Completed jobs stay queryable (status and SSE replay) until their
//! retention period has elapsed; this loop then drops them from the
//! [`JobManager`].

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::JobManager;

/// How often the reaper runs.
pub const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the reaper loop until `cancel` is triggered.
pub async fn run(jobs: Arc<JobManager>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Job reaper started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job reaper stopping");
                break;
            }
            _ = ticker.tick() => {
                let removed = jobs.reap().await;
                if removed > 0 {
                    tracing::info!(removed, "Job reaper: disposed of expired jobs");
                } else {
                    tracing::debug!("Job reaper: nothing to dispose of");
                }
            }
        }
    }
}
