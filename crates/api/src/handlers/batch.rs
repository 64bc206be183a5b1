//! Batch annotation jobs: start, status, cancel and the progress stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::{Stream, StreamExt};
use groundmark_core::annotation::DetailLevel;
use groundmark_core::error::CoreError;
use groundmark_core::paths::{is_image_file, normalize_rel_path};
use groundmark_db::repositories::ImageRepo;
use groundmark_events::JobEvent;
use serde_json::json;
use uuid::Uuid;

use crate::engine::{BatchJob, ItemContext};
use crate::error::AppResult;
use crate::handlers::images::index_images_dir;
use crate::query::BatchRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Normalize explicit targets, rejecting non-images and dropping repeats
/// while keeping first-seen order.
fn explicit_targets(filenames: &[String]) -> AppResult<Vec<String>> {
    let mut targets: Vec<String> = Vec::with_capacity(filenames.len());
    for raw in filenames {
        let rel = normalize_rel_path(raw)?;
        if !is_image_file(&rel) {
            return Err(CoreError::Validation(format!("'{rel}' is not an image file")).into());
        }
        if !targets.contains(&rel) {
            targets.push(rel);
        }
    }
    Ok(targets)
}

/// Every indexed image, indexing the images directory first when the table
/// is empty.
async fn all_targets(state: &AppState) -> AppResult<Vec<String>> {
    if ImageRepo::count(&state.pool).await? == 0 {
        index_images_dir(state).await?;
    }
    Ok(ImageRepo::list_paths(&state.pool).await?)
}

/// Worker count for a job: the requested value bounded to
/// `1..=configured`, or the configured maximum when none was asked for.
fn worker_count(requested: Option<usize>, configured: usize) -> usize {
    let cap = configured.max(1);
    requested.unwrap_or(cap).clamp(1, cap)
}

async fn find_job(state: &AppState, raw_id: &str) -> AppResult<Arc<BatchJob>> {
    let not_found = || CoreError::not_found("Batch job", raw_id);
    let id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
    state.jobs.get(id).await.ok_or_else(|| not_found().into())
}

/// POST /api/v1/batch
///
/// Starts a job over `filenames` (or every indexed image) and returns
/// `202 {job_id, total}` immediately.
pub async fn start_batch(
    State(state): State<AppState>,
    body: Option<Json<BatchRequest>>,
) -> AppResult<impl IntoResponse> {
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let targets = match &req.filenames {
        Some(filenames) => explicit_targets(filenames)?,
        None => all_targets(&state).await?,
    };
    let level = DetailLevel::parse_or(req.detail_level.as_deref(), state.annotator.detail_level());
    let max_workers = worker_count(req.max_workers, state.config.batch_max_workers);

    let job = state
        .jobs
        .start(
            ItemContext::from_state(&state),
            targets,
            req.force,
            level,
            max_workers,
        )
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "job_id": job.id,
            "total": job.total(),
        })),
    ))
}

/// GET /api/v1/batch/{job_id}
pub async fn get_batch(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, &job_id).await?;
    Ok(Json(DataResponse { data: job.status() }))
}

/// POST /api/v1/batch/{job_id}/cancel
///
/// Items already running finish; the remaining ones resolve to `skipped`.
pub async fn cancel_batch(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, &job_id).await?;
    state.jobs.cancel(job.id).await;
    Ok(Json(DataResponse { data: job.status() }))
}

/// Map job events to SSE frames, closing with an `end` event after the
/// terminal `complete`.
fn event_frames(
    events: impl Stream<Item = JobEvent> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    events.flat_map(|event| {
        let mut frames = Vec::with_capacity(2);
        match Event::default().json_data(&event) {
            Ok(frame) => frames.push(Ok(frame)),
            Err(e) => tracing::error!(kind = event.kind(), error = %e, "Failed to encode job event"),
        }
        if event.is_terminal() {
            frames.push(Ok(Event::default().event("end")));
        }
        futures::stream::iter(frames)
    })
}

/// GET /api/v1/batch/{job_id}/stream
///
/// Server-sent events: an `init` snapshot, every later event, then `end`.
/// Observers may attach at any time, including after completion.
pub async fn stream_batch(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, &job_id).await?;
    tracing::debug!(job_id = %job.id, "Batch stream observer attached");

    let frames = event_frames(job.log.subscribe().into_stream());
    Ok(Sse::new(frames).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}
