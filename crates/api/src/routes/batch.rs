//! Route definitions for batch annotation jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::batch;
use crate::state::AppState;

/// Batch routes mounted at `/batch`.
///
/// ```text
/// POST   /                    -> start_batch
/// GET    /{job_id}            -> get_batch
/// POST   /{job_id}/cancel     -> cancel_batch
/// GET    /{job_id}/stream     -> stream_batch (SSE)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(batch::start_batch))
        .route("/{job_id}", get(batch::get_batch))
        .route("/{job_id}/cancel", post(batch::cancel_batch))
        .route("/{job_id}/stream", get(batch::stream_batch))
}
