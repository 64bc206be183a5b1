use axum::routing::post;
use axum::Router;

use crate::handlers::annotate;
use crate::state::AppState;

/// Mounted at `/annotate`.
///
/// ```text
/// POST /{*path}    -> annotate_image
/// ```
pub fn annotate_router() -> Router<AppState> {
    Router::new().route("/{*path}", post(annotate::annotate_image))
}

/// Mounted at `/preprocess`.
///
/// ```text
/// POST /{*path}    -> preprocess_image
/// ```
pub fn preprocess_router() -> Router<AppState> {
    Router::new().route("/{*path}", post(annotate::preprocess_image))
}
