//! Route definitions for images.

use axum::routing::get;
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Image routes mounted at `/images`.
///
/// ```text
/// GET    /                  -> list_images
/// POST   /                  -> upload_image
/// GET    /file/{*path}      -> get_image
/// DELETE /{*path}           -> delete_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(images::list_images).post(images::upload_image))
        .route("/{*path}", get(images::get_image).delete(images::delete_image))
}
