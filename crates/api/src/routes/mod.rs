pub mod annotate;
pub mod annotations;
pub mod batch;
pub mod folders;
pub mod health;
pub mod images;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /images                                  list (?page, page_size), upload (multipart)
/// /images/file/{*path}                     image bytes (GET, range)
/// /images/{*path}                          delete (DELETE)
///
/// /folders                                 list, create
/// /folders/{*path}                         delete tree (DELETE)
///
/// /annotations/{*path}                     get, replace (GET, PUT)
/// /annotations/{*path}/paste               replace from clipboard (POST)
/// /annotations/{*path}/elements/{index}    remove element (DELETE)
///
/// /annotate/{*path}                        annotate one image (POST)
/// /preprocess/{*path}                      detector preview (POST)
///
/// /batch                                   start job (POST)
/// /batch/{job_id}                          job status (GET)
/// /batch/{job_id}/cancel                   cancel job (POST)
/// /batch/{job_id}/stream                   progress events (GET, SSE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/images", images::router())
        .nest("/folders", folders::router())
        .nest("/annotations", annotations::router())
        .nest("/annotate", annotate::annotate_router())
        .nest("/preprocess", annotate::preprocess_router())
        .nest("/batch", batch::router())
}
