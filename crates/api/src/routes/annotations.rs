//! Route definitions for stored annotations.
//!
//! Image paths contain slashes, so every route is a single catch-all and the
//! handlers recognize `/paste` and `/elements/{index}` suffixes themselves.

use axum::routing::get;
use axum::Router;

use crate::handlers::annotations;
use crate::state::AppState;

/// Annotation routes mounted at `/annotations`.
///
/// ```text
/// GET    /{*path}                     -> get_annotation
/// PUT    /{*path}                     -> put_annotation
/// POST   /{*path}/paste               -> paste_annotation
/// DELETE /{*path}/elements/{index}    -> delete_element
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{*path}",
        get(annotations::get_annotation)
            .put(annotations::put_annotation)
            .post(annotations::paste_annotation)
            .delete(annotations::delete_element),
    )
}
