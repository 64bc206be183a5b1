use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::folders;
use crate::state::AppState;

/// Folder routes mounted at `/folders`.
///
/// ```text
/// GET    /            -> list_folders
/// POST   /            -> create_folder
/// DELETE /{*path}     -> delete_folder
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(folders::list_folders).post(folders::create_folder))
        .route("/{*path}", delete(folders::delete_folder))
}
