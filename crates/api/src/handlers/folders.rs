//! Handlers for the folder tree.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use groundmark_core::error::CoreError;
use groundmark_core::paths::{normalize_rel_path, sanitize_rel_path};
use groundmark_db::repositories::{FolderRepo, ImageRepo};
use serde_json::json;

use crate::error::AppResult;
use crate::query::CreateFolderRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/folders
pub async fn list_folders(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let paths: Vec<String> = FolderRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(|f| f.path)
        .collect();

    Ok(Json(DataResponse { data: paths }))
}

/// POST /api/v1/folders
///
/// Creates the (sanitized) folder and any missing ancestors.
pub async fn create_folder(
    State(state): State<AppState>,
    Json(input): Json<CreateFolderRequest>,
) -> AppResult<impl IntoResponse> {
    let path = sanitize_rel_path(&input.name)?;

    state.images.create_dir(&path).await?;
    let folder = FolderRepo::create(&state.pool, &path).await?;

    tracing::info!(path = %folder.path, "Folder created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: folder })))
}

/// DELETE /api/v1/folders/{*path}
///
/// Deletes the folder tree: image files, annotation files and rows.
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<impl IntoResponse> {
    let path = normalize_rel_path(&raw)?;

    let known = FolderRepo::find_by_path(&state.pool, &path).await?.is_some();
    let dir_removed = state.images.remove_dir(&path).await?;
    if !known && !dir_removed {
        return Err(CoreError::not_found("Folder", path).into());
    }

    let images_deleted = ImageRepo::delete_under(&state.pool, &path).await?;
    let folders_deleted = FolderRepo::delete_tree(&state.pool, &path).await?;
    state.annotations.delete_tree(&path).await?;

    tracing::info!(path = %path, images_deleted, folders_deleted, "Folder deleted");

    Ok(Json(DataResponse {
        data: json!({
            "path": path,
            "images_deleted": images_deleted,
            "folders_deleted": folders_deleted,
        }),
    }))
}
