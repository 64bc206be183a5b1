//! Handlers for image listing, upload, file serving and deletion.

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use groundmark_core::error::CoreError;
use groundmark_core::paths::{is_image_file, normalize_rel_path, sanitize_rel_path};
use groundmark_db::models::image::UpsertImage;
use groundmark_db::repositories::image_repo::clamp_page_size;
use groundmark_db::repositories::ImageRepo;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{AppError, AppResult};
use crate::query::PageParams;
use crate::response::{DataResponse, ImagePage};
use crate::state::AppState;

/// Prefix under `/images/` that serves raw image bytes.
const FILE_PREFIX: &str = "file/";

/// Index every image file under the images directory into the `images`
/// table. Returns the number of files indexed.
pub(crate) async fn index_images_dir(state: &AppState) -> AppResult<usize> {
    let found = state.images.scan().await?;
    for stored in &found {
        let has_annotation = state.annotations.exists(&stored.path).await;
        ImageRepo::upsert(
            &state.pool,
            &UpsertImage {
                path: stored.path.clone(),
                size_bytes: Some(stored.size_bytes),
                has_annotation,
            },
        )
        .await?;
    }
    tracing::info!(count = found.len(), root = %state.images.root().display(), "Indexed images directory");
    Ok(found.len())
}

/// GET /api/v1/images?page=&page_size=
///
/// Paginated image list ordered by path. The first call against an empty
/// table indexes the images directory.
pub async fn list_images(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::BadRequest("page must be at least 1".into()));
    }
    let page_size = clamp_page_size(params.page_size);

    let mut total = ImageRepo::count(&state.pool).await?;
    if total == 0 {
        index_images_dir(&state).await?;
        total = ImageRepo::count(&state.pool).await?;
    }

    let images = ImageRepo::list_page(&state.pool, page, page_size).await?;
    Ok(Json(ImagePage {
        images,
        total,
        page,
        page_size,
    }))
}

/// POST /api/v1/images (multipart: `file`, optional `relative_path`)
///
/// Stores the upload under its sanitized relative path and upserts its row.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut relative_path: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("relative_path") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid relative_path: {e}")))?;
                relative_path = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".into()))?;
    let raw = relative_path
        .or(file_name)
        .ok_or_else(|| AppError::BadRequest("Upload has no filename".into()))?;
    let rel = sanitize_rel_path(&raw)?;
    if !is_image_file(&rel) {
        return Err(CoreError::Validation(format!("'{rel}' is not a supported image type")).into());
    }

    state.images.write(&rel, &bytes).await?;
    let has_annotation = state.annotations.exists(&rel).await;
    let image = ImageRepo::upsert(
        &state.pool,
        &UpsertImage {
            path: rel.clone(),
            size_bytes: Some(bytes.len() as i64),
            has_annotation,
        },
    )
    .await?;

    tracing::info!(path = %rel, size_bytes = bytes.len(), "Image uploaded");

    Ok((StatusCode::CREATED, Json(DataResponse { data: image })))
}

/// GET /api/v1/images/file/{*path}
///
/// Serves the image bytes (with range and conditional request support).
pub async fn get_image(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    request: Request,
) -> AppResult<impl IntoResponse> {
    let Some(rest) = raw.strip_prefix(FILE_PREFIX) else {
        return Err(CoreError::not_found("Route", format!("/images/{raw}")).into());
    };
    let rel = normalize_rel_path(rest)?;
    if !state.images.exists(&rel).await {
        return Err(CoreError::not_found("Image", rel).into());
    }

    let response = ServeFile::new(state.images.file_path(&rel))
        .oneshot(request)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to serve {rel}: {e}")))?;
    Ok(response)
}

/// DELETE /api/v1/images/{*path}
///
/// Deletes the image file, its annotation and its row.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<impl IntoResponse> {
    let rel = normalize_rel_path(&raw)?;

    let file_removed = state.images.remove(&rel).await?;
    let row_removed = ImageRepo::delete_by_path(&state.pool, &rel).await?;
    if !file_removed && !row_removed {
        return Err(CoreError::not_found("Image", rel).into());
    }
    let annotation_removed = state.annotations.delete(&rel).await?;

    tracing::info!(path = %rel, annotation_removed, "Image deleted");

    Ok(StatusCode::NO_CONTENT)
}
