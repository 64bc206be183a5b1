//! Handlers for reading and editing stored annotation documents.
//!
//! All annotation routes share one wildcard (`/annotations/{*path}`), so
//! sub-resources are recognized by suffix: `.../paste` for paste and
//! `.../elements/{index}` for element deletion.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use groundmark_core::annotation::{check_annotation, remove_element, Annotation};
use groundmark_core::error::CoreError;
use groundmark_core::paths::normalize_rel_path;
use groundmark_db::repositories::ImageRepo;
use serde_json::Value;

use crate::engine::processor::load_image;
use crate::error::{AppError, AppResult};
use crate::query::PasteRequest;
use crate::state::AppState;

const PASTE_SUFFIX: &str = "/paste";
const ELEMENTS_SEGMENT: &str = "/elements/";

async fn load_existing(state: &AppState, rel: &str) -> AppResult<Annotation> {
    state
        .annotations
        .load(rel)
        .await?
        .ok_or_else(|| CoreError::not_found("Annotation", rel).into())
}

/// Validate `doc` against the stored image and replace its annotation.
///
/// `img_size` must equal the image's real pixel size, so coordinates are
/// always checked against the actual screenshot.
async fn store_document(state: &AppState, rel: &str, doc: &Value) -> AppResult<Annotation> {
    let image = load_image(&state.images, rel).await?;
    let annotation = check_annotation(doc, state.config.dedup_iou)?;
    if annotation.img_size != image.size {
        let (claimed, actual) = (annotation.img_size, image.size);
        return Err(CoreError::Validation(format!(
            "img_size [{}, {}] does not match image size [{}, {}]",
            claimed.width, claimed.height, actual.width, actual.height
        ))
        .into());
    }

    state.annotations.save(rel, &annotation).await?;
    ImageRepo::set_has_annotation(&state.pool, rel, true).await?;
    Ok(annotation)
}

/// GET /api/v1/annotations/{*path}
pub async fn get_annotation(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<impl IntoResponse> {
    let rel = normalize_rel_path(&raw)?;
    let annotation = load_existing(&state, &rel).await?;
    Ok(Json(annotation))
}

/// PUT /api/v1/annotations/{*path}
///
/// Replaces the document after full validation. Invalid documents are
/// rejected with every issue listed and nothing is written.
pub async fn put_annotation(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Json(doc): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let rel = normalize_rel_path(&raw)?;
    let annotation = store_document(&state, &rel, &doc).await?;

    tracing::info!(path = %rel, elements = annotation.elements.len(), "Annotation saved");

    Ok(Json(annotation))
}

/// POST /api/v1/annotations/{*path}/paste
///
/// Same as PUT, with the document wrapped as `{"annotation": ...}`.
pub async fn paste_annotation(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Json(input): Json<PasteRequest>,
) -> AppResult<impl IntoResponse> {
    let Some(target) = raw.strip_suffix(PASTE_SUFFIX) else {
        return Err(CoreError::not_found("Route", format!("/annotations/{raw}")).into());
    };
    let rel = normalize_rel_path(target)?;
    let annotation = store_document(&state, &rel, &input.annotation).await?;

    tracing::info!(path = %rel, elements = annotation.elements.len(), "Annotation pasted");

    Ok(Json(annotation))
}

/// Split `"{image}/elements/{index}"` into its parts.
fn split_element_path(raw: &str) -> AppResult<(&str, usize)> {
    let Some((image, index)) = raw.rsplit_once(ELEMENTS_SEGMENT) else {
        return Err(CoreError::not_found("Route", format!("/annotations/{raw}")).into());
    };
    let index = index
        .parse::<usize>()
        .map_err(|_| AppError::BadRequest(format!("Invalid element index '{index}'")))?;
    Ok((image, index))
}

/// DELETE /api/v1/annotations/{*path}/elements/{index}
///
/// Removes one element and returns the updated document.
pub async fn delete_element(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (image, index) = split_element_path(&raw)?;
    let rel = normalize_rel_path(image)?;

    let mut annotation = load_existing(&state, &rel).await?;
    let removed = remove_element(&mut annotation, index)?;
    state.annotations.save(&rel, &annotation).await?;

    tracing::info!(
        path = %rel,
        index,
        instruction = %removed.instruction,
        remaining = annotation.elements.len(),
        "Annotation element deleted"
    );

    Ok(Json(annotation))
}
