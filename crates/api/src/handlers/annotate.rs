//! Single-image annotation and detector preview.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use groundmark_core::annotation::DetailLevel;
use groundmark_core::paths::normalize_rel_path;
use serde_json::json;

use crate::engine::processor::{generate, load_image};
use crate::engine::ItemContext;
use crate::error::AppResult;
use crate::query::{AnnotateRequest, PreprocessRequest};
use crate::state::AppState;

/// POST /api/v1/annotate/{*path}
///
/// Runs the full pipeline for one image, replaces its stored annotation and
/// returns the new document. Collaborator failures surface as 502.
pub async fn annotate_image(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Option<Json<AnnotateRequest>>,
) -> AppResult<impl IntoResponse> {
    let rel = normalize_rel_path(&raw)?;
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let level = DetailLevel::parse_or(req.detail_level.as_deref(), state.annotator.detail_level());

    let ctx = ItemContext::from_state(&state);
    let annotation = generate(&ctx, &rel, level, None).await?;

    tracing::info!(
        path = %rel,
        detail_level = %level,
        elements = annotation.elements.len(),
        "Image annotated"
    );

    Ok(Json(annotation))
}

/// POST /api/v1/preprocess/{*path}
///
/// Detector-only preview: the numbered hints the model would be shown.
/// Nothing is persisted.
pub async fn preprocess_image(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Option<Json<PreprocessRequest>>,
) -> AppResult<impl IntoResponse> {
    let rel = normalize_rel_path(&raw)?;
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let image = load_image(&state.images, &rel).await?;
    let hints = state.annotator.preprocess(&image, req.max_elements).await?;

    tracing::info!(path = %rel, hints = hints.len(), "Image preprocessed");

    Ok(Json(json!({
        "img_size": image.size,
        "hints": hints,
    })))
}
