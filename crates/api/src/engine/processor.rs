//! Per-image annotation work shared by the batch engine and the
//! single-image endpoint.

use std::sync::Arc;

use groundmark_annotator::{Annotator, ImageInput};
use groundmark_core::annotation::{Annotation, DetailLevel};
use groundmark_core::batch::{ItemResult, ItemStatus};
use groundmark_core::error::CoreError;
use groundmark_db::repositories::ImageRepo;
use groundmark_db::{AnnotationStore, DbPool, ImageStore};
use groundmark_events::{JobEvent, JobLog};

use crate::engine::job::BatchJob;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The slice of application state an annotation task needs.
#[derive(Clone)]
pub struct ItemContext {
    pub pool: DbPool,
    pub images: Arc<ImageStore>,
    pub annotations: Arc<AnnotationStore>,
    pub annotator: Arc<dyn Annotator>,
}

impl ItemContext {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            images: Arc::clone(&state.images),
            annotations: Arc::clone(&state.annotations),
            annotator: Arc::clone(&state.annotator),
        }
    }
}

/// Read an image from the store and decode its header.
pub async fn load_image(images: &ImageStore, rel: &str) -> AppResult<ImageInput> {
    if !images.exists(rel).await {
        return Err(CoreError::not_found("Image", rel).into());
    }
    let bytes = images.read(rel).await?;
    ImageInput::from_bytes(rel, bytes).map_err(|e| {
        AppError::from(CoreError::Validation(format!(
            "'{rel}' is not a readable image: {e}"
        )))
    })
}

fn emit(log: Option<&JobLog>, event: JobEvent) {
    if let Some(log) = log {
        log.append(event);
    }
}

/// Detect, annotate and persist one image.
///
/// Progress sub-events are appended to `log` when one is given. The
/// annotation file is replaced wholesale and the image row is flagged as
/// annotated.
pub async fn generate(
    ctx: &ItemContext,
    rel: &str,
    level: DetailLevel,
    log: Option<&JobLog>,
) -> AppResult<Annotation> {
    let image = load_image(&ctx.images, rel).await?;

    emit(log, JobEvent::PreprocessStart { filename: rel.to_string() });
    let hints = ctx.annotator.preprocess(&image, None).await?;
    emit(
        log,
        JobEvent::Preprocessed {
            filename: rel.to_string(),
            hints: hints.len(),
        },
    );

    if !hints.is_empty() {
        emit(log, JobEvent::RequestSent { filename: rel.to_string() });
    }
    let annotation = ctx.annotator.annotate_with_hints(&image, &hints, level).await?;

    ctx.annotations.save(rel, &annotation).await?;
    ImageRepo::set_has_annotation(&ctx.pool, rel, true).await?;

    tracing::debug!(
        filename = %rel,
        hints = hints.len(),
        elements = annotation.elements.len(),
        "Annotation saved"
    );
    Ok(annotation)
}

/// Run one batch item to its terminal status. Never fails.
pub async fn process_item(ctx: ItemContext, job: Arc<BatchJob>, filename: String) -> ItemResult {
    if !job.force && ctx.annotations.exists(&filename).await {
        return ItemResult {
            filename,
            status: ItemStatus::Skipped,
            error: None,
        };
    }

    match generate(&ctx, &filename, job.detail_level, Some(&job.log)).await {
        Ok(_) => ItemResult {
            filename,
            status: ItemStatus::Success,
            error: None,
        },
        Err(e) => {
            tracing::warn!(job_id = %job.id, filename = %filename, error = %e, "Batch item failed");
            ItemResult {
                filename,
                status: ItemStatus::Error,
                error: Some(e.to_string()),
            }
        }
    }
}
