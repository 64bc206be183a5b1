use std::sync::Arc;

use groundmark_annotator::Annotator;
use groundmark_db::{AnnotationStore, ImageStore};

use crate::config::ServerConfig;
use crate::engine::JobManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: groundmark_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Uploaded image files.
    pub images: Arc<ImageStore>,
    /// Annotation JSON files, one per image.
    pub annotations: Arc<AnnotationStore>,
    /// Detector + language model pipeline.
    pub annotator: Arc<dyn Annotator>,
    /// Live and recently completed batch jobs.
    pub jobs: Arc<JobManager>,
}
