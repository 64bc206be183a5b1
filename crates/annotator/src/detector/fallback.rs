use std::sync::Arc;

use async_trait::async_trait;
use groundmark_core::dedup::Candidate;

use super::Detector;
use crate::error::AnnotatorResult;
use crate::imaging::ImageInput;

/// Uses `primary` when present and productive, otherwise `fallback`.
pub struct FallbackDetector {
    primary: Option<Arc<dyn Detector>>,
    fallback: Arc<dyn Detector>,
}

impl FallbackDetector {
    pub fn new(primary: Option<Arc<dyn Detector>>, fallback: Arc<dyn Detector>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Detector for FallbackDetector {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn detect(&self, image: &ImageInput) -> AnnotatorResult<Vec<Candidate>> {
        if let Some(primary) = &self.primary {
            match primary.detect(image).await {
                Ok(found) if !found.is_empty() => return Ok(found),
                Ok(_) => tracing::warn!(
                    filename = %image.filename,
                    detector = primary.name(),
                    "Detector returned no elements, using {}",
                    self.fallback.name()
                ),
                Err(e) => tracing::warn!(
                    filename = %image.filename,
                    detector = primary.name(),
                    error = %e,
                    "Detector failed, using {}",
                    self.fallback.name()
                ),
            }
        }
        self.fallback.detect(image).await
    }
}
