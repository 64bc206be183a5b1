//! The annotation generator: detect, rank, ask the model, snap, validate.

use std::sync::Arc;

use async_trait::async_trait;
use groundmark_core::annotation::{issues_to_error, validate_annotation, Annotation, DetailLevel};
use groundmark_core::dedup::{rank_hints, Hint};
use groundmark_core::grounding::snap_to_hints;
use serde_json::Value;

use crate::config::{AnnotatorConfig, DetectorConfig, LlmConfig};
use crate::detector::{ClassicalDetector, Detector, FallbackDetector, HttpDetector};
use crate::error::{AnnotatorError, AnnotatorResult};
use crate::imaging::{crop_png, data_url, decode, ImageInput};
use crate::llm::{ChatModel, ChatRequest, ContentPart, OpenAiClient};
use crate::prompt::{build_prompt, crop_marker};

// ---------------------------------------------------------------------------
// Annotator trait
// ---------------------------------------------------------------------------

/// Produces annotations for single images.
///
/// The batch engine calls [`preprocess`](Annotator::preprocess) and
/// [`annotate_with_hints`](Annotator::annotate_with_hints) separately so it
/// can report progress between them.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Detail level used when a request does not name one.
    fn detail_level(&self) -> DetailLevel;

    /// Detect candidates and rank them into numbered hints.
    ///
    /// `max_elements` overrides the configured hint limit (`0` = unlimited).
    async fn preprocess(
        &self,
        image: &ImageInput,
        max_elements: Option<usize>,
    ) -> AnnotatorResult<Vec<Hint>>;

    /// Ground elements against `hints`. Empty `hints` yield an empty
    /// annotation without contacting the model.
    async fn annotate_with_hints(
        &self,
        image: &ImageInput,
        hints: &[Hint],
        level: DetailLevel,
    ) -> AnnotatorResult<Annotation>;

    async fn annotate(&self, image: &ImageInput, level: DetailLevel) -> AnnotatorResult<Annotation> {
        let hints = self.preprocess(image, None).await?;
        self.annotate_with_hints(image, &hints, level).await
    }
}

// ---------------------------------------------------------------------------
// GroundingAnnotator
// ---------------------------------------------------------------------------

pub struct GroundingAnnotator {
    detector: Arc<dyn Detector>,
    model: Arc<dyn ChatModel>,
    config: AnnotatorConfig,
    max_tokens: u32,
}

impl GroundingAnnotator {
    pub fn new(
        detector: Arc<dyn Detector>,
        model: Arc<dyn ChatModel>,
        config: AnnotatorConfig,
        max_tokens: u32,
    ) -> Self {
        Self {
            detector,
            model,
            config,
            max_tokens,
        }
    }

    /// Wire up the HTTP detector (when configured) in front of the classical
    /// fallback, and the OpenAI-compatible client.
    pub fn from_config(
        detector: &DetectorConfig,
        llm: LlmConfig,
        config: AnnotatorConfig,
    ) -> AnnotatorResult<Self> {
        let primary = HttpDetector::from_config(detector)?.map(|d| Arc::new(d) as Arc<dyn Detector>);
        if primary.is_none() {
            tracing::info!("DETECTOR_URL not set, using the classical detector only");
        }
        let detector = FallbackDetector::new(primary, Arc::new(ClassicalDetector::default()));
        let max_tokens = llm.max_completion_tokens;
        let model = OpenAiClient::new(llm)?;
        Ok(Self::new(Arc::new(detector), Arc::new(model), config, max_tokens))
    }

    /// Token budgets for the first attempt and the single retry.
    fn token_budgets(&self) -> [u32; 2] {
        [self.max_tokens, self.max_tokens.saturating_mul(2).clamp(2048, 8192)]
    }

    /// PNG close-ups of the most confident hints, in confidence order.
    async fn crops(&self, image: &ImageInput, hints: &[Hint]) -> Vec<(i64, Vec<u8>)> {
        if self.config.max_crops == 0 {
            return Vec::new();
        }
        let mut chosen: Vec<Hint> = hints.to_vec();
        chosen.sort_by(|a, b| {
            b.confidence
                .unwrap_or(0.0)
                .total_cmp(&a.confidence.unwrap_or(0.0))
                .then(a.id.cmp(&b.id))
        });
        chosen.truncate(self.config.max_crops);

        let bytes = Arc::clone(&image.bytes);
        let long_side = self.config.crop_long_side;
        let result = tokio::task::spawn_blocking(move || -> AnnotatorResult<Vec<(i64, Vec<u8>)>> {
            let img = decode(&bytes)?;
            let mut out = Vec::with_capacity(chosen.len());
            for hint in &chosen {
                if let Some(png) = crop_png(&img, &hint.bbox, long_side)? {
                    out.push((hint.id, png));
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| AnnotatorError::Task(e.to_string()))
        .and_then(|r| r);

        match result {
            Ok(crops) => crops,
            Err(e) => {
                tracing::warn!(filename = %image.filename, error = %e, "Cropping failed, sending full image only");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Annotator for GroundingAnnotator {
    fn detail_level(&self) -> DetailLevel {
        self.config.detail_level
    }

    async fn preprocess(
        &self,
        image: &ImageInput,
        max_elements: Option<usize>,
    ) -> AnnotatorResult<Vec<Hint>> {
        let candidates = self.detector.detect(image).await?;
        let limit = max_elements.unwrap_or(self.config.max_elements);
        let hints = rank_hints(&candidates, limit, self.config.dedup_iou);
        tracing::debug!(
            filename = %image.filename,
            candidates = candidates.len(),
            hints = hints.len(),
            "Preprocessed image"
        );
        Ok(hints)
    }

    async fn annotate_with_hints(
        &self,
        image: &ImageInput,
        hints: &[Hint],
        level: DetailLevel,
    ) -> AnnotatorResult<Annotation> {
        if hints.is_empty() {
            return Ok(Annotation::empty(image.size));
        }

        let crops = self.crops(image, hints).await;
        let prompt = build_prompt(
            image.size,
            hints,
            self.config.max_instructions,
            level,
            !crops.is_empty(),
        );

        let mut parts = vec![ContentPart::text(prompt), ContentPart::image(image.data_url())];
        for (id, png) in &crops {
            parts.push(ContentPart::text(crop_marker(*id)));
            parts.push(ContentPart::image(data_url("image/png", png)));
        }
        let mut request = ChatRequest { parts, max_tokens: 0 };

        for (attempt, budget) in self.token_budgets().into_iter().enumerate() {
            request.max_tokens = budget;
            let completion = self.model.complete(&request).await?;
            let can_retry = attempt == 0 && completion.truncated();
            let content = completion.content.as_deref().map(str::trim).unwrap_or_default();

            let parsed = match serde_json::from_str::<Value>(content) {
                Ok(v) => v,
                Err(_) if can_retry => {
                    tracing::warn!(
                        filename = %image.filename,
                        budget,
                        "Completion truncated without usable JSON, retrying with a larger budget"
                    );
                    continue;
                }
                Err(e) => {
                    return Err(AnnotatorError::Malformed(format!("model output is not JSON: {e}")));
                }
            };

            let annotation = snap_to_hints(&parsed, hints, image.size, level);
            validate_annotation(&annotation, self.config.dedup_iou)
                .map_err(|issues| AnnotatorError::Malformed(issues_to_error(&issues).to_string()))?;

            tracing::info!(
                filename = %image.filename,
                elements = annotation.elements.len(),
                attempt = attempt + 1,
                "Annotation generated"
            );
            return Ok(annotation);
        }

        Err(AnnotatorError::Exhausted)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
