//! Element detectors producing raw [`Candidate`] boxes for an image.
//!
//! - [`HttpDetector`] calls a remote detection service.
//! - [`ClassicalDetector`] runs a gradient/connected-components pass locally.
//! - [`FallbackDetector`] tries the first and substitutes the second when it
//!   fails, is unconfigured, or finds nothing.

mod classical;
mod fallback;
mod http;

pub use classical::ClassicalDetector;
pub use fallback::FallbackDetector;
pub use http::HttpDetector;

use async_trait::async_trait;
use groundmark_core::dedup::Candidate;

use crate::error::AnnotatorResult;
use crate::imaging::ImageInput;

#[async_trait]
pub trait Detector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Detect candidate GUI elements. Order is not significant.
    async fn detect(&self, image: &ImageInput) -> AnnotatorResult<Vec<Candidate>>;
}
