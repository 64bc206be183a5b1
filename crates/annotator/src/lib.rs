//! External collaborators for annotation generation.
//!
//! - [`detector`]: element detection (remote service, classical fallback).
//! - [`llm`]: OpenAI-compatible chat-completions client.
//! - [`annotator`]: the [`Annotator`] trait and [`GroundingAnnotator`],
//!   which composes detection, ranking, the model call and snapping.

pub mod annotator;
pub mod config;
pub mod detector;
pub mod error;
pub mod imaging;
pub mod llm;
pub mod prompt;

pub use annotator::{Annotator, GroundingAnnotator};
pub use config::{AnnotatorConfig, DetectorConfig, LlmConfig};
pub use error::{AnnotatorError, AnnotatorResult};
pub use imaging::ImageInput;
