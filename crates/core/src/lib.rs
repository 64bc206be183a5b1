//! groundmark domain core.
//!
//! Pure logic shared by every other crate, with no I/O:
//!
//! - [`geometry`]: boxes, points and IoU.
//! - [`validation`]: the coordinate validator for a single element.
//! - [`dedup`]: near-duplicate suppression and hint ranking.
//! - [`annotation`]: the annotation document, detail levels and
//!   document-level validation.
//! - [`grounding`]: snapping model output onto detector hints.
//! - [`paths`]: relative path normalization and naming rules.
//! - [`batch`]: batch job status types.

pub mod annotation;
pub mod batch;
pub mod dedup;
pub mod error;
pub mod geometry;
pub mod grounding;
pub mod paths;
pub mod types;
pub mod validation;
