//! Errors raised by the external collaborators.

/// Failure of a detector or language-model call.
///
/// These are always reported as data (a per-item `error` status, or a 502
/// for single requests); they never abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream service returned a non-2xx status code.
    #[error("{service} returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The image could not be decoded.
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// The upstream response did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The model ran out of tokens on every attempt.
    #[error("Annotation failed after retries")]
    Exhausted,

    /// A required collaborator is not configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Blocking work panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

pub type AnnotatorResult<T> = Result<T, AnnotatorError>;
