//! File-backed storage rooted at a configured directory.
//!
//! Paths handed to these stores are already-normalized relative paths (see
//! `groundmark_core::paths`); the stores only join them onto their root.

pub mod annotation_store;
pub mod image_store;

pub use annotation_store::AnnotationStore;
pub use image_store::{ImageStore, StoredImage};

/// Errors raised by the file stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt annotation file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
