//! Shared query and body parameter types for API handlers.

use serde::Deserialize;

/// Paging parameters for the image list (`?page=&page_size=`).
///
/// `page` is 1-based; `page_size` is clamped in the repository layer via
/// `clamp_page_size`.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Body of `POST /annotate/{*path}`.
#[derive(Debug, Default, Deserialize)]
pub struct AnnotateRequest {
    pub detail_level: Option<String>,
}

/// Body of `POST /preprocess/{*path}`.
#[derive(Debug, Default, Deserialize)]
pub struct PreprocessRequest {
    pub max_elements: Option<usize>,
}

/// Body of `POST /batch`.
#[derive(Debug, Default, Deserialize)]
pub struct BatchRequest {
    /// Images to process; every indexed image when absent.
    pub filenames: Option<Vec<String>>,
    #[serde(default)]
    pub force: bool,
    pub max_workers: Option<usize>,
    pub detail_level: Option<String>,
}

/// Body of `POST /folders`.
#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

/// Body of `POST /annotations/{*path}/paste`.
#[derive(Debug, Deserialize)]
pub struct PasteRequest {
    pub annotation: serde_json::Value,
}
