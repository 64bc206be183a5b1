//! Image metadata models.

use groundmark_core::paths::{file_name, parent_folder};
use groundmark_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    pub path: String,
    pub filename: String,
    pub folder_path: Option<String>,
    pub has_annotation: bool,
    pub size_bytes: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting or refreshing an image row.
///
/// `filename` and `folder_path` are derived from `path`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertImage {
    pub path: String,
    pub size_bytes: Option<i64>,
    pub has_annotation: bool,
}

impl UpsertImage {
    pub fn filename(&self) -> &str {
        file_name(&self.path)
    }

    pub fn folder_path(&self) -> Option<&str> {
        parent_folder(&self.path)
    }
}

/// Lightweight listing entry returned by paginated queries.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageListItem {
    #[serde(rename = "filename")]
    pub path: String,
    pub has_annotation: bool,
}
