//! Folder tree models.

use groundmark_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `folders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Folder {
    pub id: DbId,
    pub path: String,
    pub parent_path: Option<String>,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
