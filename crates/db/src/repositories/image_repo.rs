//! Repository for the `images` table.

use sqlx::SqlitePool;

use crate::models::image::{Image, ImageListItem, UpsertImage};
use crate::repositories::{FolderRepo, SUBTREE};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, path, filename, folder_path, has_annotation, size_bytes, \
    created_at, updated_at";

/// Largest page size accepted by [`ImageRepo::list_page`].
pub const MAX_PAGE_SIZE: i64 = 5000;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: i64 = 500;

/// Clamp a requested page size into `[1, MAX_PAGE_SIZE]`.
pub fn clamp_page_size(page_size: Option<i64>) -> i64 {
    page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Provides CRUD operations for image metadata.
pub struct ImageRepo;

impl ImageRepo {
    /// Insert an image row, or refresh size and annotation flag when the
    /// path already exists. Ensures the folder chain exists.
    pub async fn upsert(pool: &SqlitePool, input: &UpsertImage) -> Result<Image, sqlx::Error> {
        let now = chrono::Utc::now();
        let mut tx = pool.begin().await?;

        if let Some(folder) = input.folder_path() {
            FolderRepo::ensure_chain(&mut *tx, folder).await?;
        }

        let query = format!(
            "INSERT INTO images (path, filename, folder_path, has_annotation, size_bytes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT (path) DO UPDATE SET
                has_annotation = excluded.has_annotation,
                size_bytes = COALESCE(excluded.size_bytes, images.size_bytes),
                updated_at = excluded.updated_at
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, Image>(&query)
            .bind(&input.path)
            .bind(input.filename())
            .bind(input.folder_path())
            .bind(input.has_annotation)
            .bind(input.size_bytes)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    pub async fn find_by_path(pool: &SqlitePool, path: &str) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE path = ?1");
        sqlx::query_as::<_, Image>(&query)
            .bind(path)
            .fetch_optional(pool)
            .await
    }

    /// One page of the image list ordered by path. `page` is 1-based.
    pub async fn list_page(
        pool: &SqlitePool,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<ImageListItem>, sqlx::Error> {
        let offset = (page.max(1) - 1).saturating_mul(page_size);
        sqlx::query_as::<_, ImageListItem>(
            "SELECT path, has_annotation FROM images ORDER BY path LIMIT ?1 OFFSET ?2",
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// All image paths, ordered.
    pub async fn list_paths(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT path FROM images ORDER BY path")
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(pool)
            .await
    }

    /// Update the annotation flag. Returns `true` if a row was updated.
    pub async fn set_has_annotation(
        pool: &SqlitePool,
        path: &str,
        has_annotation: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE images SET has_annotation = ?2, updated_at = ?3 WHERE path = ?1",
        )
        .bind(path)
        .bind(has_annotation)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete one image row. Returns `true` if a row was removed.
    pub async fn delete_by_path(pool: &SqlitePool, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM images WHERE path = ?1")
            .bind(path)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every image row beneath `folder`. Returns the number removed.
    pub async fn delete_under(pool: &SqlitePool, folder: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&format!("DELETE FROM images WHERE {SUBTREE}"))
            .bind(folder)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
