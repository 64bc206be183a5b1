//! Repository for the `folders` table.

use groundmark_core::paths::{file_name, folder_chain, parent_folder};
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::folder::Folder;
use crate::repositories::SUBTREE;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, path, parent_path, name, created_at, updated_at";

/// Provides folder tree operations.
pub struct FolderRepo;

impl FolderRepo {
    /// Insert `folder` and every missing ancestor. Existing rows are left alone.
    pub async fn ensure_chain(conn: &mut SqliteConnection, folder: &str) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now();
        for path in folder_chain(folder) {
            sqlx::query(
                "INSERT INTO folders (path, parent_path, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT (path) DO NOTHING",
            )
            .bind(&path)
            .bind(parent_folder(&path))
            .bind(file_name(&path))
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Create a folder (and its ancestors), returning its row.
    pub async fn create(pool: &SqlitePool, folder: &str) -> Result<Folder, sqlx::Error> {
        let mut tx = pool.begin().await?;
        Self::ensure_chain(&mut *tx, folder).await?;
        let query = format!("SELECT {COLUMNS} FROM folders WHERE path = ?1");
        let row = sqlx::query_as::<_, Folder>(&query)
            .bind(folder)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn find_by_path(pool: &SqlitePool, folder: &str) -> Result<Option<Folder>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM folders WHERE path = ?1");
        sqlx::query_as::<_, Folder>(&query)
            .bind(folder)
            .fetch_optional(pool)
            .await
    }

    /// List every folder, ordered by path.
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Folder>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM folders ORDER BY path");
        sqlx::query_as::<_, Folder>(&query).fetch_all(pool).await
    }

    /// Delete a folder and all of its descendants. Returns the number of rows removed.
    pub async fn delete_tree(pool: &SqlitePool, folder: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&format!("DELETE FROM folders WHERE {SUBTREE}"))
            .bind(folder)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
