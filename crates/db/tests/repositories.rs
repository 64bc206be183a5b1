//! Integration tests for the image and folder repositories.

use groundmark_db::models::image::UpsertImage;
use groundmark_db::repositories::image_repo::clamp_page_size;
use groundmark_db::repositories::{FolderRepo, ImageRepo};
use sqlx::SqlitePool;

fn upsert(path: &str, has_annotation: bool) -> UpsertImage {
    UpsertImage {
        path: path.to_string(),
        size_bytes: Some(10),
        has_annotation,
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn upsert_derives_name_and_folder(pool: SqlitePool) {
    let img = ImageRepo::upsert(&pool, &upsert("a/b/shot.png", false)).await.unwrap();
    assert_eq!(img.filename, "shot.png");
    assert_eq!(img.folder_path.as_deref(), Some("a/b"));
    assert!(!img.has_annotation);

    let folders: Vec<String> = FolderRepo::list(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(folders, vec!["a", "a/b"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn upsert_is_idempotent_on_path(pool: SqlitePool) {
    let first = ImageRepo::upsert(&pool, &upsert("x.png", false)).await.unwrap();
    let second = ImageRepo::upsert(&pool, &upsert("x.png", true)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert!(second.has_annotation);
    assert_eq!(ImageRepo::count(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn list_page_is_ordered_and_paginated(pool: SqlitePool) {
    for name in ["c.png", "a.png", "b.png"] {
        ImageRepo::upsert(&pool, &upsert(name, false)).await.unwrap();
    }
    let page1 = ImageRepo::list_page(&pool, 1, 2).await.unwrap();
    let page2 = ImageRepo::list_page(&pool, 2, 2).await.unwrap();
    let names: Vec<_> = page1.iter().chain(page2.iter()).map(|i| i.path.as_str()).collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    assert_eq!(page2.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn annotation_flag_and_delete(pool: SqlitePool) {
    ImageRepo::upsert(&pool, &upsert("a.png", false)).await.unwrap();
    assert!(ImageRepo::set_has_annotation(&pool, "a.png", true).await.unwrap());
    assert!(!ImageRepo::set_has_annotation(&pool, "missing.png", true).await.unwrap());

    let img = ImageRepo::find_by_path(&pool, "a.png").await.unwrap().unwrap();
    assert!(img.has_annotation);

    assert!(ImageRepo::delete_by_path(&pool, "a.png").await.unwrap());
    assert!(ImageRepo::find_by_path(&pool, "a.png").await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_under_matches_whole_segments(pool: SqlitePool) {
    for p in ["set/a.png", "set/sub/b.png", "settings/c.png", "d.png"] {
        ImageRepo::upsert(&pool, &upsert(p, false)).await.unwrap();
    }
    assert_eq!(ImageRepo::delete_under(&pool, "set").await.unwrap(), 2);
    assert_eq!(
        ImageRepo::list_paths(&pool).await.unwrap(),
        vec!["d.png".to_string(), "settings/c.png".to_string()]
    );
}

#[test]
fn page_size_is_clamped() {
    assert_eq!(clamp_page_size(None), 500);
    assert_eq!(clamp_page_size(Some(0)), 1);
    assert_eq!(clamp_page_size(Some(10_000)), 5000);
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_folder_builds_chain(pool: SqlitePool) {
    let folder = FolderRepo::create(&pool, "p/q/r").await.unwrap();
    assert_eq!(folder.name, "r");
    assert_eq!(folder.parent_path.as_deref(), Some("p/q"));

    let again = FolderRepo::create(&pool, "p/q/r").await.unwrap();
    assert_eq!(again.id, folder.id);

    let root = FolderRepo::find_by_path(&pool, "p").await.unwrap().unwrap();
    assert_eq!(root.parent_path, None);
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_folder_tree(pool: SqlitePool) {
    FolderRepo::create(&pool, "p/q").await.unwrap();
    FolderRepo::create(&pool, "pq").await.unwrap();
    assert_eq!(FolderRepo::delete_tree(&pool, "p").await.unwrap(), 2);
    let left: Vec<String> = FolderRepo::list(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(left, vec!["pq"]);
}
