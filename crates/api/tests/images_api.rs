//! Integration tests for image upload, listing, serving and deletion.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, body_json, delete, get, png, post_multipart, upload};
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_stores_file_and_row(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response =
        post_multipart(app.router(), "/api/v1/images", "a.png", &png(), Some("shots/a.png")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["path"], "shots/a.png");
    assert_eq!(json["data"]["has_annotation"], false);
    assert!(app.state.images.exists("shots/a.png").await);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_sanitizes_relative_path(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = post_multipart(
        app.router(),
        "/api/v1/images",
        "x.png",
        &png(),
        Some("my shots/login page!.png"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["path"], "my_shots/login_page.png");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_falls_back_to_file_name(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = post_multipart(app.router(), "/api/v1/images", "plain.png", &png(), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["path"], "plain.png");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_rejects_non_image(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response =
        post_multipart(app.router(), "/api/v1/images", "notes.txt", b"hello", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn list_is_ordered_and_paginated(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    for rel in ["c.png", "a.png", "b/z.png"] {
        upload(app.router(), rel).await;
    }

    let json = body_json(get(app.router(), "/api/v1/images?page=1&page_size=2").await).await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["page"], 1);
    assert_eq!(json["page_size"], 2);
    let names: Vec<&str> = json["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["filename"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.png", "b/z.png"]);

    let json = body_json(get(app.router(), "/api/v1/images?page=2&page_size=2").await).await;
    assert_eq!(json["images"].as_array().unwrap().len(), 1);
    assert_eq!(json["images"][0]["filename"], "c.png");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_indexes_images_directory_when_empty(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    app.seed_image("seeded/one.png").await;
    app.seed_image("two.jpg").await;

    let json = body_json(get(app.router(), "/api/v1/images").await).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["images"][0]["filename"], "seeded/one.png");
    assert_eq!(json["images"][0]["has_annotation"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_rejects_page_zero(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = get(app.router(), "/api/v1/images?page=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Serving
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn serves_image_bytes(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    upload(app.router(), "shots/a.png").await;

    let response = get(app.router(), "/api/v1/images/file/shots/a.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );
    assert_eq!(body_bytes(response).await, png());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn serving_missing_image_is_json_404(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = get(app.router(), "/api/v1/images/file/nope.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn get_without_file_prefix_is_404(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    upload(app.router(), "a.png").await;

    let response = get(app.router(), "/api/v1/images/a.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn path_traversal_is_rejected(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = get(app.router(), "/api/v1/images/file/a/../../secret.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_removes_file_row_and_annotation(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    upload(app.router(), "shots/a.png").await;
    upload(app.router(), "shots/b.png").await;
    let annotate = common::post_empty(app.router(), "/api/v1/annotate/shots/a.png").await;
    assert_eq!(annotate.status(), StatusCode::OK);

    let response = delete(app.router(), "/api/v1/images/shots/a.png").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(!app.state.images.exists("shots/a.png").await);
    assert!(!app.state.annotations.exists("shots/a.png").await);
    let json = body_json(get(app.router(), "/api/v1/images").await).await;
    assert_eq!(json["total"], 1);

    let again = delete(app.router(), "/api/v1/images/shots/a.png").await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}
