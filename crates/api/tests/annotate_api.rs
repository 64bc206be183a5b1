//! Integration tests for single-image annotation and the detector preview.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_empty, post_json, upload};
use serde_json::json;
use sqlx::SqlitePool;

#[sqlx::test(migrations = "../db/migrations")]
async fn annotate_stores_and_returns_document(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    upload(app.router(), "shots/a.png").await;

    let response = post_empty(app.router(), "/api/v1/annotate/shots/a.png").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["img_size"], json!([64, 48]));
    assert_eq!(json["element"].as_array().unwrap().len(), 1);
    assert_eq!(json["element"][0]["bbox"], json!([8, 8, 40, 30]));

    let stored = body_json(get(app.router(), "/api/v1/annotations/shots/a.png").await).await;
    assert_eq!(stored, json);

    let list = body_json(get(app.router(), "/api/v1/images").await).await;
    assert_eq!(list["images"][0]["has_annotation"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn annotate_accepts_detail_level(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    upload(app.router(), "a.png").await;

    let response = post_json(
        app.router(),
        "/api/v1/annotate/a.png",
        json!({ "detail_level": "low" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn annotate_failure_is_502_and_stores_nothing(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    upload(app.router(), "fail.png").await;

    let response = post_empty(app.router(), "/api/v1/annotate/fail.png").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(response).await;
    assert_eq!(json["code"], "UPSTREAM_ERROR");
    assert_eq!(json["error"], "detector returned 503: unavailable");
    assert!(!app.state.annotations.exists("fail.png").await);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn annotate_unknown_image_is_404(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = post_empty(app.router(), "/api/v1/annotate/ghost.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn annotate_undecodable_image_is_400(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    app.state
        .images
        .write("broken.png", b"not really a png")
        .await
        .unwrap();

    let response = post_empty(app.router(), "/api/v1/annotate/broken.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn preprocess_returns_hints_without_persisting(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    upload(app.router(), "a.png").await;

    let response = post_json(
        app.router(),
        "/api/v1/preprocess/a.png",
        json!({ "max_elements": 10 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["img_size"], json!([64, 48]));
    let hints = json["hints"].as_array().unwrap();
    assert_eq!(hints.len(), 1);
    assert_eq!(hints[0]["id"], 1);
    assert_eq!(hints[0]["point"], json!([24, 19]));

    assert!(!app.state.annotations.exists("a.png").await);
}
