#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use groundmark_annotator::imaging::solid_png;
use groundmark_annotator::{Annotator, AnnotatorError, AnnotatorResult, ImageInput};
use groundmark_api::config::ServerConfig;
use groundmark_api::engine::JobManager;
use groundmark_api::router::build_app_router;
use groundmark_api::state::AppState;
use groundmark_core::annotation::{Annotation, DetailLevel, Element};
use groundmark_core::dedup::Hint;
use groundmark_core::geometry::{BBox, Point};
use groundmark_db::{AnnotationStore, DbPool, ImageStore};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Stub annotator
// ---------------------------------------------------------------------------

/// Deterministic stand-in for the detector + model pipeline.
///
/// Behaviour is keyed on the image's file stem: `fail` returns an upstream
/// error, `panic` panics, a `slow` prefix sleeps for [`SLOW_DELAY`] first. Anything
/// else yields one hint and one element.
///
/// Slow calls are counted so tests can check how many ran at once.
#[derive(Default)]
pub struct StubAnnotator {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StubAnnotator {
    /// Most slow calls observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn slow_call(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(SLOW_DELAY).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub const SLOW_DELAY: Duration = Duration::from_millis(300);

fn stem(image: &ImageInput) -> &str {
    let name = image.filename.rsplit('/').next().unwrap_or(&image.filename);
    name.split('.').next().unwrap_or(name)
}

pub fn stub_hint() -> Hint {
    Hint {
        id: 1,
        bbox: BBox::new(8, 8, 40, 30),
        point: Point::new(24, 19),
        confidence: Some(0.9),
    }
}

#[async_trait]
impl Annotator for StubAnnotator {
    fn detail_level(&self) -> DetailLevel {
        DetailLevel::High
    }

    async fn preprocess(
        &self,
        image: &ImageInput,
        _max_elements: Option<usize>,
    ) -> AnnotatorResult<Vec<Hint>> {
        match stem(image) {
            "fail" => Err(AnnotatorError::Api {
                service: "detector",
                status: 503,
                body: "unavailable".into(),
            }),
            "panic" => panic!("stub annotator panicked on {}", image.filename),
            s if s.starts_with("slow") => {
                self.slow_call().await;
                Ok(vec![stub_hint()])
            }
            _ => Ok(vec![stub_hint()]),
        }
    }

    async fn annotate_with_hints(
        &self,
        image: &ImageInput,
        hints: &[Hint],
        _level: DetailLevel,
    ) -> AnnotatorResult<Annotation> {
        let mut annotation = Annotation::empty(image.size);
        annotation.elements = hints
            .iter()
            .map(|h| Element::new(format!("Click element {}", h.id), h.bbox, h.point))
            .collect();
        Ok(annotation)
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults rooted in `dir`.
pub fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: "sqlite::memory:".to_string(),
        images_dir: dir.path().join("images"),
        annotations_dir: dir.path().join("annotations"),
        max_file_size_mb: 4,
        batch_max_workers: 2,
        job_retention_secs: 600,
        dedup_iou: 0.6,
    }
}

/// The router plus the temporary directory backing its file stores.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub stub: Arc<StubAnnotator>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Write a PNG straight into the images directory (bypassing the API).
    pub async fn seed_image(&self, rel: &str) {
        self.state
            .images
            .write(rel, &png())
            .await
            .expect("seed image");
    }
}

/// Build the full application router with the production middleware stack,
/// the given database pool and a [`StubAnnotator`].
pub fn build_test_app(pool: DbPool) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&dir);
    let stub = Arc::new(StubAnnotator::default());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        images: Arc::new(ImageStore::new(config.images_dir.clone())),
        annotations: Arc::new(AnnotationStore::new(config.annotations_dir.clone())),
        annotator: Arc::clone(&stub) as Arc<dyn Annotator>,
        jobs: Arc::new(JobManager::new(chrono::Duration::seconds(
            config.job_retention_secs as i64,
        ))),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        stub,
        dir,
    }
}

/// A small PNG (64x48) the stub annotator can ground against.
pub fn png() -> Vec<u8> {
    solid_png(64, 48, 200)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::delete(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::post(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::put(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

const BOUNDARY: &str = "groundmark-test-boundary";

/// POST a multipart upload with a `file` part and optional `relative_path`.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    file_name: &str,
    bytes: &[u8],
    relative_path: Option<&str>,
) -> Response<Body> {
    let mut body: Vec<u8> = Vec::new();
    if let Some(rel) = relative_path {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"relative_path\"\r\n\r\n{rel}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Upload a test PNG under `rel` through the API.
pub async fn upload(app: Router, rel: &str) {
    let response = post_multipart(app, "/api/v1/images", "upload.png", &png(), Some(rel)).await;
    assert_eq!(response.status(), 201, "upload of {rel} failed");
}

/// Read an SSE body to its end, returning `(event, data)` pairs. Comment
/// lines (keep-alives) are ignored.
pub async fn read_sse(response: Response<Body>) -> Vec<(Option<String>, Option<Value>)> {
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    text.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .filter_map(|frame| {
            let mut event = None;
            let mut data = None;
            for line in frame.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(raw) = line.strip_prefix("data:") {
                    data = serde_json::from_str(raw.trim()).ok();
                }
            }
            (event.is_some() || data.is_some()).then_some((event, data))
        })
        .collect()
}
