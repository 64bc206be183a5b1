//! HTTP surface of groundmark: routes plus the middleware every request
//! passes through.
//!
//! [`build_app_router`] is called by `main.rs` and by `tests/common/mod.rs`,
//! so integration tests exercise the same layers as the server.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, CONTENT_TYPE, LAST_MODIFIED, RANGE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID: &str = "x-request-id";

/// Assemble `/health`, the `/api/v1` tree and the middleware around them.
///
/// Layers, outermost first:
///
/// - CORS for the configured annotation UI origins
/// - `x-request-id` assignment, tracing, and echoing the id back
/// - `REQUEST_TIMEOUT_SECS` (408); batch progress streams send headers at
///   once, so only slow single-image annotate calls can hit it
/// - panics turned into 500s
/// - uploads capped at `MAX_FILE_SIZE_MB`
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID);

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(DefaultBodyLimit::max(config.max_body_bytes()))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS for the annotation UI.
///
/// Allows the verbs the API routes use, plus `Range` so the browser can
/// fetch partial image bytes. Panics on an unparsable origin so a bad
/// `CORS_ORIGINS` stops startup.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, ACCEPT, RANGE])
        .expose_headers([HeaderName::from_static(REQUEST_ID), LAST_MODIFIED])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
