use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use groundmark_annotator::{Annotator, AnnotatorConfig, DetectorConfig, GroundingAnnotator, LlmConfig};
use groundmark_api::background::job_reaper;
use groundmark_api::config::ServerConfig;
use groundmark_api::engine::JobManager;
use groundmark_api::router::build_app_router;
use groundmark_api::state::AppState;
use groundmark_db::{AnnotationStore, ImageStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groundmark_api=debug,groundmark_annotator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = groundmark_db::create_pool(&config.database_url)
        .await
        .expect("Failed to open database");
    tracing::info!(url = %config.database_url, "Database connection pool created");

    groundmark_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    groundmark_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- File stores ---
    tokio::fs::create_dir_all(&config.images_dir)
        .await
        .expect("Failed to create images directory");
    tokio::fs::create_dir_all(&config.annotations_dir)
        .await
        .expect("Failed to create annotations directory");
    let images = Arc::new(ImageStore::new(config.images_dir.clone()));
    let annotations = Arc::new(AnnotationStore::new(config.annotations_dir.clone()));
    tracing::info!(
        images = %config.images_dir.display(),
        annotations = %config.annotations_dir.display(),
        "File stores ready"
    );

    // --- Annotation pipeline ---
    let annotator = GroundingAnnotator::from_config(
        &DetectorConfig::from_env(),
        LlmConfig::from_env(),
        AnnotatorConfig::from_env(),
    )
    .expect("Failed to build annotation pipeline");
    tracing::info!(detail_level = %annotator.detail_level(), "Annotation pipeline ready");

    // --- Batch jobs ---
    let jobs = Arc::new(JobManager::new(chrono::Duration::seconds(
        config.job_retention_secs as i64,
    )));

    let reaper_cancel = CancellationToken::new();
    let reaper_handle = tokio::spawn(job_reaper::run(
        Arc::clone(&jobs),
        job_reaper::REAP_INTERVAL,
        reaper_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        images,
        annotations,
        annotator: Arc::new(annotator),
        jobs: Arc::clone(&jobs),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Running jobs finish their in-flight items; the rest are skipped.
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if jobs.shutdown(shutdown_timeout).await {
        tracing::info!("Batch jobs drained");
    } else {
        tracing::warn!(timeout_secs = config.shutdown_timeout_secs, "Batch jobs still running at shutdown timeout");
    }

    reaper_cancel.cancel();
    let _ = tokio::time::timeout(shutdown_timeout, reaper_handle).await;
    tracing::info!("Job reaper stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
