use std::path::PathBuf;

use groundmark_core::dedup::DEFAULT_DUPLICATE_IOU;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// Collaborator settings (detector, language model, annotation tuning) are
/// loaded separately by `groundmark_annotator::config`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Single-image annotation waits on the
    /// language model, so this defaults to its timeout (`900`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    /// SQLite URL for image and folder metadata.
    pub database_url: String,
    /// Root directory of uploaded images.
    pub images_dir: PathBuf,
    /// Root directory of annotation JSON files.
    pub annotations_dir: PathBuf,
    /// Upload body limit in megabytes.
    pub max_file_size_mb: usize,
    /// Default worker pool size for batch jobs.
    pub batch_max_workers: usize,
    /// How long completed batch jobs stay queryable.
    pub job_retention_secs: u64,
    /// IoU above which two element boxes count as duplicates.
    pub dedup_iou: f64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                     |
    /// |-------------------------|-----------------------------|
    /// | `HOST`                  | `0.0.0.0`                   |
    /// | `PORT`                  | `5000`                      |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`     |
    /// | `REQUEST_TIMEOUT_SECS`  | `900`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                        |
    /// | `DATABASE_URL`          | `sqlite://data/metadata.db` |
    /// | `IMAGES_DIR`            | `data/images`               |
    /// | `ANNOTATIONS_DIR`       | `data/annotations`          |
    /// | `MAX_FILE_SIZE_MB`      | `16`                        |
    /// | `BATCH_MAX_WORKERS`     | `3`                         |
    /// | `JOB_RETENTION_SECS`    | `600`                       |
    /// | `DEDUP_IOU_THRESHOLD`   | `0.6`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/metadata.db".into());

        let images_dir = std::env::var("IMAGES_DIR")
            .unwrap_or_else(|_| "data/images".into())
            .into();

        let annotations_dir = std::env::var("ANNOTATIONS_DIR")
            .unwrap_or_else(|_| "data/annotations".into())
            .into();

        let max_file_size_mb: usize = std::env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| "16".into())
            .parse()
            .expect("MAX_FILE_SIZE_MB must be a valid usize");

        let batch_max_workers: usize = std::env::var("BATCH_MAX_WORKERS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("BATCH_MAX_WORKERS must be a valid usize");

        let job_retention_secs: u64 = std::env::var("JOB_RETENTION_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("JOB_RETENTION_SECS must be a valid u64");

        let dedup_iou: f64 = std::env::var("DEDUP_IOU_THRESHOLD")
            .map(|v| v.parse().expect("DEDUP_IOU_THRESHOLD must be a number"))
            .unwrap_or(DEFAULT_DUPLICATE_IOU);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            images_dir,
            annotations_dir,
            max_file_size_mb,
            batch_max_workers: batch_max_workers.max(1),
            job_retention_secs,
            dedup_iou,
        }
    }

    /// Upload body limit in bytes.
    pub fn max_body_bytes(&self) -> usize {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}
