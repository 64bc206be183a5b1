//! Batch annotation engine.
//!
//! [`JobManager`] registers jobs and drives each through a bounded worker
//! pool; [`BatchJob`] holds a job's results and its replayable event log;
//! [`processor`] does the per-image work shared with the single-image
//! endpoint.

pub mod job;
pub mod manager;
pub mod processor;

pub use job::{BatchJob, JobStatus};
pub use manager::JobManager;
pub use processor::ItemContext;
