//! Request handlers.
//!
//! Each submodule serves one route area. Handlers delegate to the
//! repositories and file stores in `groundmark_db`, the annotation pipeline
//! in `groundmark_annotator` and the batch [`engine`](crate::engine), and
//! map errors via [`AppError`](crate::error::AppError).

pub mod annotate;
pub mod annotations;
pub mod batch;
pub mod folders;
pub mod images;
