//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&SqlitePool` (or a connection, when they must run inside a
//! caller's transaction) as the first argument.

pub mod folder_repo;
pub mod image_repo;

pub use folder_repo::FolderRepo;
pub use image_repo::ImageRepo;

/// `WHERE` fragment matching the path bound as `?1` or anything beneath it.
pub(crate) const SUBTREE: &str = "(path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/')";
