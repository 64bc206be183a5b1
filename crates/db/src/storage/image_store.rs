//! Image bytes on disk, addressed by relative path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use groundmark_core::paths::is_image_file;

use super::StoreError;

/// An image file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub async fn exists(&self, rel: &str) -> bool {
        tokio::fs::metadata(self.file_path(rel))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub async fn read(&self, rel: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.file_path(rel);
        tokio::fs::read(&path).await.map_err(|e| StoreError::io(&path, e))
    }

    /// Write image bytes, creating parent folders as needed.
    pub async fn write(&self, rel: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.file_path(rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }

    /// Delete one image. Returns `true` if a file was removed.
    pub async fn remove(&self, rel: &str) -> Result<bool, StoreError> {
        let path = self.file_path(rel);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    pub async fn create_dir(&self, folder: &str) -> Result<(), StoreError> {
        let dir = self.file_path(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))
    }

    /// Delete a folder and its contents. Returns `true` if it existed.
    pub async fn remove_dir(&self, folder: &str) -> Result<bool, StoreError> {
        let dir = self.file_path(folder);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&dir, e)),
        }
    }

    /// Walk the root and list every image file, ordered by relative path.
    ///
    /// A missing root yields an empty list.
    pub async fn scan(&self) -> Result<Vec<StoredImage>, StoreError> {
        let mut found = Vec::new();
        let mut pending: Vec<(PathBuf, String)> = vec![(self.root.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io(&dir, e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::io(&dir, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let rel = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::io(&entry.path(), e))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), rel));
                } else if file_type.is_file() && is_image_file(&rel) {
                    let size = entry
                        .metadata()
                        .await
                        .map(|m| m.len() as i64)
                        .map_err(|e| StoreError::io(&entry.path(), e))?;
                    found.push(StoredImage {
                        path: rel,
                        size_bytes: size,
                    });
                }
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }
}
