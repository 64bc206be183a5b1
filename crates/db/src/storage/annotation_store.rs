//! One JSON annotation document per image.
//!
//! The document for `a/b/shot.png` lives at `<root>/a/b/shot.json`. Writes
//! go through a temporary sibling file and a rename, so readers never see a
//! half-written document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use groundmark_core::annotation::Annotation;
use groundmark_core::paths::annotation_rel_path;

use super::StoreError;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    root: PathBuf,
}

impl AnnotationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of the annotation file for an image path.
    pub fn file_path(&self, image_rel: &str) -> PathBuf {
        self.root.join(annotation_rel_path(image_rel))
    }

    pub async fn exists(&self, image_rel: &str) -> bool {
        tokio::fs::try_exists(self.file_path(image_rel))
            .await
            .unwrap_or(false)
    }

    /// Read the annotation for an image, `None` when there is none.
    pub async fn load(&self, image_rel: &str) -> Result<Option<Annotation>, StoreError> {
        let path = self.file_path(image_rel);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            })
    }

    /// Write (or replace) the annotation for an image.
    pub async fn save(&self, image_rel: &str, annotation: &Annotation) -> Result<(), StoreError> {
        let path = self.file_path(image_rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let body = serde_json::to_vec_pretty(annotation).map_err(|source| StoreError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;

        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{seq}.tmp"));
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io(&path, e));
        }

        tracing::debug!(image = image_rel, path = %path.display(), "Annotation saved");
        Ok(())
    }

    /// Remove the annotation for an image. Returns `true` if a file was removed.
    pub async fn delete(&self, image_rel: &str) -> Result<bool, StoreError> {
        let path = self.file_path(image_rel);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Remove every annotation under a folder.
    pub async fn delete_tree(&self, folder: &str) -> Result<(), StoreError> {
        let dir = self.root.join(folder);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&dir, e)),
        }
    }
}
