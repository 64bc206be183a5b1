//! Relative path handling for images, folders and annotation files.
//!
//! All stored paths are `/`-separated and relative to the images directory.
//! Nothing here touches the filesystem.

use crate::error::CoreError;

/// File extensions treated as images (lower-case, without the dot).
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Normalize a client-supplied relative path.
///
/// Backslashes become `/`, leading/trailing and repeated separators are
/// dropped. Empty paths and `.`/`..` segments are rejected.
pub fn normalize_rel_path(raw: &str) -> Result<String, CoreError> {
    let replaced = raw.replace('\\', "/");
    let mut parts = Vec::new();
    for seg in replaced.split('/') {
        match seg {
            "" => continue,
            "." | ".." => {
                return Err(CoreError::Validation(format!(
                    "Path '{raw}' must not contain '.' or '..' segments"
                )))
            }
            s => parts.push(s),
        }
    }
    if parts.is_empty() {
        return Err(CoreError::Validation("Path must not be empty".into()));
    }
    Ok(parts.join("/"))
}

/// Lower-cased extension of the last path segment, if any.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_image_file(path: &str) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// MIME type for an image path, defaulting to JPEG.
pub fn image_mime(path: &str) -> &'static str {
    match extension(path).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Last segment of a `/`-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Parent folder of a `/`-separated path; `None` at the root.
pub fn parent_folder(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Relative path of the annotation file for an image: same folder, same
/// stem, `.json` extension.
pub fn annotation_rel_path(image_rel: &str) -> String {
    let name = file_name(image_rel);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    match parent_folder(image_rel) {
        Some(parent) => format!("{parent}/{stem}.json"),
        None => format!("{stem}.json"),
    }
}

/// Every ancestor folder of `folder`, outermost first, including itself.
///
/// `"a/b/c"` yields `["a", "a/b", "a/b/c"]`.
pub fn folder_chain(folder: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = String::new();
    for seg in folder.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(seg);
        chain.push(current.clone());
    }
    chain
}

/// Reduce one path component to a safe filename.
///
/// Whitespace runs become `_`, characters outside `[A-Za-z0-9._-]` are
/// removed, and leading/trailing `.` and `_` are stripped. May return an
/// empty string.
pub fn sanitize_component(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Sanitize every component of an uploaded relative path, dropping
/// components that sanitize to nothing.
pub fn sanitize_rel_path(raw: &str) -> Result<String, CoreError> {
    let cleaned: Vec<String> = raw
        .replace('\\', "/")
        .split('/')
        .map(sanitize_component)
        .filter(|s| !s.is_empty())
        .collect();
    normalize_rel_path(&cleaned.join("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
