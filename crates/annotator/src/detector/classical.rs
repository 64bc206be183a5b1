//! Local detector based on classical image processing.
//!
//! The image is downscaled, converted to luma, and thresholded on a simple
//! forward-difference gradient. The edge mask is dilated so glyphs and icon
//! strokes merge into blobs, and each 4-connected blob becomes a candidate.
//! Confidence is the edge density inside the blob's box.

use std::sync::Arc;

use async_trait::async_trait;
use groundmark_core::dedup::Candidate;
use image::imageops::FilterType;
use image::GrayImage;

use super::Detector;
use crate::error::{AnnotatorError, AnnotatorResult};
use crate::imaging::{decode, ImageInput};

#[derive(Debug, Clone)]
pub struct ClassicalDetector {
    /// Images are downscaled so the longer side is at most this.
    pub max_side: u32,
    /// Minimum summed |dx|+|dy| for a pixel to count as an edge.
    pub edge_threshold: i32,
    /// Dilation radius in (downscaled) pixels.
    pub dilate_radius: usize,
    /// Blobs narrower or shorter than this (downscaled) are ignored.
    pub min_side: usize,
    /// Blobs covering more than this fraction of the image are ignored.
    pub max_area_ratio: f64,
}

impl Default for ClassicalDetector {
    fn default() -> Self {
        Self {
            max_side: 640,
            edge_threshold: 40,
            dilate_radius: 2,
            min_side: 6,
            max_area_ratio: 0.5,
        }
    }
}

/// Axis-aligned extent of one connected blob; `x2`/`y2` are exclusive.
#[derive(Debug, Clone, Copy)]
struct Blob {
    x1: usize,
    y1: usize,
    x2: usize,
    y2: usize,
}

impl Blob {
    fn width(&self) -> usize {
        self.x2 - self.x1
    }

    fn height(&self) -> usize {
        self.y2 - self.y1
    }
}

fn edge_mask(luma: &GrayImage, threshold: i32) -> Vec<bool> {
    let (w, h) = (luma.width() as usize, luma.height() as usize);
    let raw = luma.as_raw();
    let mut mask = vec![false; w * h];
    for y in 0..h.saturating_sub(1) {
        for x in 0..w.saturating_sub(1) {
            let p = i32::from(raw[y * w + x]);
            let dx = (i32::from(raw[y * w + x + 1]) - p).abs();
            let dy = (i32::from(raw[(y + 1) * w + x]) - p).abs();
            mask[y * w + x] = dx + dy >= threshold;
        }
    }
    mask
}

/// Square dilation as two separable passes.
fn dilate(mask: &[bool], w: usize, h: usize, radius: usize) -> Vec<bool> {
    if radius == 0 {
        return mask.to_vec();
    }
    let mut horizontal = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(w - 1);
            horizontal[y * w + x] = (lo..=hi).any(|xx| mask[y * w + xx]);
        }
    }
    let mut out = vec![false; w * h];
    for y in 0..h {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius).min(h - 1);
        for x in 0..w {
            out[y * w + x] = (lo..=hi).any(|yy| horizontal[yy * w + x]);
        }
    }
    out
}

/// 4-connected components of `mask`, as bounding boxes.
fn blobs(mask: &[bool], w: usize, h: usize) -> Vec<Blob> {
    let mut visited = vec![false; w * h];
    let mut out = Vec::new();
    let mut stack = Vec::new();

    for start in 0..w * h {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        let mut blob = Blob {
            x1: start % w,
            y1: start / w,
            x2: start % w + 1,
            y2: start / w + 1,
        };

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            blob.x1 = blob.x1.min(x);
            blob.y1 = blob.y1.min(y);
            blob.x2 = blob.x2.max(x + 1);
            blob.y2 = blob.y2.max(y + 1);

            let mut visit = |n: usize| {
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }
        out.push(blob);
    }
    out
}

fn edge_density(edges: &[bool], w: usize, blob: &Blob) -> f64 {
    let hits = (blob.y1..blob.y2)
        .map(|y| (blob.x1..blob.x2).filter(|&x| edges[y * w + x]).count())
        .sum::<usize>();
    hits as f64 / (blob.width() * blob.height()) as f64
}

impl ClassicalDetector {
    fn detect_blocking(&self, bytes: &[u8]) -> AnnotatorResult<Vec<Candidate>> {
        let img = decode(bytes)?;
        let (ow, oh) = (img.width(), img.height());
        let long = ow.max(oh);
        if long == 0 {
            return Ok(Vec::new());
        }

        let scale = if long > self.max_side {
            f64::from(self.max_side) / f64::from(long)
        } else {
            1.0
        };
        let luma = if scale < 1.0 {
            img.resize(self.max_side, self.max_side, FilterType::Triangle)
                .to_luma8()
        } else {
            img.to_luma8()
        };

        let (w, h) = (luma.width() as usize, luma.height() as usize);
        let edges = edge_mask(&luma, self.edge_threshold);
        let merged = dilate(&edges, w, h, self.dilate_radius);
        let max_area = self.max_area_ratio * (w * h) as f64;

        let candidates = blobs(&merged, w, h)
            .into_iter()
            .filter(|b| b.width() >= self.min_side && b.height() >= self.min_side)
            .filter(|b| ((b.width() * b.height()) as f64) <= max_area)
            .filter_map(|b| {
                let confidence = edge_density(&edges, w, &b);
                let bbox = [
                    (b.x1 as f64 / scale).floor(),
                    (b.y1 as f64 / scale).floor(),
                    (b.x2 as f64 / scale).ceil().min(f64::from(ow)),
                    (b.y2 as f64 / scale).ceil().min(f64::from(oh)),
                ];
                Candidate::from_raw(bbox, None, Some(confidence))
            })
            .collect();
        Ok(candidates)
    }
}

#[async_trait]
impl Detector for ClassicalDetector {
    fn name(&self) -> &'static str {
        "classical"
    }

    async fn detect(&self, image: &ImageInput) -> AnnotatorResult<Vec<Candidate>> {
        let this = self.clone();
        let bytes = Arc::clone(&image.bytes);
        let candidates = tokio::task::spawn_blocking(move || this.detect_blocking(&bytes))
            .await
            .map_err(|e| AnnotatorError::Task(e.to_string()))??;

        tracing::debug!(
            filename = %image.filename,
            candidates = candidates.len(),
            "Classical detector finished"
        );
        Ok(candidates)
    }
}
