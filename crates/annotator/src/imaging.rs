//! Image decoding helpers: dimensions, crops and data URLs.

use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use groundmark_core::annotation::ImageSize;
use groundmark_core::geometry::BBox;
use groundmark_core::paths::image_mime;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::AnnotatorResult;

/// An image handed to the collaborators: its name, bytes and pixel size.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub filename: String,
    pub bytes: Arc<[u8]>,
    pub size: ImageSize,
}

impl ImageInput {
    /// Wrap raw bytes, reading the pixel size from the image header.
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> AnnotatorResult<Self> {
        let size = read_dimensions(&bytes)?;
        Ok(Self {
            filename: filename.into(),
            bytes: bytes.into(),
            size,
        })
    }

    pub fn mime(&self) -> &'static str {
        image_mime(&self.filename)
    }

    /// The full image as a `data:` URL.
    pub fn data_url(&self) -> String {
        data_url(self.mime(), &self.bytes)
    }
}

/// Read width and height from the image header without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> AnnotatorResult<ImageSize> {
    let (w, h) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()?;
    Ok(ImageSize::new(i64::from(w), i64::from(h)))
}

pub fn decode(bytes: &[u8]) -> AnnotatorResult<DynamicImage> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?;
    Ok(img)
}

/// Crop `bbox` out of `img` (clipped to the image), shrink it so the longer
/// side is at most `long_side`, and encode it as PNG.
///
/// Returns `None` when the clipped box is empty.
pub fn crop_png(img: &DynamicImage, bbox: &BBox, long_side: u32) -> AnnotatorResult<Option<Vec<u8>>> {
    let (iw, ih) = (i64::from(img.width()), i64::from(img.height()));
    let x1 = bbox.x1.clamp(0, iw);
    let y1 = bbox.y1.clamp(0, ih);
    let x2 = bbox.x2.clamp(0, iw);
    let y2 = bbox.y2.clamp(0, ih);
    if x2 <= x1 || y2 <= y1 {
        return Ok(None);
    }

    // Clamped into the image's u32 dimensions above.
    let mut crop = img.crop_imm(x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32);
    if crop.width().max(crop.height()) > long_side {
        crop = crop.resize(long_side, long_side, FilterType::Lanczos3);
    }

    let mut buf = Cursor::new(Vec::new());
    crop.write_to(&mut buf, ImageFormat::Png)?;
    Ok(Some(buf.into_inner()))
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Encode a solid-colour PNG. Used by tests across the workspace.
#[doc(hidden)]
pub fn solid_png(width: u32, height: u32, luma: u8) -> Vec<u8> {
    let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
        width,
        height,
        image::Luma([luma]),
    ));
    let mut buf = Cursor::new(Vec::new());
    // Writing PNG into memory cannot fail for a valid in-memory image.
    let _ = img.write_to(&mut buf, ImageFormat::Png);
    buf.into_inner()
}
