//! Placing photos: aspect-preserving scaling into fixed boxes.

use labnote_core::model::Photo;
use labnote_core::PhotoError;

use crate::document::{Block, ImageBlock};

/// Maximum placed size of an image slot, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBox {
    pub max_width_mm: f64,
    pub max_height_mm: f64,
}

impl ImageBox {
    pub const fn new(max_width_mm: f64, max_height_mm: f64) -> Self {
        Self {
            max_width_mm,
            max_height_mm,
        }
    }
}

pub const APPARATUS_BOX: ImageBox = ImageBox::new(120.0, 80.0);
pub const CHART_BOX: ImageBox = ImageBox::new(140.0, 90.0);
pub const WATER_PHOTO_BOX: ImageBox = ImageBox::new(100.0, 70.0);
pub const PAIRED_PHOTO_BOX: ImageBox = ImageBox::new(75.0, 55.0);

/// Scale `(width, height)` to fill the box width, then shrink to the box
/// height if that overflows. Degenerate sizes take the whole box.
pub fn fit_to_box(intrinsic: (f64, f64), bounds: ImageBox) -> (f64, f64) {
    let (w, h) = intrinsic;
    if !(w > 0.0 && h > 0.0) {
        return (bounds.max_width_mm, bounds.max_height_mm);
    }
    let mut width = bounds.max_width_mm;
    let mut height = width * (h / w);
    if height > bounds.max_height_mm {
        height = bounds.max_height_mm;
        width = height * (w / h);
    }
    (width, height)
}

fn mime_type(bytes: &[u8]) -> &'static str {
    use imagesize::ImageType;

    match imagesize::image_type(bytes) {
        Ok(ImageType::Png) => "image/png",
        Ok(ImageType::Jpeg) => "image/jpeg",
        Ok(ImageType::Gif) => "image/gif",
        Ok(ImageType::Webp) => "image/webp",
        Ok(ImageType::Bmp) => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Decode a stored photo and size it for `bounds`.
pub fn photo_block(photo: &Photo, bounds: ImageBox) -> Result<ImageBlock, PhotoError> {
    let bytes = photo.decode()?;
    let size = imagesize::blob_size(&bytes)
        .map_err(|e| PhotoError::UnrecognizedImage(e.to_string()))?;
    let (width_mm, height_mm) = fit_to_box((size.width as f64, size.height as f64), bounds);
    Ok(ImageBlock {
        mime: mime_type(&bytes),
        data: photo.encoded().trim().to_string(),
        width_mm,
        height_mm,
    })
}

/// The photo as a block, or a placeholder note when it cannot be read.
pub fn photo_or_placeholder(photo: &Photo, bounds: ImageBox) -> Block {
    match photo_block(photo, bounds) {
        Ok(image) => Block::Image(image),
        Err(e) => {
            tracing::warn!("photo could not be placed: {e}");
            Block::Placeholder(format!("(画像読み込みエラー: {e})"))
        }
    }
}
