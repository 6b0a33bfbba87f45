//! Cover Art Processor
//!
//! Normalizes whatever bitmap the congregation uploads to the platform's
//! artwork requirements: square, 1400x1400, RGB, JPEG under the size
//! ceiling. Transparency is flattened against white since podcast
//! directories render covers on light backgrounds.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::error::{ExportError, Result};

/// Required cover resolution (square), in pixels
pub const COVER_SIZE_PX: u32 = 1400;

/// Platform ceiling for the encoded cover, in bytes
pub const MAX_COVER_BYTES: usize = 2 * 1024 * 1024;

const JPEG_START_QUALITY: u8 = 90;
const JPEG_MIN_QUALITY: u8 = 30;
const JPEG_QUALITY_STEP: u8 = 10;

/// Processed cover art: the normalized bitmap and its encoded JPEG form
#[derive(Debug, Clone)]
pub struct CoverArt {
    pub image: RgbImage,
    pub jpeg: Vec<u8>,
}

/// Normalize a source bitmap to the platform artwork requirements
///
/// Center-crops to a square, resizes to 1400x1400, flattens any alpha
/// channel against white, and JPEG-encodes, stepping the quality down
/// until the result fits the size ceiling. Fails with `ArtworkError`
/// only if even minimum quality is still too large.
pub fn process_cover(source: &DynamicImage) -> Result<CoverArt> {
    let (width, height) = (source.width(), source.height());
    if width == 0 || height == 0 {
        return Err(ExportError::Artwork {
            reason: "source image has no pixels".to_string(),
        });
    }

    let square = if width == height {
        source.clone()
    } else {
        let side = width.min(height);
        let x = (width - side) / 2;
        let y = (height - side) / 2;
        source.crop_imm(x, y, side, side)
    };

    let resized = if square.width() != COVER_SIZE_PX {
        square.resize_exact(COVER_SIZE_PX, COVER_SIZE_PX, FilterType::Lanczos3)
    } else {
        square
    };

    let image = flatten_to_rgb(&resized);

    let mut quality = JPEG_START_QUALITY;
    loop {
        let jpeg = encode_jpeg(&image, quality)?;
        if jpeg.len() <= MAX_COVER_BYTES {
            log::debug!(
                "cover encoded at quality {}: {} bytes",
                quality,
                jpeg.len()
            );
            return Ok(CoverArt { image, jpeg });
        }
        if quality <= JPEG_MIN_QUALITY {
            return Err(ExportError::Artwork {
                reason: format!(
                    "cover is {} bytes at minimum quality, limit is {}",
                    jpeg.len(),
                    MAX_COVER_BYTES
                ),
            });
        }
        quality = quality.saturating_sub(JPEG_QUALITY_STEP).max(JPEG_MIN_QUALITY);
    }
}

/// Convert to RGB, compositing any alpha channel over white
fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
    }
    rgb
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| ExportError::Artwork {
            reason: format!("JPEG encoding failed: {}", e),
        })?;
    Ok(out)
}
