//! Decoding and resampling helpers built on the `image` crate.

use crate::util::{PadMatchError, PadMatchResult};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use std::path::Path;

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> PadMatchResult<GrayImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| PadMatchError::ImageIo {
        path: Some(path.to_path_buf()),
        reason: err.to_string(),
    })?;
    gray_from_dynamic(&img)
}

/// Decodes an in-memory encoded image (png, jpeg, bmp) to grayscale.
pub fn decode_gray_image(bytes: &[u8]) -> PadMatchResult<GrayImage> {
    let img = image::load_from_memory(bytes).map_err(|err| PadMatchError::ImageIo {
        path: None,
        reason: err.to_string(),
    })?;
    gray_from_dynamic(&img)
}

/// Converts a decoded image to a single 8-bit luma channel.
pub fn gray_from_dynamic(img: &DynamicImage) -> PadMatchResult<GrayImage> {
    let gray = img.to_luma8();
    ensure_non_empty(&gray)?;
    Ok(gray)
}

/// Resizes to a `size`×`size` square, the resolution all templates share.
pub fn to_canonical(img: &GrayImage, size: u32) -> PadMatchResult<GrayImage> {
    ensure_non_empty(img)?;
    if size == 0 {
        return Err(PadMatchError::InvalidInput("canonical size must be > 0"));
    }
    if img.width() == size && img.height() == size {
        return Ok(img.clone());
    }
    Ok(imageops::resize(img, size, size, FilterType::Triangle))
}

/// Downscales so the longer side is at most `max_side`, keeping the aspect
/// ratio. Images already within the limit are returned unchanged.
pub fn limit_longer_side(img: &GrayImage, max_side: u32) -> PadMatchResult<GrayImage> {
    ensure_non_empty(img)?;
    let longer = img.width().max(img.height());
    if max_side == 0 || longer <= max_side {
        return Ok(img.clone());
    }
    let factor = max_side as f64 / longer as f64;
    let width = ((img.width() as f64 * factor).round() as u32).max(1);
    let height = ((img.height() as f64 * factor).round() as u32).max(1);
    Ok(imageops::resize(img, width, height, FilterType::Triangle))
}

/// Scales a square template by `factor`. Returns `None` when the result
/// would collapse to zero pixels.
pub fn scale_square(img: &GrayImage, factor: f32) -> Option<GrayImage> {
    if !factor.is_finite() || factor <= 0.0 {
        return None;
    }
    let width = (img.width() as f32 * factor).round() as u32;
    let height = (img.height() as f32 * factor).round() as u32;
    if width == 0 || height == 0 {
        return None;
    }
    if width == img.width() && height == img.height() {
        return Some(img.clone());
    }
    Some(imageops::resize(img, width, height, FilterType::Triangle))
}

fn ensure_non_empty(img: &GrayImage) -> PadMatchResult<()> {
    if img.width() == 0 || img.height() == 0 {
        return Err(PadMatchError::InvalidDimensions {
            width: img.width() as usize,
            height: img.height() as usize,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{decode_gray_image, limit_longer_side, scale_square, to_canonical};
    use image::{GrayImage, Luma};

    #[test]
    fn canonical_resize_is_square() {
        let img = GrayImage::from_pixel(40, 30, Luma([90]));
        let out = to_canonical(&img, 64).unwrap();
        assert_eq!(out.dimensions(), (64, 64));
        assert!(out.pixels().all(|p| p[0] == 90));
    }

    #[test]
    fn longer_side_limit_keeps_aspect() {
        let img = GrayImage::new(800, 400);
        let out = limit_longer_side(&img, 200).unwrap();
        assert_eq!(out.dimensions(), (200, 100));
        let small = GrayImage::new(50, 20);
        assert_eq!(limit_longer_side(&small, 200).unwrap().dimensions(), (50, 20));
    }

    #[test]
    fn scale_square_rejects_degenerate_factors() {
        let img = GrayImage::new(10, 10);
        assert!(scale_square(&img, 0.0).is_none());
        assert!(scale_square(&img, 0.01).is_none());
        assert_eq!(scale_square(&img, 1.5).unwrap().dimensions(), (15, 15));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode_gray_image(b"definitely not an image").is_err());
    }
}
