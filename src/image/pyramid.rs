//! Image pyramid construction for grayscale images.
//!
//! Downsampling uses a 2x2 box filter with integer rounding:
//! `dst = ((a + b + c + d) + 2) / 4`. Odd trailing rows and columns are
//! dropped, so a level is always exactly half (floored) of the one above.

use image::GrayImage;

/// Owned image pyramid; level 0 is the base image.
#[derive(Clone, Debug)]
pub struct ImagePyramid {
    levels: Vec<GrayImage>,
}

impl ImagePyramid {
    /// Builds a pyramid from a base image.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always
    /// present. Construction stops early once a level would lose a side.
    pub fn build(base: &GrayImage, max_levels: usize) -> Self {
        let max_levels = max_levels.max(1);
        let mut levels = vec![base.clone()];
        while levels.len() < max_levels {
            let Some(src) = levels.last() else { break };
            if src.width() < 2 || src.height() < 2 {
                break;
            }
            let next = downsample_2x(src);
            levels.push(next);
        }
        Self { levels }
    }

    /// Returns the image at `level`, if present.
    pub fn level(&self, level: usize) -> Option<&GrayImage> {
        self.levels.get(level)
    }

    /// Returns the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; a pyramid holds at least its base level.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Halves both sides with a rounded 2x2 box filter.
pub fn downsample_2x(src: &GrayImage) -> GrayImage {
    let width = src.width() / 2;
    let height = src.height() / 2;
    GrayImage::from_fn(width, height, |x, y| {
        let sx = x * 2;
        let sy = y * 2;
        let a = u16::from(src.get_pixel(sx, sy)[0]);
        let b = u16::from(src.get_pixel(sx + 1, sy)[0]);
        let c = u16::from(src.get_pixel(sx, sy + 1)[0]);
        let d = u16::from(src.get_pixel(sx + 1, sy + 1)[0]);
        image::Luma([((a + b + c + d + 2) / 4) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::{downsample_2x, ImagePyramid};
    use image::{GrayImage, Luma};

    #[test]
    fn box_filter_rounds_to_nearest() {
        let mut img = GrayImage::new(3, 2);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([1]));
        img.put_pixel(0, 1, Luma([1]));
        img.put_pixel(1, 1, Luma([0]));
        img.put_pixel(2, 0, Luma([255]));
        let out = downsample_2x(&img);
        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(out.get_pixel(0, 0)[0], 1);
    }

    #[test]
    fn pyramid_halves_until_limit() {
        let img = GrayImage::from_pixel(37, 20, Luma([90]));
        let pyramid = ImagePyramid::build(&img, 8);
        let sizes: Vec<_> = (0..pyramid.len())
            .map(|l| pyramid.level(l).unwrap().dimensions())
            .collect();
        assert_eq!(sizes, vec![(37, 20), (18, 10), (9, 5), (4, 2), (2, 1)]);
        assert!(pyramid.level(2).unwrap().pixels().all(|p| p[0] == 90));

        assert_eq!(ImagePyramid::build(&img, 0).len(), 1);
    }
}
