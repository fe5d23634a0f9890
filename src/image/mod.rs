//! Image views and grayscale conversion helpers.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. Owned pixel storage is
//! `image::GrayImage`; kernels only ever see views.

use crate::util::{PadMatchError, PadMatchResult};
use image::GrayImage;

pub mod io;
pub mod pyramid;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> PadMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> PadMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(PadMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }
}

impl<'a> ImageView<'a, u8> {
    /// Borrows a grayscale image buffer.
    pub fn from_gray(img: &'a GrayImage) -> PadMatchResult<Self> {
        Self::from_slice(img.as_raw(), img.width() as usize, img.height() as usize)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> PadMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(PadMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(PadMatchError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(PadMatchError::InvalidDimensions { width, height })?;
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::ImageView;
    use crate::util::PadMatchError;

    #[test]
    fn view_rejects_bad_geometry() {
        let data = [0u8; 8];
        assert_eq!(
            ImageView::from_slice(&data, 0, 2).err(),
            Some(PadMatchError::InvalidDimensions {
                width: 0,
                height: 2
            })
        );
        assert_eq!(
            ImageView::new(&data, 4, 1, 3).err(),
            Some(PadMatchError::InvalidStride {
                width: 4,
                stride: 3
            })
        );
        assert_eq!(
            ImageView::new(&data, 3, 3, 3).err(),
            Some(PadMatchError::BufferTooSmall { needed: 9, got: 8 })
        );
    }

    #[test]
    fn strided_rows_skip_padding() {
        let data: Vec<u8> = (0u8..12).collect();
        let view = ImageView::new(&data, 3, 3, 4).unwrap();
        assert_eq!(view.row(1).unwrap(), &[4u8, 5, 6]);
        assert_eq!(view.get(2, 2).copied(), Some(10));
        assert!(view.get(3, 0).is_none());
        assert!(view.row(3).is_none());
    }
}
