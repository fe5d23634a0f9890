//! Intensity-centroid orientation and steered BRIEF sampling.

use super::{Descriptor, Keypoint};
use image::GrayImage;
use std::sync::OnceLock;

/// Radius of the circular patch used for orientation and sampling.
pub(super) const PATCH_RADIUS: i32 = 15;

/// Sample offsets stay inside this half-extent before rotation.
const SAMPLE_EXTENT: i32 = 12;

const PAIRS: usize = 256;

type Pair = [(i8, i8); 2];

/// Fixed pseudo-random comparison pattern shared by all images.
fn pattern() -> &'static [Pair; PAIRS] {
    static PATTERN: OnceLock<[Pair; PAIRS]> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // xorshift32 with a fixed seed keeps descriptors stable across runs
        let mut state: u32 = 0x9E37_79B9;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let span = (2 * SAMPLE_EXTENT + 1) as u32;
            ((state % span) as i32 - SAMPLE_EXTENT) as i8
        };
        let mut pairs = [[(0i8, 0i8); 2]; PAIRS];
        for pair in pairs.iter_mut() {
            loop {
                let a = (next(), next());
                let b = (next(), next());
                if a != b {
                    *pair = [a, b];
                    break;
                }
            }
        }
        pairs
    })
}

/// Orientation from the intensity centroid of the circular patch.
pub(super) fn orientation(img: &GrayImage, cx: u32, cy: u32) -> f32 {
    let r2 = PATCH_RADIUS * PATCH_RADIUS;
    let mut m01 = 0.0f64;
    let mut m10 = 0.0f64;
    for dy in -PATCH_RADIUS..=PATCH_RADIUS {
        for dx in -PATCH_RADIUS..=PATCH_RADIUS {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let value = f64::from(sample(img, cx as f32 + dx as f32, cy as f32 + dy as f32));
            m10 += dx as f64 * value;
            m01 += dy as f64 * value;
        }
    }
    m01.atan2(m10) as f32
}

/// Computes the 256-bit descriptor for a keypoint, steered by its angle.
pub(super) fn describe(img: &GrayImage, kp: &Keypoint) -> Descriptor {
    let (sin_a, cos_a) = kp.angle.sin_cos();
    let cx = kp.x as f32;
    let cy = kp.y as f32;
    let rotate = |(x, y): (i8, i8)| {
        let x = f32::from(x);
        let y = f32::from(y);
        (cx + x * cos_a - y * sin_a, cy + x * sin_a + y * cos_a)
    };

    let mut desc = [0u8; 32];
    for (bit, pair) in pattern().iter().enumerate() {
        let (ax, ay) = rotate(pair[0]);
        let (bx, by) = rotate(pair[1]);
        if sample(img, ax, ay) < sample(img, bx, by) {
            desc[bit / 8] |= 1 << (bit % 8);
        }
    }
    desc
}

/// Nearest-pixel sample clamped to the image bounds.
fn sample(img: &GrayImage, x: f32, y: f32) -> u8 {
    let max_x = img.width().saturating_sub(1) as f32;
    let max_y = img.height().saturating_sub(1) as f32;
    let xi = x.round().clamp(0.0, max_x) as u32;
    let yi = y.round().clamp(0.0, max_y) as u32;
    img.get_pixel(xi, yi)[0]
}

#[cfg(test)]
mod tests {
    use super::{describe, orientation, pattern};
    use crate::features::Keypoint;
    use image::{GrayImage, Luma};

    #[test]
    fn pattern_is_stable_and_in_range() {
        let a = pattern();
        let b = pattern();
        assert_eq!(a, b);
        for pair in a.iter() {
            assert_ne!(pair[0], pair[1]);
            for (x, y) in pair {
                assert!(x.abs() <= 12 && y.abs() <= 12);
            }
        }
    }

    #[test]
    fn orientation_points_towards_bright_side() {
        let mut img = GrayImage::from_pixel(64, 64, Luma([0]));
        for y in 0..64 {
            for x in 40..64 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let angle = orientation(&img, 32, 32);
        assert!(angle.abs() < 0.1, "angle {angle}");
    }

    #[test]
    fn flat_patch_has_empty_descriptor() {
        let img = GrayImage::from_pixel(64, 64, Luma([99]));
        let kp = Keypoint {
            x: 32,
            y: 32,
            score: 1.0,
            angle: 0.3,
        };
        assert_eq!(describe(&img, &kp), [0u8; 32]);
    }
}
