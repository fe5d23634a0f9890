//! ORB-style sparse local features.
//!
//! Keypoints come from FAST-9 on the unblurred image, are thinned with a
//! Chebyshev non-maximum suppression and capped by corner score. Orientation
//! and the 256-bit steered BRIEF descriptor of each keypoint are both sampled
//! from a Gaussian-smoothed copy (`blur_sigma`).

use image::GrayImage;
use imageproc::corners::corners_fast9;
use imageproc::filter::gaussian_blur_f32;
use std::cmp::Ordering;

mod brief;
pub mod matcher;

pub use matcher::{match_features, MatchStats};

/// 256-bit binary descriptor = 32 bytes.
pub type Descriptor = [u8; 32];

/// Keypoints closer than this to the border are discarded.
pub(crate) const BORDER: u32 = brief::PATCH_RADIUS as u32 + 1;

/// Feature extraction parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbConfig {
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Maximum keypoints kept per image (strongest first).
    pub max_keypoints: usize,
    /// Chebyshev radius for keypoint non-maximum suppression (0 disables).
    pub nms_radius: u32,
    /// Gaussian sigma applied before descriptor sampling (0 disables).
    pub blur_sigma: f32,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_keypoints: 500,
            nms_radius: 3,
            blur_sigma: 1.2,
        }
    }
}

/// FAST corner with orientation in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: u32,
    pub y: u32,
    pub score: f32,
    pub angle: f32,
}

/// Keypoints and their descriptors, index-aligned.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    /// Returns the keypoints.
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Returns the descriptors, one per keypoint.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Returns the number of keypoints.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Returns true when no keypoint survived.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Detects keypoints and computes descriptors.
///
/// Returns `None` when the image has too little texture to yield a single
/// keypoint away from the border.
pub fn extract_features(img: &GrayImage, cfg: &OrbConfig) -> Option<FeatureSet> {
    let (width, height) = img.dimensions();
    if width <= 2 * BORDER || height <= 2 * BORDER {
        return None;
    }

    let mut corners: Vec<_> = corners_fast9(img, cfg.fast_threshold)
        .into_iter()
        .filter(|c| {
            c.x >= BORDER && c.y >= BORDER && c.x < width - BORDER && c.y < height - BORDER
        })
        .collect();
    if corners.is_empty() {
        return None;
    }
    corners.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.y.cmp(&b.y))
            .then_with(|| a.x.cmp(&b.x))
    });

    let smoothed;
    let sample_src = if cfg.blur_sigma > 0.0 {
        smoothed = gaussian_blur_f32(img, cfg.blur_sigma);
        &smoothed
    } else {
        img
    };

    let mut keypoints: Vec<Keypoint> = Vec::new();
    'outer: for corner in corners {
        if keypoints.len() >= cfg.max_keypoints {
            break;
        }
        for kept in &keypoints {
            let dist = corner.x.abs_diff(kept.x).max(corner.y.abs_diff(kept.y));
            if dist <= cfg.nms_radius && cfg.nms_radius > 0 {
                continue 'outer;
            }
        }
        keypoints.push(Keypoint {
            x: corner.x,
            y: corner.y,
            score: corner.score,
            angle: brief::orientation(sample_src, corner.x, corner.y),
        });
    }

    let descriptors = keypoints
        .iter()
        .map(|kp| brief::describe(sample_src, kp))
        .collect();
    Some(FeatureSet {
        keypoints,
        descriptors,
    })
}

#[cfg(test)]
mod tests {
    use super::{extract_features, OrbConfig, BORDER};
    use image::{GrayImage, Luma};

    fn squares(size: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(size, size, Luma([20]));
        for (x0, y0) in [(20, 20), (44, 24), (26, 48), (50, 50)] {
            for y in y0..y0 + 10 {
                for x in x0..x0 + 10 {
                    img.put_pixel(x, y, Luma([230]));
                }
            }
        }
        img
    }

    #[test]
    fn flat_image_has_no_features() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        assert!(extract_features(&img, &OrbConfig::default()).is_none());
    }

    #[test]
    fn squares_yield_keypoints_inside_border() {
        let img = squares(80);
        let set = extract_features(&img, &OrbConfig::default()).unwrap();
        assert!(set.len() >= 4);
        assert_eq!(set.keypoints().len(), set.descriptors().len());
        for kp in set.keypoints() {
            assert!(kp.x >= BORDER && kp.y >= BORDER);
            assert!(kp.x < 80 - BORDER && kp.y < 80 - BORDER);
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let img = squares(80);
        let cfg = OrbConfig::default();
        assert_eq!(extract_features(&img, &cfg), extract_features(&img, &cfg));
    }

    #[test]
    fn keypoint_cap_is_respected() {
        let img = squares(80);
        let cfg = OrbConfig {
            max_keypoints: 2,
            ..OrbConfig::default()
        };
        assert_eq!(extract_features(&img, &cfg).unwrap().len(), 2);
    }

    #[test]
    fn blur_changes_descriptors_but_not_keypoint_positions() {
        let img = squares(80);
        let sharp = OrbConfig {
            blur_sigma: 0.0,
            ..OrbConfig::default()
        };
        let soft = OrbConfig {
            blur_sigma: 2.5,
            ..OrbConfig::default()
        };
        let a = extract_features(&img, &sharp).unwrap();
        let b = extract_features(&img, &soft).unwrap();
        let positions = |set: &super::FeatureSet| {
            set.keypoints().iter().map(|k| (k.x, k.y)).collect::<Vec<_>>()
        };
        assert_eq!(positions(&a), positions(&b));
        assert_ne!(a.descriptors(), b.descriptors());
    }
}
