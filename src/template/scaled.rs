//! Rescaled template pyramids used by multi-scale matching.

use super::TemplatePlan;
use crate::image::io::scale_square;
use crate::image::pyramid::ImagePyramid;
use crate::image::ImageView;
use crate::util::PadMatchResult;
use image::GrayImage;

/// One template scale with a ZNCC plan per pyramid level.
#[derive(Clone, Debug)]
pub struct ScaledTemplate {
    scale: f32,
    side: u32,
    levels: Vec<TemplatePlan>,
}

impl ScaledTemplate {
    /// Returns the scale factor relative to the canonical template.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns the side length at level 0.
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Returns the number of pyramid levels (at least 1).
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Returns the plan at `level`, if present.
    pub fn plan(&self, level: usize) -> Option<&TemplatePlan> {
        self.levels.get(level)
    }
}

/// Side length a scale factor maps `canonical` to, or `None` for factors
/// that are not finite, not positive or collapse the template.
pub(crate) fn scaled_side(canonical: u32, scale: f32) -> Option<u32> {
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }
    let side = (canonical as f32 * scale).round();
    (side >= 1.0 && side <= u32::MAX as f32).then_some(side as u32)
}

/// Builds one pyramid per scale. Scales whose side would exceed `max_side`
/// are skipped before any resampling happens.
pub(crate) fn build_scaled(
    canonical: &GrayImage,
    scales: &[f32],
    max_side: u32,
    min_level_side: u32,
) -> PadMatchResult<Vec<ScaledTemplate>> {
    let mut out = Vec::with_capacity(scales.len());
    for &scale in scales {
        let Some(side) = scaled_side(canonical.width(), scale) else {
            continue;
        };
        if max_side > 0 && side > max_side {
            continue;
        }
        if out.iter().any(|s: &ScaledTemplate| s.side == side) {
            continue;
        }
        let Some(image) = scale_square(canonical, scale) else {
            continue;
        };
        out.push(ScaledTemplate {
            scale,
            side,
            levels: level_plans(&image, min_level_side)?,
        });
    }
    Ok(out)
}

fn level_plans(image: &GrayImage, min_level_side: u32) -> PadMatchResult<Vec<TemplatePlan>> {
    let side = image.width().min(image.height());
    let mut count = 1u32;
    while min_level_side > 0 && side.checked_shr(count).unwrap_or(0) >= min_level_side {
        count += 1;
    }
    let pyramid = ImagePyramid::build(image, count as usize);
    let mut plans = Vec::with_capacity(pyramid.len());
    for level in 0..pyramid.len() {
        if let Some(img) = pyramid.level(level) {
            plans.push(TemplatePlan::from_view(ImageView::from_gray(img)?)?);
        }
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::{build_scaled, scaled_side};
    use image::{GrayImage, Luma};

    #[test]
    fn degenerate_scales_have_no_side() {
        assert_eq!(scaled_side(200, 0.0), None);
        assert_eq!(scaled_side(200, -1.0), None);
        assert_eq!(scaled_side(200, f32::NAN), None);
        assert_eq!(scaled_side(10, 0.01), None);
        assert_eq!(scaled_side(200, 1.25), Some(250));
    }

    #[test]
    fn oversized_and_duplicate_scales_are_skipped() {
        let canonical = GrayImage::from_pixel(64, 64, Luma([120]));
        let scaled = build_scaled(&canonical, &[0.5, 0.5, 1.0, 2.0, f32::NAN], 100, 16).unwrap();
        let sides: Vec<_> = scaled.iter().map(|s| s.side()).collect();
        assert_eq!(sides, vec![32, 64]);
        // 32 -> 16 stops at the minimum side; 64 -> 32 -> 16.
        assert_eq!(scaled[0].num_levels(), 2);
        assert_eq!(scaled[1].num_levels(), 3);
        assert_eq!(scaled[1].plan(2).unwrap().width(), 16);
        assert!(scaled[1].plan(3).is_none());
    }
}
