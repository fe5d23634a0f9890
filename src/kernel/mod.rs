//! Correlation kernel implementations.
//!
//! A kernel only accumulates raw window statistics for one placement; the
//! ZNCC score and the uniform-patch fallback are derived here so every kernel
//! (scalar, SIMD, row-parallel) produces identical scores.

use crate::image::ImageView;
use crate::template::plan::FLAT_VARIANCE;
use crate::template::TemplatePlan;
use crate::util::{PadMatchError, PadMatchResult};
use std::cmp::Ordering;

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;

// Kernel type alias - use SIMD when available
#[cfg(not(feature = "simd"))]
use self::scalar::ZnccScalar as Zncc;
#[cfg(feature = "simd")]
use self::simd::ZnccSimd as Zncc;

/// Raw sums for one template placement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowStats {
    /// Dot product of the zero-mean template with the image window.
    pub dot: f64,
    /// Sum of window intensities.
    pub sum_i: u64,
    /// Sum of squared window intensities.
    pub sum_i2: u64,
}

/// Best placement found by a scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the top-left placement.
    pub x: usize,
    /// Y coordinate (row) of the top-left placement.
    pub y: usize,
    /// Score at the placement.
    pub score: f32,
}

impl Peak {
    /// Orders by descending score, then row, then column.
    pub(crate) fn cmp_desc(&self, other: &Peak) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.y.cmp(&other.y))
            .then_with(|| self.x.cmp(&other.x))
    }

    pub(crate) fn keep_best(best: Option<Peak>, peak: Peak) -> Option<Peak> {
        match best {
            Some(current) if current.cmp_desc(&peak) != Ordering::Greater => Some(current),
            _ => Some(peak),
        }
    }
}

/// Kernel trait for accumulating placement statistics.
pub trait Kernel {
    /// Accumulates statistics for the placement with top-left `(x, y)`.
    ///
    /// Callers guarantee the template fits at that placement.
    fn window_stats(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize)
        -> WindowStats;

    /// Scores a single placement.
    fn score_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> f32 {
        score_from_stats(plan, Self::window_stats(image, plan, x, y))
    }
}

/// Converts window statistics into a score in `[-1, 1]`.
///
/// ZNCC is undefined when either side is uniform: two uniform patches score
/// by intensity closeness, a uniform patch against a textured one scores 0.
pub fn score_from_stats(plan: &TemplatePlan, stats: WindowStats) -> f32 {
    let n = (plan.width() * plan.height()) as f64;
    let sum_i = stats.sum_i as f64;
    let var_i = (stats.sum_i2 as f64 - sum_i * sum_i / n).max(0.0);
    let window_flat = var_i / n <= FLAT_VARIANCE;

    if plan.is_flat() {
        if !window_flat {
            return 0.0;
        }
        let mean_i = sum_i / n;
        let diff = (f64::from(plan.mean()) - mean_i).abs();
        return (1.0 - diff / 255.0) as f32;
    }
    if window_flat {
        return 0.0;
    }

    let denom = (f64::from(plan.var_t()) * var_i).sqrt();
    let score = stats.dot / denom;
    if score.is_finite() {
        score.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

pub(crate) fn placement_range(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> PadMatchResult<(usize, usize)> {
    let img_width = image.width();
    let img_height = image.height();
    let tpl_width = plan.width();
    let tpl_height = plan.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(PadMatchError::TemplateTooLarge {
            tpl_width,
            tpl_height,
            img_width,
            img_height,
        });
    }
    Ok((img_width - tpl_width, img_height - tpl_height))
}

/// Scans every valid placement and returns the best peak.
pub fn scan_best<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> PadMatchResult<Option<Peak>> {
    let (max_x, max_y) = placement_range(image, plan)?;
    let mut best = None;
    for y in 0..=max_y {
        for x in 0..=max_x {
            let score = K::score_at(image, plan, x, y);
            best = Peak::keep_best(best, Peak { x, y, score });
        }
    }
    Ok(best)
}

/// Scans every valid placement and returns all peaks in row-major order.
pub fn scan_all<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> PadMatchResult<Vec<Peak>> {
    let (max_x, max_y) = placement_range(image, plan)?;
    let mut peaks = Vec::with_capacity((max_x + 1) * (max_y + 1));
    for y in 0..=max_y {
        for x in 0..=max_x {
            let score = K::score_at(image, plan, x, y);
            peaks.push(Peak { x, y, score });
        }
    }
    Ok(peaks)
}

/// Scans placements with top-left in `[x0, x1] x [y0, y1]` (inclusive) and
/// returns the best one. Bounds are clamped to the valid placement range, so
/// a window past the edge still scores the nearest valid placement.
pub fn scan_roi<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    (x0, y0): (usize, usize),
    (x1, y1): (usize, usize),
) -> PadMatchResult<Option<Peak>> {
    let (max_x, max_y) = placement_range(image, plan)?;
    let x1 = x1.min(max_x);
    let y1 = y1.min(max_y);
    let x0 = x0.min(x1);
    let y0 = y0.min(y1);
    let mut best = None;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let score = K::score_at(image, plan, x, y);
            best = Peak::keep_best(best, Peak { x, y, score });
        }
    }
    Ok(best)
}

/// Keeps the strongest peaks that are farther than `radius` (Chebyshev)
/// from every stronger kept peak, at most `limit` of them.
pub fn nms_top(mut peaks: Vec<Peak>, radius: usize, limit: usize) -> Vec<Peak> {
    peaks.sort_by(Peak::cmp_desc);
    let mut kept: Vec<Peak> = Vec::with_capacity(limit.min(peaks.len()));
    'outer: for peak in peaks {
        if kept.len() >= limit {
            break;
        }
        for other in &kept {
            let dx = peak.x.abs_diff(other.x);
            let dy = peak.y.abs_diff(other.y);
            if dx.max(dy) <= radius {
                continue 'outer;
            }
        }
        kept.push(peak);
    }
    kept
}

/// Full placement scan with the fastest kernel compiled in.
pub(crate) fn all_peaks(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    parallel: bool,
) -> PadMatchResult<Vec<Peak>> {
    #[cfg(feature = "rayon")]
    if parallel {
        return self::rayon::scan_all_par::<Zncc>(image, plan);
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    scan_all::<Zncc>(image, plan)
}

/// ROI scan with the fastest kernel compiled in.
pub(crate) fn roi_peak(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    from: (usize, usize),
    to: (usize, usize),
) -> PadMatchResult<Option<Peak>> {
    scan_roi::<Zncc>(image, plan, from, to)
}

/// Best-peak scan with the fastest kernel compiled in.
///
/// `parallel` only has an effect with the `rayon` feature.
pub(crate) fn best_peak(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    parallel: bool,
) -> PadMatchResult<Option<Peak>> {
    #[cfg(feature = "rayon")]
    if parallel {
        return self::rayon::scan_best_par::<Zncc>(image, plan);
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    scan_best::<Zncc>(image, plan)
}

#[cfg(test)]
mod tests {
    use super::scalar::ZnccScalar;
    use super::{nms_top, scan_all, scan_best, scan_roi, score_from_stats, Peak, WindowStats};
    use crate::image::ImageView;
    use crate::template::TemplatePlan;

    fn noise(width: usize, height: usize) -> Vec<u8> {
        (0..(width * height) as u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
            .collect()
    }

    #[test]
    fn peak_ordering_prefers_score_then_position() {
        let a = Peak { x: 4, y: 1, score: 0.9 };
        let b = Peak { x: 0, y: 2, score: 0.9 };
        let c = Peak { x: 9, y: 9, score: 0.95 };
        assert_eq!(Peak::keep_best(Some(b), a), Some(a));
        assert_eq!(Peak::keep_best(Some(a), b), Some(a));
        assert_eq!(Peak::keep_best(Some(a), c), Some(c));
    }

    #[test]
    fn uniform_patches_score_by_intensity() {
        let data = [100u8; 4];
        let plan = TemplatePlan::from_view(ImageView::from_slice(&data, 2, 2).unwrap()).unwrap();
        let same = WindowStats {
            dot: 0.0,
            sum_i: 400,
            sum_i2: 4 * 100 * 100,
        };
        assert!((score_from_stats(&plan, same) - 1.0).abs() < 1e-6);

        let darker = WindowStats {
            dot: 0.0,
            sum_i: 4 * 49,
            sum_i2: 4 * 49 * 49,
        };
        assert!((score_from_stats(&plan, darker) - 0.8).abs() < 1e-6);

        let textured = WindowStats {
            dot: 0.0,
            sum_i: 400,
            sum_i2: 2 * 200 * 200,
        };
        assert_eq!(score_from_stats(&plan, textured), 0.0);
    }

    #[test]
    fn nms_keeps_separated_peaks_in_score_order() {
        let peaks = vec![
            Peak { x: 0, y: 0, score: 0.5 },
            Peak { x: 10, y: 10, score: 0.9 },
            Peak { x: 11, y: 9, score: 0.95 },
            Peak { x: 30, y: 2, score: 0.7 },
            Peak { x: 2, y: 1, score: 0.6 },
        ];
        let kept = nms_top(peaks.clone(), 2, 8);
        let coords: Vec<_> = kept.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(coords, vec![(11, 9), (30, 2), (2, 1)]);
        assert_eq!(nms_top(peaks.clone(), 2, 2).len(), 2);
        assert_eq!(nms_top(peaks, 0, 8).len(), 5);
    }

    #[test]
    fn roi_scan_agrees_with_full_scan_inside_its_window() {
        let data = noise(24, 18);
        let image = ImageView::from_slice(&data, 24, 18).unwrap();
        let tpl: Vec<u8> = (0..6)
            .flat_map(|y| image.row(5 + y).unwrap()[7..13].to_vec())
            .collect();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 6, 6).unwrap()).unwrap();

        let full = scan_best::<ZnccScalar>(image, &plan).unwrap().unwrap();
        let roi = scan_roi::<ZnccScalar>(image, &plan, (5, 3), (9, 7)).unwrap().unwrap();
        assert_eq!((roi.x, roi.y), (7, 5));
        assert!((roi.score - full.score).abs() < 1e-6);

        let all = scan_all::<ZnccScalar>(image, &plan).unwrap();
        assert_eq!(all.len(), 19 * 13);
        // Out-of-range bounds clamp to the last valid placement.
        let edge = scan_roi::<ZnccScalar>(image, &plan, (17, 11), (40, 40)).unwrap().unwrap();
        assert!((17..=18).contains(&edge.x) && (11..=12).contains(&edge.y));
        let past = scan_roi::<ZnccScalar>(image, &plan, (30, 30), (31, 31)).unwrap().unwrap();
        assert_eq!((past.x, past.y), (18, 12));
    }
}
