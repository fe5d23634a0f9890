//! Rayon-parallel scan (feature-gated).
//!
//! Parallelizes the placement scan over rows; each row reduces to its own
//! best peak (or its own peak list) and rows are merged in row order, so both
//! paths return the same result as the sequential scan.

use crate::image::ImageView;
use crate::kernel::{placement_range, Kernel, Peak};
use crate::template::TemplatePlan;
use crate::util::PadMatchResult;
use rayon::prelude::*;

/// Row-parallel full scan returning the best peak.
pub fn scan_best_par<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> PadMatchResult<Option<Peak>> {
    let (max_x, max_y) = placement_range(image, plan)?;

    let row_best: Vec<Option<Peak>> = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            let mut best = None;
            for x in 0..=max_x {
                let score = K::score_at(image, plan, x, y);
                best = Peak::keep_best(best, Peak { x, y, score });
            }
            best
        })
        .collect();

    Ok(row_best
        .into_iter()
        .flatten()
        .fold(None, Peak::keep_best))
}

/// Row-parallel full scan returning every peak in row-major order.
pub fn scan_all_par<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> PadMatchResult<Vec<Peak>> {
    let (max_x, max_y) = placement_range(image, plan)?;

    let rows: Vec<Vec<Peak>> = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            (0..=max_x)
                .map(|x| Peak {
                    x,
                    y,
                    score: K::score_at(image, plan, x, y),
                })
                .collect()
        })
        .collect();

    Ok(rows.into_iter().flatten().collect())
}
