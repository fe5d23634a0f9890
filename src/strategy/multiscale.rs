//! Template matching over precomputed template scales.
//!
//! Each scaled template is searched coarse-to-fine: a full scan at the
//! coarsest pyramid level both images share, non-maximum suppression down to
//! a small beam, then a local ROI search at every finer level with positions
//! doubled on the way down. Scales whose template does not fit the
//! size-limited query are skipped without touching pixels.

use super::{Candidate, Method, Query};
use crate::image::io::limit_longer_side;
use crate::image::pyramid::ImagePyramid;
use crate::image::ImageView;
use crate::kernel::{all_peaks, nms_top, roi_peak, Peak};
use crate::template::{PadId, ScaledTemplate, TemplatePlan, TemplateStore};
use crate::trace::{trace_event, trace_span};
use crate::util::PadMatchResult;
use image::GrayImage;

/// Multi-scale matching parameters. The scale set itself belongs to the
/// template store, which precomputes one pyramid per scale.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiScaleConfig {
    /// The query's longer side is reduced to this before matching (0 keeps
    /// the native size).
    pub max_query_side: u32,
    /// Candidates kept after the coarse scan.
    pub beam_width: usize,
    /// Chebyshev radius for coarse non-maximum suppression.
    pub nms_radius: usize,
    /// Search radius (pixels) around each candidate at finer levels.
    pub refine_radius: usize,
}

impl Default for MultiScaleConfig {
    fn default() -> Self {
        Self {
            max_query_side: 400,
            beam_width: 4,
            nms_radius: 2,
            refine_radius: 2,
        }
    }
}

/// Best score over all (template, scale) pairs.
pub fn detect(
    query: &Query,
    store: &TemplateStore,
    cfg: &MultiScaleConfig,
    threshold: f32,
    parallel: bool,
) -> PadMatchResult<Option<Candidate>> {
    let _span = trace_span!("multiscale_match", templates = store.len()).entered();
    let image = limit_longer_side(query.gray(), cfg.max_query_side)?;
    let depth = store
        .records()
        .flat_map(|record| record.scaled())
        .map(ScaledTemplate::num_levels)
        .max()
        .unwrap_or(1);
    let pyramid = ImagePyramid::build(&image, depth);

    let mut best: Option<(PadId, f32)> = None;
    for record in store.records() {
        for scaled in record.scaled() {
            let Some(peak) = search_scaled(&pyramid, scaled, cfg, parallel)? else {
                continue;
            };
            if best.map_or(true, |(_, score)| peak.score > score) {
                best = Some((record.pad_id(), peak.score));
            }
        }
    }

    if let Some((pad_id, score)) = best {
        trace_event!("multiscale_best", pad_id = pad_id, score = score);
    }
    Ok(best
        .filter(|&(_, score)| score >= threshold)
        .map(|(pad_id, score)| Candidate {
            pad_id,
            confidence: score.clamp(0.0, 1.0),
            method: Method::MultiScale,
        }))
}

/// Coarse-to-fine search of one scaled template; returns the best
/// full-resolution peak, or `None` when the template is larger than the
/// query.
pub(crate) fn search_scaled(
    pyramid: &ImagePyramid,
    scaled: &ScaledTemplate,
    cfg: &MultiScaleConfig,
    parallel: bool,
) -> PadMatchResult<Option<Peak>> {
    let Some((base, base_plan)) = level_pair(pyramid, scaled, 0) else {
        return Ok(None);
    };
    if !fits(base, base_plan) {
        return Ok(None);
    }

    // Coarser levels of a fitting template always fit too.
    let coarse = scaled.num_levels().min(pyramid.len()).saturating_sub(1);
    let Some((image, plan)) = level_pair(pyramid, scaled, coarse) else {
        return Ok(None);
    };
    let peaks = all_peaks(ImageView::from_gray(image)?, plan, parallel)?;
    let mut beam = nms_top(peaks, cfg.nms_radius, cfg.beam_width.max(1));
    trace_event!("multiscale_coarse", level = coarse, beam = beam.len());

    for level in (0..coarse).rev() {
        let Some((image, plan)) = level_pair(pyramid, scaled, level) else {
            return Ok(None);
        };
        let view = ImageView::from_gray(image)?;
        let radius = cfg.refine_radius;
        let mut refined = Vec::with_capacity(beam.len());
        for peak in &beam {
            let x = peak.x.saturating_mul(2);
            let y = peak.y.saturating_mul(2);
            let from = (x.saturating_sub(radius), y.saturating_sub(radius));
            let to = (x.saturating_add(radius), y.saturating_add(radius));
            if let Some(found) = roi_peak(view, plan, from, to)? {
                refined.push(found);
            }
        }
        let len = refined.len();
        beam = nms_top(refined, 0, len);
    }

    Ok(beam.first().copied())
}

fn level_pair<'a>(
    pyramid: &'a ImagePyramid,
    scaled: &'a ScaledTemplate,
    level: usize,
) -> Option<(&'a GrayImage, &'a TemplatePlan)> {
    Some((pyramid.level(level)?, scaled.plan(level)?))
}

fn fits(image: &GrayImage, plan: &TemplatePlan) -> bool {
    plan.width() <= image.width() as usize && plan.height() <= image.height() as usize
}
