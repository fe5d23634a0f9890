//! Template matching at the canonical resolution.

use super::{Candidate, Method, Query};
use crate::image::ImageView;
use crate::kernel::best_peak;
use crate::template::{PadId, TemplateStore};
use crate::trace::{trace_event, trace_span};
use crate::util::PadMatchResult;

/// Best ZNCC score per template; the global best is a candidate when it
/// reaches `threshold`. Ties resolve to the smaller pad id.
pub fn detect(
    query: &Query,
    store: &TemplateStore,
    threshold: f32,
    parallel: bool,
) -> PadMatchResult<Option<Candidate>> {
    let _span = trace_span!("template_match", templates = store.len()).entered();
    let view = ImageView::from_gray(query.canonical())?;

    let mut best: Option<(PadId, f32)> = None;
    for record in store.records() {
        let Some(peak) = best_peak(view, record.plan(), parallel)? else {
            continue;
        };
        trace_event!("template_score", pad_id = record.pad_id(), score = peak.score);
        if best.map_or(true, |(_, score)| peak.score > score) {
            best = Some((record.pad_id(), peak.score));
        }
    }

    Ok(best
        .filter(|&(_, score)| score >= threshold)
        .map(|(pad_id, score)| Candidate {
            pad_id,
            confidence: score.clamp(0.0, 1.0),
            method: Method::Template,
        }))
}
