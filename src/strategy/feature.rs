//! Keypoint matching against each template's precomputed descriptors.

use super::{Candidate, Method, Query};
use crate::features::{extract_features, match_features, MatchStats};
use crate::template::{PadId, TemplateStore};
use crate::trace::{trace_event, trace_span};
use crate::util::PadMatchResult;
use std::cmp::Ordering;

/// Feature matching parameters.
///
/// The good-match ratio is not comparable to a correlation score, so this
/// strategy keeps its own acceptance bar instead of the global threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatchConfig {
    /// Hamming distance below which a match counts as good.
    pub max_distance: u32,
    /// Minimum absolute number of good matches.
    pub min_good_matches: usize,
    /// Minimum good/total ratio for a candidate.
    pub min_score: f32,
}

impl Default for FeatureMatchConfig {
    fn default() -> Self {
        Self {
            max_distance: 50,
            min_good_matches: 10,
            min_score: 0.3,
        }
    }
}

/// Ranks by ratio, then lower mean distance, then more good matches.
/// Earlier (smaller) pad ids win exact ties.
fn better(a: &MatchStats, b: &MatchStats) -> bool {
    let ord = a
        .ratio()
        .total_cmp(&b.ratio())
        .then_with(|| b.mean_good_distance.total_cmp(&a.mean_good_distance))
        .then_with(|| a.good.cmp(&b.good));
    ord == Ordering::Greater
}

/// Matches query descriptors against every template with descriptors.
pub fn detect(
    query: &Query,
    store: &TemplateStore,
    cfg: &FeatureMatchConfig,
) -> PadMatchResult<Option<Candidate>> {
    let _span = trace_span!("feature_match", templates = store.len()).entered();
    let Some(query_features) = extract_features(query.canonical(), &store.config().orb) else {
        trace_event!("feature_query_textureless");
        return Ok(None);
    };

    let mut best: Option<(PadId, MatchStats)> = None;
    for record in store.records() {
        let Some(train) = record.features() else {
            continue;
        };
        let stats = match_features(&query_features, train, cfg.max_distance);
        if stats.good < cfg.min_good_matches {
            continue;
        }
        trace_event!(
            "feature_score",
            pad_id = record.pad_id(),
            good = stats.good,
            total = stats.total
        );
        if best.as_ref().map_or(true, |(_, current)| better(&stats, current)) {
            best = Some((record.pad_id(), stats));
        }
    }

    Ok(best
        .map(|(pad_id, stats)| (pad_id, stats.ratio()))
        .filter(|&(_, score)| score >= cfg.min_score)
        .map(|(pad_id, score)| Candidate {
            pad_id,
            confidence: score.clamp(0.0, 1.0),
            method: Method::Feature,
        }))
}

#[cfg(test)]
mod tests {
    use super::better;
    use crate::features::MatchStats;

    fn stats(total: usize, good: usize, mean: f32) -> MatchStats {
        MatchStats {
            total,
            good,
            mean_good_distance: mean,
        }
    }

    #[test]
    fn ranking_uses_ratio_then_distance_then_count() {
        assert!(better(&stats(10, 8, 20.0), &stats(10, 7, 1.0)));
        assert!(better(&stats(10, 8, 5.0), &stats(10, 8, 6.0)));
        assert!(better(&stats(20, 16, 5.0), &stats(10, 8, 5.0)));
        assert!(!better(&stats(10, 8, 5.0), &stats(10, 8, 5.0)));
    }
}
