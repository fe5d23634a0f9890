//! Fusion of per-strategy candidates into a single pad decision.
//!
//! Candidates are grouped by pad id. Each group scores its mean confidence
//! plus a bonus per distinct method that voted for it, so agreement between
//! strategies outranks a single confident vote. Groups are ranked by final
//! score, then by method count, then by ascending pad id.

use crate::strategy::{Candidate, Method};
use crate::template::PadId;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Scores closer than this are treated as equal.
const SCORE_EPS: f32 = 1e-6;

/// Default bonus added per distinct agreeing method.
pub const DEFAULT_METHOD_BONUS: f32 = 0.1;

/// Fused score of one pad.
#[derive(Clone, Debug, PartialEq)]
pub struct PadScore {
    pub pad_id: PadId,
    /// Mean confidence over this pad's candidates.
    pub avg_confidence: f32,
    /// Distinct methods that voted for this pad, in method order.
    pub methods: Vec<Method>,
    /// `avg_confidence + method_bonus * methods.len()`.
    pub final_score: f32,
}

impl PadScore {
    /// Number of distinct agreeing methods.
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    fn cmp_rank(&self, other: &Self) -> Ordering {
        let by_score = if (self.final_score - other.final_score).abs() <= SCORE_EPS {
            Ordering::Equal
        } else {
            other.final_score.total_cmp(&self.final_score)
        };
        by_score
            .then_with(|| other.methods.len().cmp(&self.methods.len()))
            .then_with(|| self.pad_id.cmp(&other.pad_id))
    }
}

/// Groups candidates by pad and returns the ranked score table, best first.
pub fn fuse(candidates: &[Candidate], method_bonus: f32) -> Vec<PadScore> {
    let mut groups: BTreeMap<PadId, (f32, usize, BTreeSet<Method>)> = BTreeMap::new();
    for candidate in candidates {
        let entry = groups
            .entry(candidate.pad_id)
            .or_insert_with(|| (0.0, 0, BTreeSet::new()));
        entry.0 += candidate.confidence;
        entry.1 += 1;
        entry.2.insert(candidate.method);
    }

    let mut pending: Vec<PadScore> = groups
        .into_iter()
        .map(|(pad_id, (sum, count, methods))| {
            let avg_confidence = sum / count as f32;
            let methods: Vec<Method> = methods.into_iter().collect();
            let final_score = avg_confidence + method_bonus * methods.len() as f32;
            PadScore {
                pad_id,
                avg_confidence,
                methods,
                final_score,
            }
        })
        .collect();

    // The epsilon comparison is not transitive, so rank by repeated
    // selection instead of handing it to a sort.
    let mut table = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let mut best = 0;
        for i in 1..pending.len() {
            if pending[i].cmp_rank(&pending[best]) == Ordering::Less {
                best = i;
            }
        }
        table.push(pending.remove(best));
    }
    table
}

/// Returns the winning pad of a ranked table, if any.
pub fn winner(table: &[PadScore]) -> Option<PadId> {
    table.first().map(|score| score.pad_id)
}
