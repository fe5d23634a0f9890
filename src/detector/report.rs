//! Detection outcomes and per-call diagnostics.

use crate::fusion::PadScore;
use crate::strategy::{Method, Vote};
use crate::template::PadId;
use std::fmt;

/// How a detection call ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The enable gate was off; nothing ran.
    Disabled,
    /// The template store is empty.
    NoTemplates,
    /// The query could not be decoded or prepared.
    UnreadableImage(String),
    /// Strategies ran but nothing passed fusion (or the shape gate).
    NoDetection,
    /// A pad was identified.
    Detected(PadId),
}

impl Outcome {
    pub fn pad_id(&self) -> Option<PadId> {
        match self {
            Outcome::Detected(pad_id) => Some(*pad_id),
            _ => None,
        }
    }

    /// Stable lowercase tag for logs and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Disabled => "disabled",
            Outcome::NoTemplates => "no_templates",
            Outcome::UnreadableImage(_) => "unreadable_image",
            Outcome::NoDetection => "no_detection",
            Outcome::Detected(_) => "detected",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::UnreadableImage(reason) => write!(f, "unreadable image: {reason}"),
            Outcome::Detected(pad_id) => write!(f, "detected pad {pad_id}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Result of one strategy for one query.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodVote {
    pub method: Method,
    /// `None` when the strategy produced nothing or failed.
    pub vote: Option<Vote>,
    /// Error message when the strategy failed.
    pub error: Option<String>,
}

/// Diagnostics for one detection call.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionReport {
    pub outcome: Outcome,
    /// Threshold snapshot used for this call.
    pub confidence_threshold: f32,
    /// One entry per strategy that ran, in execution order.
    pub votes: Vec<MethodVote>,
    /// Ranked fusion table, best first.
    pub scores: Vec<PadScore>,
}

impl DetectionReport {
    pub(crate) fn early(outcome: Outcome, confidence_threshold: f32) -> Self {
        Self {
            outcome,
            confidence_threshold,
            votes: Vec::new(),
            scores: Vec::new(),
        }
    }

    pub fn pad_id(&self) -> Option<PadId> {
        self.outcome.pad_id()
    }

    /// Returns the vote cast by `method`, if it ran and voted.
    pub fn vote(&self, method: Method) -> Option<&Vote> {
        self.votes
            .iter()
            .find(|v| v.method == method)
            .and_then(|v| v.vote.as_ref())
    }
}
