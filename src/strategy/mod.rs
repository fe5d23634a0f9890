//! Detection strategies.
//!
//! The strategy set is closed: [`Method`] enumerates the four detectors and
//! dispatches each one through the same "query → optional vote" contract.
//! Every strategy reads only the immutable template store and the prepared
//! query, so they can run in any order or concurrently.

use crate::image::io::to_canonical;
use crate::template::{PadId, TemplateStore};
use crate::util::PadMatchResult;
use image::GrayImage;
use std::fmt;

pub mod contour;
pub mod feature;
pub mod multiscale;
pub mod template;

pub use contour::{ContourConfig, ShapeEvidence};
pub use feature::FeatureMatchConfig;
pub use multiscale::MultiScaleConfig;

/// Detection strategy kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// Sliding-window ZNCC at the canonical resolution.
    Template,
    /// ORB-style keypoint matching.
    Feature,
    /// Convex quadrilateral presence check.
    Contour,
    /// ZNCC over a fixed set of template scales.
    MultiScale,
}

impl Method {
    /// All strategies in their default execution order.
    pub const ALL: [Method; 4] = [
        Method::Template,
        Method::Feature,
        Method::Contour,
        Method::MultiScale,
    ];

    /// Stable lowercase name used in reports and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Template => "template",
            Method::Feature => "feature",
            Method::Contour => "contour",
            Method::MultiScale => "multiscale",
        }
    }

    /// Parses the name produced by [`Method::as_str`].
    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Runs this strategy against a prepared query.
    pub fn run(
        self,
        query: &Query,
        store: &TemplateStore,
        params: &StrategyParams<'_>,
    ) -> PadMatchResult<Option<Vote>> {
        let vote = match self {
            Method::Template => {
                template::detect(query, store, params.threshold, params.parallel)?
                    .map(Vote::Pad)
            }
            Method::Feature => feature::detect(query, store, params.feature)?.map(Vote::Pad),
            Method::Contour => contour::detect(query, params.contour)?.map(Vote::Shape),
            Method::MultiScale => multiscale::detect(
                query,
                store,
                params.multiscale,
                params.threshold,
                params.parallel,
            )?
            .map(Vote::Pad),
        };
        Ok(vote)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pad identity claim from one strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub pad_id: PadId,
    /// Strategy-specific confidence in `[0, 1]`.
    pub confidence: f32,
    pub method: Method,
}

/// What a strategy contributes for one query.
#[derive(Clone, Debug, PartialEq)]
pub enum Vote {
    /// Identity claim that takes part in fusion.
    Pad(Candidate),
    /// Shape-only evidence; carries no pad identity.
    Shape(ShapeEvidence),
}

impl Vote {
    /// Returns the identity claim, if this vote carries one.
    pub fn candidate(&self) -> Option<Candidate> {
        match self {
            Vote::Pad(candidate) => Some(*candidate),
            Vote::Shape(_) => None,
        }
    }

    /// Returns the confidence regardless of vote kind.
    pub fn confidence(&self) -> f32 {
        match self {
            Vote::Pad(candidate) => candidate.confidence,
            Vote::Shape(shape) => shape.confidence,
        }
    }
}

/// Per-call parameters shared by all strategies.
#[derive(Clone, Copy, Debug)]
pub struct StrategyParams<'a> {
    /// Minimum ZNCC score for the template and multi-scale strategies.
    pub threshold: f32,
    pub feature: &'a FeatureMatchConfig,
    pub contour: &'a ContourConfig,
    pub multiscale: &'a MultiScaleConfig,
    /// Use row-parallel scans when the `rayon` feature is enabled.
    pub parallel: bool,
}

/// Query image prepared once per detection call.
#[derive(Clone, Debug)]
pub struct Query {
    gray: GrayImage,
    canonical: GrayImage,
}

impl Query {
    /// Prepares a grayscale query, including its canonical-size copy.
    pub fn new(gray: GrayImage, canonical_size: u32) -> PadMatchResult<Self> {
        let canonical = to_canonical(&gray, canonical_size)?;
        Ok(Self { gray, canonical })
    }

    /// Returns the query at its native resolution.
    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Returns the query resized to the template resolution.
    pub fn canonical(&self) -> &GrayImage {
        &self.canonical
    }
}

#[cfg(test)]
mod tests {
    use super::Method;

    #[test]
    fn method_names_round_trip() {
        for method in Method::ALL {
            assert_eq!(Method::from_name(method.as_str()), Some(method));
        }
        assert_eq!(Method::from_name(" MultiScale "), Some(Method::MultiScale));
        assert_eq!(Method::from_name("sift"), None);
    }
}
