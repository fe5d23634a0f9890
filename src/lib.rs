//! padmatch identifies Mission Pad ground markers in camera frames.
//!
//! Reference templates are loaded from a directory (one folder per pad) and
//! each query frame is checked by up to four independent strategies: ZNCC
//! template matching, ORB-style keypoint matching, a quadrilateral shape
//! check and multi-scale template matching. Their votes are fused into a
//! single pad id by averaging confidences and rewarding agreement between
//! methods.
//!
//! ```no_run
//! use padmatch::{DetectorConfig, PadDetector};
//!
//! let detector = PadDetector::new(DetectorConfig::with_root("templates"))?;
//! detector.set_confidence_threshold(0.6);
//! if let Some(pad_id) = detector.detect("frame.png") {
//!     println!("pad {pad_id}");
//! }
//! # Ok::<(), padmatch::PadMatchError>(())
//! ```
//!
//! Optional features: `rayon` runs strategies and ZNCC scans in parallel,
//! `simd` enables a `wide`-based correlation kernel, and `tracing` (on by
//! default) emits spans and events.

pub mod detector;
pub mod features;
pub mod fusion;
pub mod image;
pub mod kernel;
pub mod strategy;
pub mod template;
mod trace;
pub mod util;

pub use detector::{
    DetectionReport, DetectorConfig, DetectorSettings, MethodVote, Outcome, PadDetector,
    QueryImage,
};
pub use features::{FeatureSet, OrbConfig};
pub use fusion::{fuse, PadScore};
pub use image::ImageView;
pub use kernel::{Kernel, Peak};
pub use strategy::{
    Candidate, ContourConfig, FeatureMatchConfig, Method, MultiScaleConfig, ShapeEvidence, Vote,
};
pub use template::{
    PadId, ScaledTemplate, StoreConfig, TemplateInfo, TemplatePlan, TemplateRecord, TemplateStore,
};
pub use util::{PadMatchError, PadMatchResult};
