//! Reference templates: per-pad records, the directory-backed store and the
//! ZNCC plans built from them.

use crate::features::FeatureSet;
use image::GrayImage;
use std::path::{Path, PathBuf};

pub mod naming;
pub(crate) mod plan;
mod scaled;
mod store;

pub use plan::TemplatePlan;
pub use scaled::ScaledTemplate;
pub use store::{StoreConfig, TemplateStore};

/// Mission pad identifier (always positive).
pub type PadId = u32;

/// One reference template, normalized to the canonical resolution.
#[derive(Clone, Debug)]
pub struct TemplateRecord {
    pad_id: PadId,
    image: GrayImage,
    plan: TemplatePlan,
    scaled: Vec<ScaledTemplate>,
    features: Option<FeatureSet>,
    source_path: Option<PathBuf>,
    display_name: String,
}

impl TemplateRecord {
    /// Returns the pad id.
    pub fn pad_id(&self) -> PadId {
        self.pad_id
    }

    /// Returns the canonical grayscale image.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Returns the precomputed ZNCC plan.
    pub fn plan(&self) -> &TemplatePlan {
        &self.plan
    }

    /// Returns the precomputed scale pyramids, in configured scale order.
    pub fn scaled(&self) -> &[ScaledTemplate] {
        &self.scaled
    }

    /// Returns keypoints and descriptors, or `None` for textureless templates.
    pub fn features(&self) -> Option<&FeatureSet> {
        self.features.as_ref()
    }

    /// Returns the file the template was loaded from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Returns the human-readable name (folder name or file stem).
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Summarizes the record for diagnostics.
    pub fn info(&self) -> TemplateInfo {
        TemplateInfo {
            pad_id: self.pad_id,
            display_name: self.display_name.clone(),
            source_path: self.source_path.clone(),
            width: self.image.width(),
            height: self.image.height(),
            keypoints: self.features.as_ref().map_or(0, FeatureSet::len),
            flat: self.plan.is_flat(),
        }
    }
}

/// Diagnostic metadata for a loaded template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateInfo {
    pub pad_id: PadId,
    pub display_name: String,
    pub source_path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    /// Number of keypoints; 0 means the feature strategy skips this template.
    pub keypoints: usize,
    /// True when the template has no usable contrast.
    pub flat: bool,
}
