//! Detector configuration and the runtime-adjustable settings snapshot.
//!
//! [`DetectorConfig`] is fixed at construction; [`DetectorSettings`] holds the
//! enable gate and confidence threshold that may change while detections run.

use crate::fusion::DEFAULT_METHOD_BONUS;
use crate::strategy::{ContourConfig, FeatureMatchConfig, Method, MultiScaleConfig};
use crate::template::StoreConfig;
use std::path::PathBuf;

/// Construction-time configuration for [`PadDetector`](super::PadDetector).
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Template root directory; `None` starts with an empty store.
    pub template_root: Option<PathBuf>,
    /// Template loading parameters.
    pub store: StoreConfig,
    /// Initial value of the enable gate.
    pub enabled: bool,
    /// Initial confidence threshold, clamped to `[0, 1]`.
    pub confidence_threshold: f32,
    /// Strategies to run, in order. Duplicates run once.
    pub methods: Vec<Method>,
    pub feature: FeatureMatchConfig,
    pub contour: ContourConfig,
    pub multiscale: MultiScaleConfig,
    /// Fusion bonus per distinct agreeing method.
    pub method_bonus: f32,
    /// Suppress a fused decision unless the contour check found a quad.
    pub require_pad_shape: bool,
    /// Run strategies and ZNCC scans in parallel (needs the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            template_root: None,
            store: StoreConfig::default(),
            enabled: true,
            confidence_threshold: 0.7,
            methods: Method::ALL.to_vec(),
            feature: FeatureMatchConfig::default(),
            contour: ContourConfig::default(),
            multiscale: MultiScaleConfig::default(),
            method_bonus: DEFAULT_METHOD_BONUS,
            require_pad_shape: false,
            parallel: false,
        }
    }
}

impl DetectorConfig {
    /// Default configuration loading templates from `root`.
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            template_root: Some(root.into()),
            ..Self::default()
        }
    }
}

/// Runtime-adjustable settings, read as one snapshot per detection call.
///
/// Meant for a single writer (the control loop); readers never observe a
/// half-applied update because the whole struct is swapped under the lock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorSettings {
    pub enabled: bool,
    confidence_threshold: f32,
}

impl DetectorSettings {
    pub fn new(enabled: bool, confidence_threshold: f32) -> Self {
        Self {
            enabled,
            confidence_threshold: clamp_threshold(confidence_threshold),
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Stores `value` clamped to `[0, 1]` (NaN becomes 0) and returns it.
    pub fn set_confidence_threshold(&mut self, value: f32) -> f32 {
        self.confidence_threshold = clamp_threshold(value);
        self.confidence_threshold
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::new(true, 0.7)
    }
}

fn clamp_threshold(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::DetectorSettings;

    #[test]
    fn threshold_is_clamped() {
        let mut settings = DetectorSettings::default();
        assert_eq!(settings.set_confidence_threshold(1.5), 1.0);
        assert_eq!(settings.set_confidence_threshold(-0.2), 0.0);
        assert_eq!(settings.set_confidence_threshold(f32::NAN), 0.0);
        assert_eq!(settings.set_confidence_threshold(0.45), 0.45);
        assert_eq!(DetectorSettings::new(false, 7.0).confidence_threshold(), 1.0);
    }
}
