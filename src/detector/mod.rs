//! Detector facade: strategy orchestration, fusion and runtime controls.
//!
//! [`PadDetector`] owns the shared template store and the runtime settings.
//! Every call snapshots both at entry, so a concurrent threshold change or a
//! template reload never affects a detection already in flight. Failures in
//! a single strategy or an unreadable query degrade to "no detection"; no
//! error escapes [`PadDetector::detect`].

mod config;
mod report;

pub use config::{DetectorConfig, DetectorSettings};
pub use report::{DetectionReport, MethodVote, Outcome};

use crate::fusion::{fuse, winner};
use crate::image::io::{decode_gray_image, gray_from_dynamic, load_gray_image};
use crate::strategy::{Method, Query, StrategyParams, Vote};
use crate::template::{PadId, TemplateInfo, TemplateStore};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{PadMatchError, PadMatchResult};
use image::{DynamicImage, GrayImage};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Query image accepted by the detector.
#[derive(Clone, Copy, Debug)]
pub enum QueryImage<'a> {
    /// Encoded image on disk.
    Path(&'a Path),
    /// Decoded image of any color type.
    Dynamic(&'a DynamicImage),
    /// Decoded 8-bit grayscale image.
    Gray(&'a GrayImage),
    /// Encoded image bytes (png, jpeg, bmp) already in memory.
    Encoded(&'a [u8]),
}

impl QueryImage<'_> {
    fn to_gray(self) -> PadMatchResult<GrayImage> {
        match self {
            QueryImage::Path(path) => load_gray_image(path),
            QueryImage::Dynamic(img) => gray_from_dynamic(img),
            QueryImage::Encoded(bytes) => decode_gray_image(bytes),
            QueryImage::Gray(img) => {
                if img.width() == 0 || img.height() == 0 {
                    return Err(PadMatchError::InvalidDimensions {
                        width: img.width() as usize,
                        height: img.height() as usize,
                    });
                }
                Ok(img.clone())
            }
        }
    }
}

impl<'a> From<&'a Path> for QueryImage<'a> {
    fn from(path: &'a Path) -> Self {
        QueryImage::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for QueryImage<'a> {
    fn from(path: &'a PathBuf) -> Self {
        QueryImage::Path(path.as_path())
    }
}

impl<'a> From<&'a str> for QueryImage<'a> {
    fn from(path: &'a str) -> Self {
        QueryImage::Path(Path::new(path))
    }
}

impl<'a> From<&'a DynamicImage> for QueryImage<'a> {
    fn from(img: &'a DynamicImage) -> Self {
        QueryImage::Dynamic(img)
    }
}

impl<'a> From<&'a GrayImage> for QueryImage<'a> {
    fn from(img: &'a GrayImage) -> Self {
        QueryImage::Gray(img)
    }
}

impl<'a> From<&'a [u8]> for QueryImage<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        QueryImage::Encoded(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for QueryImage<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        QueryImage::Encoded(bytes.as_slice())
    }
}

/// Mission pad detector.
///
/// `PadDetector` is `Send + Sync`; share it behind an `Arc` to detect from
/// several threads while a control thread adjusts settings.
#[derive(Debug)]
pub struct PadDetector {
    cfg: DetectorConfig,
    methods: Vec<Method>,
    settings: Arc<RwLock<DetectorSettings>>,
    store: RwLock<Arc<TemplateStore>>,
}

impl PadDetector {
    /// Builds a detector, loading templates from `cfg.template_root`.
    ///
    /// A missing or empty root is not an error: the detector starts with an
    /// empty store and reports [`Outcome::NoTemplates`].
    pub fn new(cfg: DetectorConfig) -> PadMatchResult<Self> {
        let store = load_store(&cfg)?;
        Ok(Self::with_store(cfg, store))
    }

    /// Builds a detector around an existing store.
    ///
    /// `cfg.template_root` is only used by later reloads.
    pub fn with_store(cfg: DetectorConfig, store: TemplateStore) -> Self {
        let mut methods = Vec::with_capacity(cfg.methods.len());
        for &method in &cfg.methods {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        let settings = DetectorSettings::new(cfg.enabled, cfg.confidence_threshold);
        Self {
            cfg,
            methods,
            settings: Arc::new(RwLock::new(settings)),
            store: RwLock::new(Arc::new(store)),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    /// Strategies run per call, in order.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn enable(&self) {
        self.update_settings(|s| s.enabled = true);
    }

    pub fn disable(&self) {
        self.update_settings(|s| s.enabled = false);
    }

    pub fn is_enabled(&self) -> bool {
        self.settings().enabled
    }

    /// Sets the threshold clamped to `[0, 1]` and returns the stored value.
    pub fn set_confidence_threshold(&self, value: f32) -> f32 {
        let mut stored = 0.0;
        self.update_settings(|s| stored = s.set_confidence_threshold(value));
        stored
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.settings().confidence_threshold()
    }

    /// Consistent snapshot of the current settings.
    pub fn settings(&self) -> DetectorSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared handle to the runtime settings.
    ///
    /// Intended for a single writer; detection calls only read it.
    pub fn settings_handle(&self) -> Arc<RwLock<DetectorSettings>> {
        Arc::clone(&self.settings)
    }

    /// Current template store. Stays valid across reloads.
    pub fn store(&self) -> Arc<TemplateStore> {
        Arc::clone(&self.store.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Summary of every loaded template, ordered by pad id.
    pub fn template_info(&self) -> BTreeMap<PadId, TemplateInfo> {
        self.store().info()
    }

    /// Rebuilds the store from the configured root and swaps it in.
    ///
    /// Calls already running keep the previous store. Returns the number of
    /// templates now loaded.
    pub fn reload_templates(&self) -> PadMatchResult<usize> {
        let store = load_store(&self.cfg)?;
        let count = store.len();
        self.replace_store(store);
        Ok(count)
    }

    /// Atomically replaces the template store.
    pub fn replace_store(&self, store: TemplateStore) {
        let store = Arc::new(store);
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = store;
    }

    /// Identifies the pad in `image`, if any.
    pub fn detect<'a, Q: Into<QueryImage<'a>>>(&self, image: Q) -> Option<PadId> {
        self.report(image).pad_id()
    }

    /// Runs detection and returns the full diagnostics.
    pub fn report<'a, Q: Into<QueryImage<'a>>>(&self, image: Q) -> DetectionReport {
        let settings = self.settings();
        let threshold = settings.confidence_threshold();
        if !settings.enabled {
            return DetectionReport::early(Outcome::Disabled, threshold);
        }
        let store = self.store();
        if store.is_empty() {
            return DetectionReport::early(Outcome::NoTemplates, threshold);
        }

        let _span = trace_span!("detect", threshold = threshold).entered();
        let image: QueryImage<'_> = image.into();
        let query = match image
            .to_gray()
            .and_then(|gray| Query::new(gray, store.config().canonical_size))
        {
            Ok(query) => query,
            Err(err) => {
                trace_warn!("query image unusable: {err}");
                let outcome = Outcome::UnreadableImage(err.to_string());
                return DetectionReport::early(outcome, threshold);
            }
        };

        let params = StrategyParams {
            threshold,
            feature: &self.cfg.feature,
            contour: &self.cfg.contour,
            multiscale: &self.cfg.multiscale,
            parallel: self.cfg.parallel,
        };
        let votes = self.run_methods(&query, &store, &params);

        let candidates: Vec<_> = votes
            .iter()
            .filter_map(|v| v.vote.as_ref().and_then(Vote::candidate))
            .collect();
        let scores = fuse(&candidates, self.cfg.method_bonus);
        let shape_found = votes
            .iter()
            .any(|v| matches!(v.vote, Some(Vote::Shape(_))));

        let outcome = match winner(&scores) {
            Some(_) if self.cfg.require_pad_shape && !shape_found => {
                trace_event!("shape_gate_rejected");
                Outcome::NoDetection
            }
            Some(pad_id) => Outcome::Detected(pad_id),
            None => Outcome::NoDetection,
        };
        trace_event!(
            "detect_done",
            candidates = candidates.len(),
            pad_id = outcome.pad_id().unwrap_or(0)
        );

        DetectionReport {
            outcome,
            confidence_threshold: threshold,
            votes,
            scores,
        }
    }

    /// Runs [`PadDetector::report`] on every image in `dir`, sorted by path.
    ///
    /// Only files with an extension accepted by the store configuration are
    /// visited. Intended for offline checks and tests.
    pub fn detect_dir<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> PadMatchResult<Vec<(PathBuf, DetectionReport)>> {
        let dir = dir.as_ref();
        let read = fs::read_dir(dir).map_err(|err| PadMatchError::ImageIo {
            path: Some(dir.to_path_buf()),
            reason: err.to_string(),
        })?;
        let mut paths: Vec<PathBuf> = read
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.cfg.store.accepts(p))
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let report = self.report(path.as_path());
                (path, report)
            })
            .collect())
    }

    fn run_methods(
        &self,
        query: &Query,
        store: &TemplateStore,
        params: &StrategyParams<'_>,
    ) -> Vec<MethodVote> {
        let run = |method: Method| run_one(method, query, store, params);

        #[cfg(feature = "rayon")]
        {
            if self.cfg.parallel {
                return self.methods.par_iter().map(|&m| run(m)).collect();
            }
        }
        self.methods.iter().map(|&m| run(m)).collect()
    }

    fn update_settings(&self, apply: impl FnOnce(&mut DetectorSettings)) {
        let mut guard = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard);
    }
}

fn run_one(
    method: Method,
    query: &Query,
    store: &TemplateStore,
    params: &StrategyParams<'_>,
) -> MethodVote {
    match method.run(query, store, params) {
        Ok(vote) => {
            if let Some(vote) = &vote {
                trace_event!("vote", method = method.as_str(), confidence = vote.confidence());
            }
            MethodVote {
                method,
                vote,
                error: None,
            }
        }
        Err(err) => {
            trace_warn!("{method} strategy failed: {err}");
            MethodVote {
                method,
                vote: None,
                error: Some(err.to_string()),
            }
        }
    }
}

fn load_store(cfg: &DetectorConfig) -> PadMatchResult<TemplateStore> {
    match &cfg.template_root {
        Some(root) => TemplateStore::load(root, cfg.store.clone()),
        None => {
            trace_warn!("no template root configured; starting with an empty store");
            Ok(TemplateStore::empty(cfg.store.clone()))
        }
    }
}
