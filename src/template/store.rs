//! Directory-backed template store.
//!
//! Layout: the root holds one subfolder per pad whose name embeds the pad id
//! (`number_3`, `pad7`), each containing one or more images; the first image
//! that decodes (sorted by file name) becomes the template. Image files placed
//! directly in the root take their id from the file stem. Anything that cannot
//! be parsed or decoded is skipped with a warning; a missing or empty root
//! yields an empty store.

use super::naming::parse_pad_id;
use super::scaled::build_scaled;
use super::{PadId, TemplateInfo, TemplatePlan, TemplateRecord};
use crate::features::{extract_features, OrbConfig};
use crate::image::io::{load_gray_image, to_canonical};
use crate::image::ImageView;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{PadMatchError, PadMatchResult};
use image::GrayImage;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for building a template store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// Side length every template is resized to.
    pub canonical_size: u32,
    /// Accepted file extensions (compared case-insensitively).
    pub extensions: Vec<String>,
    /// Feature extraction parameters, shared with query extraction.
    pub orb: OrbConfig,
    /// Scale factors precomputed for multi-scale matching.
    pub scales: Vec<f32>,
    /// Scaled templates with a larger side are not built (0 disables the
    /// limit).
    pub max_scaled_side: u32,
    /// Scaled template pyramids stop before a level side drops below this
    /// (0 keeps a single level).
    pub pyramid_min_side: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            canonical_size: 200,
            extensions: ["png", "jpg", "jpeg", "bmp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            orb: OrbConfig::default(),
            scales: vec![0.5, 0.75, 1.0, 1.25, 1.5, 2.0],
            max_scaled_side: 400,
            pyramid_min_side: 16,
        }
    }
}

impl StoreConfig {
    pub(crate) fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Immutable set of templates keyed by pad id.
#[derive(Clone, Debug)]
pub struct TemplateStore {
    records: BTreeMap<PadId, TemplateRecord>,
    cfg: StoreConfig,
    root: Option<PathBuf>,
}

impl TemplateStore {
    /// Creates a store without templates.
    pub fn empty(cfg: StoreConfig) -> Self {
        Self {
            records: BTreeMap::new(),
            cfg,
            root: None,
        }
    }

    /// Loads every template found under `root`.
    ///
    /// Only an invalid configuration is an error; an unreadable root or bad
    /// files produce warnings and a smaller (possibly empty) store.
    pub fn load<P: AsRef<Path>>(root: P, cfg: StoreConfig) -> PadMatchResult<Self> {
        validate(&cfg)?;
        let root = root.as_ref();
        let _span = trace_span!("load_templates", root = %root.display()).entered();

        let mut store = Self::empty(cfg);
        store.root = Some(root.to_path_buf());
        let entries = match sorted_entries(root) {
            Ok(entries) => entries,
            Err(err) => {
                trace_warn!("{err}; continuing with an empty template store");
                return Ok(store);
            }
        };

        for path in entries {
            if path.is_dir() {
                store.load_folder(&path);
            } else if store.cfg.accepts(&path) {
                store.load_loose_file(&path);
            }
        }

        if store.is_empty() {
            trace_warn!(
                "no templates found under {}; detection will report nothing",
                root.display()
            );
        }
        trace_event!("templates_loaded", count = store.len());
        Ok(store)
    }

    /// Builds a store from in-memory images.
    ///
    /// Zero ids and duplicates are skipped with a warning, like on disk.
    pub fn from_images<I, S>(images: I, cfg: StoreConfig) -> PadMatchResult<Self>
    where
        I: IntoIterator<Item = (PadId, S, GrayImage)>,
        S: Into<String>,
    {
        validate(&cfg)?;
        let mut store = Self::empty(cfg);
        for (pad_id, name, img) in images {
            if pad_id == 0 {
                trace_warn!("skipping template with pad id 0");
                continue;
            }
            if let Err(err) = store.insert(pad_id, name.into(), None, &img) {
                trace_warn!("skipping template for pad {pad_id}: {err}");
            }
        }
        Ok(store)
    }

    /// Returns the template for a pad id.
    pub fn get(&self, pad_id: PadId) -> Option<&TemplateRecord> {
        self.records.get(&pad_id)
    }

    /// Iterates records in ascending pad id order.
    pub fn records(&self) -> impl Iterator<Item = &TemplateRecord> + '_ {
        self.records.values()
    }

    /// Returns the loaded pad ids in ascending order.
    pub fn pad_ids(&self) -> Vec<PadId> {
        self.records.keys().copied().collect()
    }

    /// Returns the number of templates.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no template was loaded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the configuration the store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// Returns the directory the store was loaded from, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Returns per-pad diagnostic metadata.
    pub fn info(&self) -> BTreeMap<PadId, TemplateInfo> {
        self.records
            .iter()
            .map(|(&id, record)| (id, record.info()))
            .collect()
    }

    fn load_folder(&mut self, dir: &Path) {
        let name = file_name(dir);
        let Some(pad_id) = parse_pad_id(&name) else {
            trace_warn!("skipping folder {}: no pad id in its name", dir.display());
            return;
        };
        if self.records.contains_key(&pad_id) {
            trace_warn!("skipping folder {}: pad {pad_id} already loaded", dir.display());
            return;
        }

        let files = match sorted_entries(dir) {
            Ok(files) => files,
            Err(err) => {
                trace_warn!("skipping folder {}: {err}", dir.display());
                return;
            }
        };
        let images: Vec<PathBuf> = files
            .into_iter()
            .filter(|p| p.is_file() && self.cfg.accepts(p))
            .collect();
        for path in &images {
            match self.load_file(pad_id, name.clone(), path) {
                Ok(()) => return,
                Err(err) => trace_warn!("skipping template file: {err}"),
            }
        }
        trace_warn!("no readable image in {} for pad {pad_id}", dir.display());
    }

    fn load_loose_file(&mut self, path: &Path) {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(pad_id) = parse_pad_id(&stem) else {
            trace_warn!("skipping {}: no pad id in its name", path.display());
            return;
        };
        if self.records.contains_key(&pad_id) {
            trace_warn!("skipping {}: pad {pad_id} already loaded", path.display());
            return;
        }
        if let Err(err) = self.load_file(pad_id, stem, path) {
            trace_warn!("skipping template file: {err}");
        }
    }

    fn load_file(&mut self, pad_id: PadId, name: String, path: &Path) -> PadMatchResult<()> {
        let img = load_gray_image(path)?;
        self.insert(pad_id, name, Some(path.to_path_buf()), &img)?;
        trace_event!("template_loaded", pad_id = pad_id);
        Ok(())
    }

    fn insert(
        &mut self,
        pad_id: PadId,
        display_name: String,
        source_path: Option<PathBuf>,
        img: &GrayImage,
    ) -> PadMatchResult<()> {
        if self.records.contains_key(&pad_id) {
            return Err(PadMatchError::InvalidInput("duplicate pad id"));
        }
        let image = to_canonical(img, self.cfg.canonical_size)?;
        let plan = TemplatePlan::from_view(ImageView::from_gray(&image)?)?;
        let scaled = build_scaled(
            &image,
            &self.cfg.scales,
            self.cfg.max_scaled_side,
            self.cfg.pyramid_min_side,
        )?;
        let features = extract_features(&image, &self.cfg.orb);
        if features.is_none() {
            trace_warn!("template for pad {pad_id} has no features; feature matching skips it");
        }
        self.records.insert(
            pad_id,
            TemplateRecord {
                pad_id,
                image,
                plan,
                scaled,
                features,
                source_path,
                display_name,
            },
        );
        Ok(())
    }
}

fn validate(cfg: &StoreConfig) -> PadMatchResult<()> {
    if cfg.canonical_size == 0 {
        return Err(PadMatchError::InvalidInput("canonical_size must be > 0"));
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> PadMatchResult<Vec<PathBuf>> {
    let read = fs::read_dir(dir).map_err(|err| PadMatchError::TemplateRoot {
        path: dir.to_path_buf(),
        reason: err.to_string(),
    })?;
    let mut entries: Vec<PathBuf> = read.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
