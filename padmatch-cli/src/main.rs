use clap::Parser;
use padmatch::{
    ContourConfig, DetectionReport, DetectorConfig, FeatureMatchConfig, Method, MultiScaleConfig,
    OrbConfig, PadDetector, StoreConfig, Vote,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Mission pad detector (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file. Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
    /// Print the loaded template table before detecting.
    #[arg(long)]
    info: bool,
    /// Query images; replaces `images` from the config when given.
    #[arg(value_name = "IMAGE")]
    images: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OrbConfigJson {
    fast_threshold: u8,
    max_keypoints: usize,
    nms_radius: u32,
    blur_sigma: f32,
}

impl Default for OrbConfigJson {
    fn default() -> Self {
        let cfg = OrbConfig::default();
        Self {
            fast_threshold: cfg.fast_threshold,
            max_keypoints: cfg.max_keypoints,
            nms_radius: cfg.nms_radius,
            blur_sigma: cfg.blur_sigma,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct StoreConfigJson {
    canonical_size: u32,
    extensions: Vec<String>,
    orb: OrbConfigJson,
    scales: Vec<f32>,
    max_scaled_side: u32,
    pyramid_min_side: u32,
}

impl Default for StoreConfigJson {
    fn default() -> Self {
        let cfg = StoreConfig::default();
        Self {
            canonical_size: cfg.canonical_size,
            extensions: cfg.extensions,
            orb: OrbConfigJson::default(),
            scales: cfg.scales,
            max_scaled_side: cfg.max_scaled_side,
            pyramid_min_side: cfg.pyramid_min_side,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FeatureConfigJson {
    max_distance: u32,
    min_good_matches: usize,
    min_score: f32,
}

impl Default for FeatureConfigJson {
    fn default() -> Self {
        let cfg = FeatureMatchConfig::default();
        Self {
            max_distance: cfg.max_distance,
            min_good_matches: cfg.min_good_matches,
            min_score: cfg.min_score,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ContourConfigJson {
    canny_low: f32,
    canny_high: f32,
    epsilon_ratio: f64,
    min_area: f64,
    shape_confidence: f32,
}

impl Default for ContourConfigJson {
    fn default() -> Self {
        let cfg = ContourConfig::default();
        Self {
            canny_low: cfg.canny_low,
            canny_high: cfg.canny_high,
            epsilon_ratio: cfg.epsilon_ratio,
            min_area: cfg.min_area,
            shape_confidence: cfg.shape_confidence,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MultiScaleConfigJson {
    max_query_side: u32,
    beam_width: usize,
    nms_radius: usize,
    refine_radius: usize,
}

impl Default for MultiScaleConfigJson {
    fn default() -> Self {
        let cfg = MultiScaleConfig::default();
        Self {
            max_query_side: cfg.max_query_side,
            beam_width: cfg.beam_width,
            nms_radius: cfg.nms_radius,
            refine_radius: cfg.refine_radius,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    template_root: String,
    images: Vec<String>,
    output_path: Option<String>,
    enabled: bool,
    confidence_threshold: f32,
    methods: Vec<String>,
    method_bonus: f32,
    require_pad_shape: bool,
    parallel: bool,
    store: StoreConfigJson,
    feature: FeatureConfigJson,
    contour: ContourConfigJson,
    multiscale: MultiScaleConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        let cfg = DetectorConfig::default();
        Self {
            template_root: String::new(),
            images: Vec::new(),
            output_path: None,
            enabled: cfg.enabled,
            confidence_threshold: cfg.confidence_threshold,
            methods: cfg.methods.iter().map(|m| m.as_str().to_string()).collect(),
            method_bonus: cfg.method_bonus,
            require_pad_shape: cfg.require_pad_shape,
            parallel: cfg.parallel,
            store: StoreConfigJson::default(),
            feature: FeatureConfigJson::default(),
            contour: ContourConfigJson::default(),
            multiscale: MultiScaleConfigJson::default(),
        }
    }
}

impl Config {
    fn detector_config(&self) -> Result<DetectorConfig, Box<dyn std::error::Error>> {
        let methods = self
            .methods
            .iter()
            .map(|name| {
                Method::from_name(name).ok_or_else(|| format!("unknown method '{name}'"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DetectorConfig {
            template_root: Some(PathBuf::from(&self.template_root)),
            store: StoreConfig {
                canonical_size: self.store.canonical_size,
                extensions: self.store.extensions.clone(),
                orb: OrbConfig {
                    fast_threshold: self.store.orb.fast_threshold,
                    max_keypoints: self.store.orb.max_keypoints,
                    nms_radius: self.store.orb.nms_radius,
                    blur_sigma: self.store.orb.blur_sigma,
                },
                scales: self.store.scales.clone(),
                max_scaled_side: self.store.max_scaled_side,
                pyramid_min_side: self.store.pyramid_min_side,
            },
            enabled: self.enabled,
            confidence_threshold: self.confidence_threshold,
            methods,
            feature: FeatureMatchConfig {
                max_distance: self.feature.max_distance,
                min_good_matches: self.feature.min_good_matches,
                min_score: self.feature.min_score,
            },
            contour: ContourConfig {
                canny_low: self.contour.canny_low,
                canny_high: self.contour.canny_high,
                epsilon_ratio: self.contour.epsilon_ratio,
                min_area: self.contour.min_area,
                shape_confidence: self.contour.shape_confidence,
            },
            multiscale: MultiScaleConfig {
                max_query_side: self.multiscale.max_query_side,
                beam_width: self.multiscale.beam_width,
                nms_radius: self.multiscale.nms_radius,
                refine_radius: self.multiscale.refine_radius,
            },
            method_bonus: self.method_bonus,
            require_pad_shape: self.require_pad_shape,
            parallel: self.parallel,
        })
    }
}

#[derive(Debug, Serialize)]
struct VoteRecord {
    method: &'static str,
    pad_id: Option<u32>,
    confidence: Option<f32>,
    shape_area: Option<f64>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScoreRecord {
    pad_id: u32,
    avg_confidence: f32,
    methods: Vec<&'static str>,
    final_score: f32,
}

#[derive(Debug, Serialize)]
struct Output {
    image: String,
    outcome: &'static str,
    detail: String,
    pad_id: Option<u32>,
    confidence_threshold: f32,
    votes: Vec<VoteRecord>,
    scores: Vec<ScoreRecord>,
}

impl Output {
    fn new(image: String, report: &DetectionReport) -> Self {
        let votes = report
            .votes
            .iter()
            .map(|v| VoteRecord {
                method: v.method.as_str(),
                pad_id: v.vote.as_ref().and_then(Vote::candidate).map(|c| c.pad_id),
                confidence: v.vote.as_ref().map(Vote::confidence),
                shape_area: match &v.vote {
                    Some(Vote::Shape(shape)) => Some(shape.area),
                    _ => None,
                },
                error: v.error.clone(),
            })
            .collect();
        let scores = report
            .scores
            .iter()
            .map(|s| ScoreRecord {
                pad_id: s.pad_id,
                avg_confidence: s.avg_confidence,
                methods: s.methods.iter().map(|m| m.as_str()).collect(),
                final_score: s.final_score,
            })
            .collect();
        Self {
            image,
            outcome: report.outcome.as_str(),
            detail: report.outcome.to_string(),
            pad_id: report.pad_id(),
            confidence_threshold: report.confidence_threshold,
            votes,
            scores,
        }
    }
}

#[derive(Debug, Serialize)]
struct TemplateRecordJson {
    pad_id: u32,
    name: String,
    source_path: Option<String>,
    width: u32,
    height: u32,
    keypoints: usize,
    flat: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("padmatch=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let mut config: Config = match &cli.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if !cli.images.is_empty() {
        config.images = cli
            .images
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }
    if config.template_root.is_empty() {
        return Err("template_root must be set in the config".into());
    }
    if config.images.is_empty() && !cli.info {
        return Err("no query images given".into());
    }

    let detector = PadDetector::new(config.detector_config()?)?;

    if cli.info {
        let table: Vec<TemplateRecordJson> = detector
            .template_info()
            .into_values()
            .map(|info| TemplateRecordJson {
                pad_id: info.pad_id,
                name: info.display_name,
                source_path: info.source_path.map(|p| p.display().to_string()),
                width: info.width,
                height: info.height,
                keypoints: info.keypoints,
                flat: info.flat,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
    }

    let outputs: Vec<Output> = config
        .images
        .iter()
        .map(|image| Output::new(image.clone(), &detector.report(image.as_str())))
        .collect();

    match &config.output_path {
        Some(path) => fs::write(path, serde_json::to_string_pretty(&outputs)?)?,
        None => {
            for output in &outputs {
                println!("{}", serde_json::to_string_pretty(output)?);
            }
        }
    }

    Ok(())
}
