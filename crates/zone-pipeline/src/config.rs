//! Pipeline configuration

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use safety_zones::{Allowlists, ZoneConfig};
use scene_input::{Dataset, DetectorSettings};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::PipelineError;

/// Environment prefix, e.g. `RAILZONE__ZONES__GAUGE_MM=1520`
pub const ENV_PREFIX: &str = "RAILZONE";

/// Image size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub rows: usize,
    pub cols: usize,
}

impl Resolution {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source images
    pub image_dir: PathBuf,

    /// Pre-computed segmentation masks (`<stem>.png`)
    pub label_dir: PathBuf,

    /// Pre-computed detections (`<stem>.json`)
    pub detection_dir: PathBuf,

    /// Image list for the pilsen layout
    pub manifest: Option<PathBuf>,

    /// Reports and annotated grids; nothing is written when unset
    pub output_dir: Option<PathBuf>,

    /// Zone grid resolution
    pub output_resolution: Resolution,

    /// Detector input size, used when a detector reports no frame size
    pub image_size: Resolution,

    pub dataset: Dataset,

    /// Export the annotated grid next to each report
    pub visualize: bool,

    pub log_level: String,
    pub log_json: bool,

    /// Images processed concurrently
    pub max_parallel: usize,

    pub zones: ZoneConfig,
    pub detector: DetectorSettings,
    pub allowlists: Allowlists,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("data/images"),
            label_dir: PathBuf::from("data/labels"),
            detection_dir: PathBuf::from("data/detections"),
            manifest: None,
            output_dir: None,
            output_resolution: Resolution::new(1080, 1920),
            image_size: Resolution::new(1024, 1024),
            dataset: Dataset::default(),
            visualize: false,
            log_level: "info".to_string(),
            log_json: false,
            max_parallel: 4,
            zones: ZoneConfig::default(),
            detector: DetectorSettings::default(),
            allowlists: Allowlists::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from an optional file plus `RAILZONE__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.zones.validate()?;

        if self.output_resolution.rows == 0 || self.output_resolution.cols == 0 {
            return Err(PipelineError::InvalidConfig(
                "output_resolution must be non-zero".to_string(),
            ));
        }
        if self.max_parallel == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_parallel must be at least 1".to_string(),
            ));
        }
        if self.log_level.parse::<Level>().is_err() {
            return Err(PipelineError::InvalidConfig(format!(
                "unknown log level: {}",
                self.log_level
            )));
        }
        if self.dataset == Dataset::Pilsen && self.manifest.is_none() {
            return Err(PipelineError::InvalidConfig(
                "pilsen dataset requires a manifest".to_string(),
            ));
        }
        Ok(())
    }
}
