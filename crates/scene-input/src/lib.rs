//! Scene Inputs for Safety-Zone Analysis
//!
//! Model outputs enter the pipeline through two seams:
//! - Segmentation: per-pixel class grid at the output resolution
//! - Detection: object boxes in detector-native coordinates
//!
//! File-backed implementations read pre-computed label masks (PNG) and
//! detection lists (JSON).

pub mod dataset;
pub mod detections;
pub mod label;
pub mod settings;

pub use dataset::{list_images, Dataset};
pub use detections::{DetectionRecord, JsonDetectionProvider};
pub use label::{export_grid, LabelMaskProvider};
pub use settings::DetectorSettings;

use std::path::{Path, PathBuf};

use safety_zones::Detection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input error types
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image decoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Malformed detection file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Invalid label mask: {0}")]
    Mask(String),
}

/// Detector result for one image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorOutput {
    /// Detector-native image height
    pub image_rows: usize,
    /// Detector-native image width
    pub image_cols: usize,
    pub detections: Vec<Detection>,
}

/// Semantic segmentation model seam
pub trait SegmentationProvider: Send + Sync {
    /// Class grid for an image, at the configured output resolution
    fn classify(&self, image: &Path) -> Result<safety_zones::ClassGrid, InputError>;
}

/// Object detection model seam
pub trait DetectionProvider: Send + Sync {
    /// Detections for an image, in detector-native coordinates
    fn detect(&self, image: &Path, settings: &DetectorSettings) -> Result<DetectorOutput, InputError>;
}

/// File stem used to pair an image with its pre-computed outputs
pub(crate) fn image_stem(image: &Path) -> Result<&str, InputError> {
    image
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| InputError::NotFound(image.to_path_buf()))
}
