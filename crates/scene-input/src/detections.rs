//! Pre-computed detection provider

use std::path::{Path, PathBuf};

use safety_zones::Detection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{image_stem, DetectionProvider, DetectorOutput, DetectorSettings, InputError};

/// One box as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub class_id: u32,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Missing confidence counts as certain
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl From<DetectionRecord> for Detection {
    fn from(record: DetectionRecord) -> Self {
        Detection {
            class_id: record.class_id,
            center_x: record.center_x,
            center_y: record.center_y,
            width: record.width,
            height: record.height,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DetectionFile {
    image_rows: usize,
    image_cols: usize,
    #[serde(default)]
    detections: Vec<DetectionRecord>,
}

/// Reads `<stem>.json` detection files from a directory.
///
/// The detector settings are applied on load: confidence threshold,
/// overlap suppression (per class unless class-agnostic) and the per-image cap.
#[derive(Debug, Clone)]
pub struct JsonDetectionProvider {
    detection_dir: PathBuf,
}

impl JsonDetectionProvider {
    pub fn new(detection_dir: impl Into<PathBuf>) -> Self {
        Self {
            detection_dir: detection_dir.into(),
        }
    }

    pub fn detection_path(&self, image: &Path) -> Result<PathBuf, InputError> {
        Ok(self.detection_dir.join(format!("{}.json", image_stem(image)?)))
    }

    /// Parse a detection file body and apply the settings
    pub fn parse(body: &str, settings: &DetectorSettings) -> Result<DetectorOutput, InputError> {
        let file: DetectionFile = serde_json::from_str(body)?;
        let total = file.detections.len();

        let confident: Vec<DetectionRecord> = file
            .detections
            .into_iter()
            .filter(|d| d.score() >= settings.confidence)
            .collect();
        let detections: Vec<Detection> = suppress(&confident, settings)
            .into_iter()
            .map(|i| Detection::from(confident[i]))
            .collect();

        debug!("Kept {} of {} detections", detections.len(), total);

        Ok(DetectorOutput {
            image_rows: file.image_rows,
            image_cols: file.image_cols,
            detections,
        })
    }
}

impl DetectionRecord {
    fn score(&self) -> f64 {
        self.confidence.unwrap_or(1.0)
    }

    fn corners(&self) -> (f64, f64, f64, f64) {
        (
            self.center_x - self.width / 2.0,
            self.center_y - self.height / 2.0,
            self.center_x + self.width / 2.0,
            self.center_y + self.height / 2.0,
        )
    }

    /// Intersection over union of two boxes
    pub fn iou(&self, other: &DetectionRecord) -> f64 {
        let (ax0, ay0, ax1, ay1) = self.corners();
        let (bx0, by0, bx1, by1) = other.corners();

        let w = (ax1.min(bx1) - ax0.max(bx0)).max(0.0);
        let h = (ay1.min(by1) - ay0.max(by0)).max(0.0);
        let intersection = w * h;
        let union = self.width * self.height + other.width * other.height - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Greedy non-maximum suppression, highest score first, capped at
/// `max_detections`. Returns surviving indices in input order.
fn suppress(records: &[DetectionRecord], settings: &DetectorSettings) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| records[b].score().total_cmp(&records[a].score()));

    let mut kept: Vec<usize> = Vec::new();
    for i in order {
        let overlaps = kept.iter().any(|&k| {
            (settings.class_agnostic || records[k].class_id == records[i].class_id)
                && records[k].iou(&records[i]) > settings.iou
        });
        if !overlaps {
            kept.push(i);
        }
    }

    if kept.len() > settings.max_detections {
        warn!("Truncating {} detections to {}", kept.len(), settings.max_detections);
        kept.truncate(settings.max_detections);
    }

    kept.sort_unstable();
    kept
}

impl DetectionProvider for JsonDetectionProvider {
    fn detect(&self, image: &Path, settings: &DetectorSettings) -> Result<DetectorOutput, InputError> {
        let path = self.detection_path(image)?;
        if !path.exists() {
            return Err(InputError::NotFound(path));
        }
        let body = std::fs::read_to_string(&path).map_err(|source| InputError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&body, settings)
    }
}
