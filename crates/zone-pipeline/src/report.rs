//! Per-image reports

use std::path::{Path, PathBuf};

use safety_zones::{BorderPoint, BottomShape, ClassifiedDetection, Zone};
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Report note for images where no detection passed the allowlists
pub const NO_ACCEPTED_DETECTIONS: &str = "no accepted detections";

/// Outline of one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub target_mm: f64,
    pub bottom_shape: BottomShape,
    pub left_near: Option<BorderPoint>,
    pub left_far: Option<BorderPoint>,
    pub right_near: Option<BorderPoint>,
    pub right_far: Option<BorderPoint>,

    /// Vertices in the closed polygon ring
    pub vertices: usize,
}

impl From<&Zone> for ZoneSummary {
    fn from(zone: &Zone) -> Self {
        Self {
            target_mm: zone.target_mm,
            bottom_shape: zone.bottom_shape,
            left_near: zone.left.first().copied(),
            left_far: zone.left.last().copied(),
            right_near: zone.right.first().copied(),
            right_far: zone.right.last().copied(),
            vertices: zone.polygon().len(),
        }
    }
}

/// Result of processing one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    pub image: PathBuf,
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub clue_rows: Vec<usize>,

    /// Nearest first
    pub zones: Vec<ZoneSummary>,

    pub detections: Vec<ClassifiedDetection>,

    /// Processing notices, e.g. [`NO_ACCEPTED_DETECTIONS`]
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ImageReport {
    /// Detections inside at least one zone
    pub fn in_zone_count(&self) -> usize {
        self.detections.iter().filter(|d| d.in_zone()).count()
    }

    /// Write `<stem>.json` into `dir`
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf, PipelineError> {
        let stem = self
            .image
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let path = dir.join(format!("{}.json", stem));

        let body = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Output(format!("serializing {}: {}", path.display(), e)))?;
        std::fs::write(&path, body)
            .map_err(|e| PipelineError::Output(format!("writing {}: {}", path.display(), e)))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safety_zones::{build_zone, bresenham_line, ZoneColor};

    #[test]
    fn test_zone_summary_endpoints() {
        let zone = build_zone(
            2000.0,
            bresenham_line(BorderPoint::new(10, 99), BorderPoint::new(20, 40)),
            bresenham_line(BorderPoint::new(90, 99), BorderPoint::new(80, 40)),
            100,
            100,
        );
        let summary = ZoneSummary::from(&zone);

        assert_eq!(summary.left_near, Some(BorderPoint::new(10, 99)));
        assert_eq!(summary.right_far, Some(BorderPoint::new(80, 40)));
        assert_eq!(summary.vertices, zone.polygon().len());
    }

    #[test]
    fn test_report_json() {
        let report = ImageReport {
            image: PathBuf::from("/data/frame_7.jpg"),
            grid_rows: 10,
            grid_cols: 20,
            clue_rows: vec![9, 5],
            zones: Vec::new(),
            detections: vec![ClassifiedDetection {
                class_id: 0,
                criticality: 1,
                color: ZoneColor::Orange,
                center_x: 4.0,
                center_y: 5.0,
                moving: true,
            }],
            notes: Vec::new(),
        };
        assert_eq!(report.in_zone_count(), 1);

        let dir = std::env::temp_dir().join(format!("zone-report-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = report.write_json(&dir).unwrap();
        assert!(path.ends_with("frame_7.json"));

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("\"orange\""));
        let parsed: ImageReport = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, report);

        // Reports written before notes existed still load
        let mut legacy: serde_json::Value = serde_json::from_str(&body).unwrap();
        legacy.as_object_mut().unwrap().remove("notes");
        let parsed: ImageReport = serde_json::from_value(legacy).unwrap();
        assert!(parsed.notes.is_empty());

        std::fs::remove_dir_all(dir).ok();
    }
}
