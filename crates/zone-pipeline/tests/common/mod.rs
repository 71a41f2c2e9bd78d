//! Synthetic scenes shared by the integration tests

#![allow(dead_code)]

use std::path::Path;

use safety_zones::{ClassGrid, Detection, ZoneConfig};
use scene_input::{
    DetectionProvider, DetectorOutput, DetectorSettings, InputError, SegmentationProvider,
};
use zone_pipeline::PipelineConfig;

pub const ROWS: usize = 1080;
pub const COLS: usize = 1920;

/// Straight track from row 200 to the bottom: rails at 850..=859 and
/// 1061..=1070, bed at 860..=1060 (gauge 200 px).
pub fn straight_track() -> ClassGrid {
    let mut grid = ClassGrid::filled(ROWS, COLS, 3);
    for row in 200..ROWS {
        grid.fill_span(row, 850, 860, 9);
        grid.fill_span(row, 860, 1061, 0);
        grid.fill_span(row, 1061, 1071, 9);
    }
    grid
}

/// Targets 2000/3000/4000mm put the zone borders at columns
/// 571/1349, 432/1488 and 293/1627.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        zones: ZoneConfig {
            target_distances_mm: vec![2000.0, 3000.0, 4000.0],
            ..ZoneConfig::default()
        },
        ..PipelineConfig::default()
    }
}

pub fn detection(class_id: u32, x: f64, y: f64) -> Detection {
    Detection {
        class_id,
        center_x: x,
        center_y: y,
        width: 40.0,
        height: 80.0,
    }
}

/// Serves the straight track for every image except names containing "bad"
pub struct SyntheticSegmentation;

impl SegmentationProvider for SyntheticSegmentation {
    fn classify(&self, image: &Path) -> Result<ClassGrid, InputError> {
        let name = image.to_string_lossy();
        if name.contains("bad") {
            return Err(InputError::NotFound(image.to_path_buf()));
        }
        if name.contains("small") {
            return Ok(ClassGrid::filled(100, 100, 3));
        }
        Ok(straight_track())
    }
}

/// Returns the same detections for every image
pub struct FixedDetections(pub Vec<Detection>);

impl DetectionProvider for FixedDetections {
    fn detect(&self, _image: &Path, _settings: &DetectorSettings) -> Result<DetectorOutput, InputError> {
        Ok(DetectorOutput {
            image_rows: ROWS,
            image_cols: COLS,
            detections: self.0.clone(),
        })
    }
}
