//! Detection classification against criticality zones

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::zone::Zone;

/// Detector box in detector-native pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Object category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionClass {
    /// People, vehicles, animals
    Moving,
    /// Poles, signs, furniture
    Stationary,
}

/// Class-id allowlists for both categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Allowlists {
    pub moving: Vec<u32>,
    pub stationary: Vec<u32>,
}

impl Default for Allowlists {
    fn default() -> Self {
        Self {
            moving: vec![0, 1, 2, 3, 5, 7, 15, 16, 17, 18, 19, 20, 21, 22, 23],
            stationary: vec![
                24, 25, 26, 28, 29, 30, 31, 36, 56, 57, 59, 60, 61, 62, 63, 68, 69, 70, 71, 72, 78,
            ],
        }
    }
}

/// Detections grouped by class id, in first-appearance order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedDetections {
    pub moving: Vec<(u32, Vec<Detection>)>,
    pub stationary: Vec<(u32, Vec<Detection>)>,
}

impl GroupedDetections {
    pub fn is_empty(&self) -> bool {
        self.moving.is_empty() && self.stationary.is_empty()
    }

    /// Total number of grouped detections
    pub fn count(&self) -> usize {
        self.moving
            .iter()
            .chain(self.stationary.iter())
            .map(|(_, boxes)| boxes.len())
            .sum()
    }
}

fn push_grouped(groups: &mut Vec<(u32, Vec<Detection>)>, detection: Detection) {
    match groups.iter_mut().find(|(id, _)| *id == detection.class_id) {
        Some((_, boxes)) => boxes.push(detection),
        None => groups.push((detection.class_id, vec![detection])),
    }
}

impl Allowlists {
    /// Categories a class id belongs to
    pub fn categories(&self, class_id: u32) -> Vec<MotionClass> {
        let mut categories = Vec::with_capacity(1);
        if self.moving.contains(&class_id) {
            categories.push(MotionClass::Moving);
        }
        if self.stationary.contains(&class_id) {
            categories.push(MotionClass::Stationary);
        }
        categories
    }

    /// Partition detections; ids in neither list are dropped
    pub fn group(&self, detections: &[Detection]) -> GroupedDetections {
        let mut grouped = GroupedDetections::default();
        let mut dropped = 0usize;

        for detection in detections {
            let categories = self.categories(detection.class_id);
            if categories.is_empty() {
                dropped += 1;
            }
            for category in categories {
                match category {
                    MotionClass::Moving => push_grouped(&mut grouped.moving, *detection),
                    MotionClass::Stationary => push_grouped(&mut grouped.stationary, *detection),
                }
            }
        }

        if dropped > 0 {
            debug!("Dropped {} detections outside the allowlists", dropped);
        }
        grouped
    }
}

/// Display color tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneColor {
    Yellow,
    Orange,
    Red,
    Green,
    Blue,
}

/// Color assignment for classified detections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonePalette {
    /// Moving detections per zone index, nearest zone first
    pub zones: Vec<ZoneColor>,

    /// Stationary detections inside any zone
    pub stationary: ZoneColor,

    /// Detections outside every zone
    pub outside: ZoneColor,
}

impl Default for ZonePalette {
    fn default() -> Self {
        Self {
            zones: vec![ZoneColor::Red, ZoneColor::Orange, ZoneColor::Yellow],
            stationary: ZoneColor::Blue,
            outside: ZoneColor::Green,
        }
    }
}

impl ZonePalette {
    /// Color of a moving detection in zone `index`; zones beyond the
    /// palette reuse its last color
    pub fn zone_color(&self, index: usize) -> ZoneColor {
        self.zones
            .get(index)
            .or_else(|| self.zones.last())
            .copied()
            .unwrap_or(self.outside)
    }
}

/// Detector image size and zone grid size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub detector_rows: usize,
    pub detector_cols: usize,
    pub output_rows: usize,
    pub output_cols: usize,
}

impl DetectionFrame {
    /// Map a detector-space center into zone space.
    ///
    /// The x coordinate is scaled by the row ratio and y by the column
    /// ratio. This pairing matches the reference deployment and has not
    /// been verified against a rotated detector.
    pub fn rescale(&self, x: f64, y: f64) -> (f64, f64) {
        let x_scale = self.output_rows as f64 / self.detector_rows.max(1) as f64;
        let y_scale = self.output_cols as f64 / self.detector_cols.max(1) as f64;
        (x * x_scale, y * y_scale)
    }
}

/// Detection with its zone verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedDetection {
    pub class_id: u32,

    /// Index of the nearest containing zone, -1 when outside all zones
    pub criticality: i32,

    pub color: ZoneColor,

    /// Center in zone (segmentation) coordinates
    pub center_x: f64,
    pub center_y: f64,

    pub moving: bool,
}

impl ClassifiedDetection {
    pub fn in_zone(&self) -> bool {
        self.criticality >= 0
    }
}

/// Index of the nearest zone containing the point
fn nearest_zone(zones: &[Zone], x: f64, y: f64) -> Option<usize> {
    zones.iter().position(|zone| zone.contains(x, y))
}

/// Classify grouped detections against zones ordered nearest first.
///
/// Moving detections come first, then stationary ones; within each, groups
/// keep first-appearance order and boxes keep input order.
pub fn classify_detections(
    grouped: &GroupedDetections,
    zones: &[Zone],
    frame: &DetectionFrame,
    palette: &ZonePalette,
) -> Vec<ClassifiedDetection> {
    if grouped.is_empty() {
        info!("No accepted detections in this image");
        return Vec::new();
    }

    let mut classified = Vec::with_capacity(grouped.count());
    let categories = [(&grouped.moving, true), (&grouped.stationary, false)];

    for (groups, moving) in categories {
        for (class_id, boxes) in groups {
            for detection in boxes {
                let (x, y) = frame.rescale(detection.center_x, detection.center_y);
                let zone = nearest_zone(zones, x, y);

                let color = match (zone, moving) {
                    (Some(index), true) => palette.zone_color(index),
                    (Some(_), false) => palette.stationary,
                    (None, _) => palette.outside,
                };

                classified.push(ClassifiedDetection {
                    class_id: *class_id,
                    criticality: zone.map_or(-1, |index| index as i32),
                    color,
                    center_x: x,
                    center_y: y,
                    moving,
                });
            }
        }
    }

    debug!(
        "Classified {} detections, {} inside a zone",
        classified.len(),
        classified.iter().filter(|c| c.in_zone()).count()
    );
    classified
}
