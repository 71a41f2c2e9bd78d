//! Detector settings

use serde::{Deserialize, Serialize};

/// Detector thresholds forwarded to the detection provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Minimum confidence for a box to be kept
    pub confidence: f64,

    /// IoU threshold for non-maximum suppression
    pub iou: f64,

    /// Suppress across classes
    pub class_agnostic: bool,

    /// Upper bound on boxes per image
    pub max_detections: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            confidence: 0.25,
            iou: 0.45,
            class_agnostic: false,
            max_detections: 1000,
        }
    }
}

impl DetectorSettings {
    /// Keep every box the detector reports
    pub fn permissive() -> Self {
        Self {
            confidence: 0.0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DetectorSettings::default();
        assert_eq!(settings.confidence, 0.25);
        assert_eq!(settings.iou, 0.45);
        assert!(!settings.class_agnostic);
        assert_eq!(settings.max_detections, 1000);
    }

    #[test]
    fn test_partial_override() {
        let settings: DetectorSettings = serde_json::from_str(r#"{"confidence": 0.5}"#).unwrap();
        assert_eq!(settings.confidence, 0.5);
        assert_eq!(settings.max_detections, 1000);
    }
}
