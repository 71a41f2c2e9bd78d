//! Zone geometry configuration

use serde::{Deserialize, Serialize};

use crate::classify::ZonePalette;
use crate::ZoneError;

/// Zone geometry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Real-world rail gauge (millimeters)
    pub gauge_mm: f64,

    /// Lateral target distances (millimeters), one zone each
    pub target_distances_mm: Vec<f64>,

    /// Number of rows sampled for edge scanning
    pub clue_count: usize,

    /// Class values forming the track bed
    pub track_values: Vec<u8>,

    /// Class values forming the rails
    pub rail_values: Vec<u8>,

    /// Guard-rail class absorbed into adjacent track runs
    pub guard_value: u8,

    /// Value painted for zone boundaries
    pub marker_value: u8,

    /// Minimum track run width (pixels)
    pub track_min_width: usize,

    /// Minimum rail run width (pixels)
    pub rail_min_width: usize,

    /// Maximum guard-rail absorption on each side (pixels)
    pub guard_reach: usize,

    /// Gaps narrower than this are candidates for merging (pixels)
    pub merge_gap: usize,

    /// Row offset of the merge probes
    pub probe_offset: usize,

    /// Probe displacement above which a gap is structural (pixels)
    pub max_probe_displacement: usize,

    /// Rail snapping tolerance as a fraction of the row index
    pub rail_snap_ratio: f64,

    /// Step deviation factor over the median step
    pub outlier_threshold: f64,

    /// Recursion bound for outlier splitting
    pub max_split_depth: usize,

    /// Pixels used to fit the extrapolation line
    pub extrapolation_window: usize,

    /// Colors assigned to classified detections
    pub palette: ZonePalette,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            gauge_mm: 1435.0,
            target_distances_mm: vec![5400.0, 6500.0, 8000.0],
            clue_count: 10,
            track_values: vec![0, 6],
            rail_values: vec![9, 10],
            guard_value: 1,
            marker_value: 30,
            track_min_width: 19,
            rail_min_width: 5,
            guard_reach: 50,
            merge_gap: 50,
            probe_offset: 10,
            max_probe_displacement: 30,
            rail_snap_ratio: 0.04,
            outlier_threshold: 7.0,
            max_split_depth: 32,
            extrapolation_window: 10,
            palette: ZonePalette::default(),
        }
    }
}

impl ZoneConfig {
    /// Single-zone config for a given target distance
    pub fn single_target(target_mm: f64) -> Self {
        Self {
            target_distances_mm: vec![target_mm],
            ..Default::default()
        }
    }

    /// Target distances, nearest first
    pub fn sorted_targets(&self) -> Vec<f64> {
        let mut targets = self.target_distances_mm.clone();
        targets.sort_by(|a, b| a.total_cmp(b));
        targets
    }

    /// Reject values the geometry cannot work with
    pub fn validate(&self) -> Result<(), ZoneError> {
        if !(self.gauge_mm > 0.0) {
            return Err(ZoneError::InvalidConfig(format!(
                "gauge_mm must be positive, got {}",
                self.gauge_mm
            )));
        }
        if self.target_distances_mm.is_empty() {
            return Err(ZoneError::InvalidConfig(
                "at least one target distance is required".to_string(),
            ));
        }
        if let Some(bad) = self.target_distances_mm.iter().find(|d| !(**d > 0.0)) {
            return Err(ZoneError::InvalidConfig(format!(
                "target distances must be positive, got {}",
                bad
            )));
        }
        if self.clue_count == 0 {
            return Err(ZoneError::InvalidConfig("clue_count must be at least 1".to_string()));
        }
        if self.track_values.is_empty() {
            return Err(ZoneError::InvalidConfig("track_values must not be empty".to_string()));
        }
        if self.extrapolation_window < 2 {
            return Err(ZoneError::InvalidConfig(
                "extrapolation_window must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}
