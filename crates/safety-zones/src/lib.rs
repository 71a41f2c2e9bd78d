//! Railway Safety Zones
//!
//! Geometry core of the track-side danger assessment:
//! - Row edge extraction over a segmentation class grid
//! - Rail side location with outlier rejection
//! - Real-world distance offsets via the rail gauge
//! - Closed criticality zone polygons (nearest first)
//! - Detection classification against the zones

pub mod annotate;
pub mod classify;
pub mod config;
pub mod edges;
pub mod grid;
pub mod locator;
pub mod offset;
pub mod raster;
pub mod zone;

pub use classify::{
    classify_detections, Allowlists, ClassifiedDetection, Detection, DetectionFrame,
    GroupedDetections, MotionClass, ZoneColor, ZonePalette,
};
pub use config::ZoneConfig;
pub use edges::{extract_row_edges, scan_row, RowEdges, Run};
pub use grid::{sample_clue_rows, ClassGrid};
pub use locator::{locate_rail_sides, split_outliers, OutlierSplit, RailSides};
pub use offset::{OffsetSpan, RowScale, ZoneBorders};
pub use raster::{bresenham_line, BorderPoint};
pub use zone::{build_zone, BottomShape, Zone};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Geometry error types
#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Grid shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    GridShape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid grid data: {0}")]
    GridData(String),
}

/// Everything derived from one class grid
#[derive(Debug, Clone, Default)]
pub struct ZoneSet {
    /// Clue rows that were scanned
    pub clue_rows: Vec<usize>,

    /// Track runs per scanned row
    pub edges: RowEdges,

    /// Filtered rail sides
    pub sides: RailSides,

    /// Zones, ascending by target distance
    pub zones: Vec<Zone>,

    /// Offset spans painted per zone (same order as `zones`)
    pub offset_spans: Vec<Vec<OffsetSpan>>,
}

impl ZoneSet {
    /// Number of zones built
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// True when no zone was built
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Zone geometry engine
pub struct ZoneEngine {
    config: ZoneConfig,
}

impl ZoneEngine {
    /// Create a new engine, validating the configuration
    pub fn new(config: ZoneConfig) -> Result<Self, ZoneError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Pick the rows to scan for track edges
    pub fn clue_rows(&self, grid: &ClassGrid) -> Vec<usize> {
        sample_clue_rows(grid, &self.config.track_values, self.config.clue_count)
    }

    /// Extract track runs on the given rows
    pub fn extract_edges(&self, grid: &ClassGrid, rows: &[usize]) -> RowEdges {
        extract_row_edges(grid, rows, &self.config)
    }

    /// Build one zone per configured target distance.
    ///
    /// The grid is only read; painting markers is left to [`annotate`].
    pub fn build_zones(&self, grid: &ClassGrid, edges: &RowEdges) -> (RailSides, Vec<Zone>, Vec<Vec<OffsetSpan>>) {
        let sides = locate_rail_sides(grid, edges, &self.config);
        let scales = offset::row_scales(edges, self.config.gauge_mm);
        let min_row = grid
            .track_extent(&self.config.track_values)
            .map(|(top, _)| top as i64)
            .unwrap_or(0);

        let mut zones = Vec::with_capacity(self.config.target_distances_mm.len());
        let mut spans = Vec::with_capacity(self.config.target_distances_mm.len());

        for target_mm in self.config.sorted_targets() {
            let borders = ZoneBorders::build(grid, &sides, &scales, target_mm, min_row, &self.config);
            debug!(
                "Target {}mm: left border {} px, right border {} px",
                target_mm,
                borders.left.len(),
                borders.right.len()
            );
            zones.push(build_zone(
                target_mm,
                borders.left,
                borders.right,
                grid.rows(),
                grid.cols(),
            ));
            spans.push(borders.spans);
        }

        (sides, zones, spans)
    }

    /// Full geometry pass: clue rows, edges, sides, zones
    pub fn analyze(&self, grid: &ClassGrid) -> ZoneSet {
        let clue_rows = self.clue_rows(grid);
        if clue_rows.is_empty() {
            warn!("No track rows found in class grid; zones will be degenerate");
        }

        let edges = self.extract_edges(grid, &clue_rows);
        let (sides, zones, offset_spans) = self.build_zones(grid, &edges);

        info!(
            "Built {} zones from {} edge rows ({} clue rows)",
            zones.len(),
            edges.len(),
            clue_rows.len()
        );

        ZoneSet {
            clue_rows,
            edges,
            sides,
            zones,
            offset_spans,
        }
    }
}
