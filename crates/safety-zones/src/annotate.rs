//! Marker painting on a class grid for visualization
//!
//! Every function here writes `marker` into the grid. None of them is
//! needed for zone geometry; they run after all zones are built.

use crate::classify::ClassifiedDetection;
use crate::edges::RowEdges;
use crate::grid::ClassGrid;
use crate::offset::OffsetSpan;
use crate::zone::Zone;

/// Half-size of the square marker drawn at points of interest
const MARKER_RADIUS: i64 = 2;

fn mark_square(grid: &mut ClassGrid, row: i64, col: i64, marker: u8) {
    for r in row - MARKER_RADIUS..=row + MARKER_RADIUS {
        for c in col - MARKER_RADIUS..=col + MARKER_RADIUS {
            grid.set_signed(r, c, marker);
        }
    }
}

/// 5x5 marker at both ends of every track run
pub fn mark_edges(grid: &mut ClassGrid, edges: &RowEdges, marker: u8) {
    for (&row, runs) in edges {
        for run in runs {
            mark_square(grid, row as i64, run.start as i64, marker);
            mark_square(grid, row as i64, run.end as i64, marker);
        }
    }
}

/// Paint the offset spans between rail sides and zone borders
pub fn mark_offsets(grid: &mut ClassGrid, spans: &[OffsetSpan], marker: u8) {
    for span in spans {
        grid.fill_span(span.row, span.start, span.end, marker);
    }
}

/// Paint the left and right border pixels of a zone
pub fn mark_borders(grid: &mut ClassGrid, zone: &Zone, marker: u8) {
    for point in zone.left.iter().chain(zone.right.iter()) {
        grid.set_signed(point.row, point.col, marker);
    }
}

/// 5x5 marker at every detection center, clamped to the grid
pub fn mark_detections(grid: &mut ClassGrid, detections: &[ClassifiedDetection], marker: u8) {
    if grid.rows() == 0 || grid.cols() == 0 {
        return;
    }
    let last_row = grid.rows() as i64 - 1;
    let last_col = grid.cols() as i64 - 1;

    for detection in detections {
        let row = (detection.center_y as i64).clamp(0, last_row);
        let col = (detection.center_x as i64).clamp(0, last_col);
        mark_square(grid, row, col, marker);
    }
}
