//! Real-world distance offsets and border interpolation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ZoneConfig;
use crate::edges::RowEdges;
use crate::grid::ClassGrid;
use crate::locator::RailSides;
use crate::raster::{bresenham_line, extrapolate, BorderPoint};

/// Pixel scale of one edge row, measured from the rail gauge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowScale {
    /// Widest run on the row (pixels)
    pub gauge_px: usize,

    /// Mean run width on the row (pixels)
    pub mean_width_px: f64,

    /// Millimeters represented by one pixel
    pub mm_per_px: f64,
}

impl RowScale {
    /// Whole-pixel equivalent of a real-world distance
    pub fn offset_px(&self, target_mm: f64) -> i64 {
        (target_mm / self.mm_per_px).round() as i64
    }
}

/// Measure the pixel scale of every edge row. Rows whose widest run has
/// zero width carry no scale and are left out.
pub fn row_scales(edges: &RowEdges, gauge_mm: f64) -> BTreeMap<usize, RowScale> {
    let mut scales = BTreeMap::new();

    for (&row, runs) in edges {
        let Some(gauge_px) = runs.iter().map(|r| r.span()).max() else {
            continue;
        };
        if gauge_px == 0 {
            debug!("Row {} has no usable gauge width", row);
            continue;
        }

        let mean_width_px = runs.iter().map(|r| r.span() as f64).sum::<f64>() / runs.len() as f64;
        scales.insert(
            row,
            RowScale {
                gauge_px,
                mean_width_px,
                mm_per_px: gauge_mm / gauge_px as f64,
            },
        );
    }

    scales
}

/// Which rail side a border belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Row span covered by an offset, for painting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetSpan {
    pub row: usize,
    /// First painted column
    pub start: usize,
    /// One past the last painted column
    pub end: usize,
}

/// Offset every side point outward by `target_mm`.
///
/// Left points may land at negative columns. Right points reaching the
/// grid width are dropped.
pub fn offset_points(
    side_points: &[BorderPoint],
    side: Side,
    scales: &BTreeMap<usize, RowScale>,
    target_mm: f64,
    cols: usize,
) -> (Vec<BorderPoint>, Vec<OffsetSpan>) {
    let mut points = Vec::with_capacity(side_points.len());
    let mut spans = Vec::with_capacity(side_points.len());

    for point in side_points {
        let Some(scale) = usize::try_from(point.row).ok().and_then(|r| scales.get(&r)) else {
            continue;
        };
        let offset = scale.offset_px(target_mm);
        let row = point.row as usize;

        match side {
            Side::Left => {
                let far = point.col - offset;
                points.push(BorderPoint::new(far, point.row));
                spans.push(OffsetSpan {
                    row,
                    start: far.max(0) as usize,
                    end: point.col.max(0) as usize,
                });
            }
            Side::Right => {
                let far = (point.col + offset).min(cols as i64);
                if far != cols as i64 {
                    points.push(BorderPoint::new(far, point.row));
                }
                spans.push(OffsetSpan {
                    row,
                    start: point.col.max(0) as usize,
                    end: far.max(0) as usize,
                });
            }
        }
    }

    (points, spans)
}

/// Connect consecutive offset points with lines, skipping pairs that
/// straddle a confirmed gap `(near_row, far_row)`. Pixels left of column 0
/// are discarded.
pub fn interpolate(points: &[BorderPoint], gaps: &[(i64, i64)]) -> Vec<BorderPoint> {
    let mut line = Vec::new();

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let straddles = gaps
            .iter()
            .any(|&(near, far)| a.row >= near && b.row <= far);
        if straddles {
            debug!("Leaving gap between rows {} and {}", a.row, b.row);
            continue;
        }
        line.extend(bresenham_line(a, b).into_iter().filter(|p| p.col >= 0));
    }

    if line.is_empty() {
        warn!("Border interpolation produced no pixels");
    }
    line
}

/// Left and right zone borders for one target distance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneBorders {
    /// Starts at the image edge (after extrapolation), ends at the far end
    pub left: Vec<BorderPoint>,
    pub right: Vec<BorderPoint>,

    /// Painted offset spans of both sides
    pub spans: Vec<OffsetSpan>,
}

impl ZoneBorders {
    /// Offset, interpolate and extrapolate both sides.
    ///
    /// Only the end nearest the camera is extrapolated; it is walked out to
    /// the image edge so the zone reaches the bottom or a side of the frame.
    pub fn build(
        grid: &ClassGrid,
        sides: &RailSides,
        scales: &BTreeMap<usize, RowScale>,
        target_mm: f64,
        min_row: i64,
        config: &ZoneConfig,
    ) -> Self {
        let (left_points, mut spans) =
            offset_points(&sides.left, Side::Left, scales, target_mm, grid.cols());
        let (right_points, right_spans) =
            offset_points(&sides.right, Side::Right, scales, target_mm, grid.cols());
        spans.extend(right_spans);

        let left_body = interpolate(&left_points, &sides.left_gaps());
        let right_body = interpolate(&right_points, &sides.right_gaps());

        Self {
            left: extend_near_end(left_body, grid, min_row, config.extrapolation_window),
            right: extend_near_end(right_body, grid, min_row, config.extrapolation_window),
            spans,
        }
    }
}

fn extend_near_end(body: Vec<BorderPoint>, grid: &ClassGrid, min_row: i64, window: usize) -> Vec<BorderPoint> {
    // Walk the body far-to-near so the near end is the one extended
    let reversed: Vec<BorderPoint> = body.iter().rev().copied().collect();
    let mut extended = extrapolate(&reversed, grid.rows(), grid.cols(), min_row, window);

    extended.reverse();
    extended.extend(body);
    extended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::Run;

    fn scales_for(rows: &[usize], gauge_px: usize) -> BTreeMap<usize, RowScale> {
        let mut edges = RowEdges::new();
        for &row in rows {
            edges.insert(row, vec![Run::new(100, 100 + gauge_px)]);
        }
        row_scales(&edges, 1435.0)
    }

    #[test]
    fn test_scale_uses_widest_run() {
        let mut edges = RowEdges::new();
        edges.insert(10, vec![Run::new(10, 30), Run::new(50, 150)]);
        let scales = row_scales(&edges, 1435.0);

        let scale = scales[&10];
        assert_eq!(scale.gauge_px, 100);
        assert!((scale.mean_width_px - 60.0).abs() < 1e-9);
        assert!((scale.mm_per_px - 14.35).abs() < 1e-9);
        assert_eq!(scale.offset_px(2000.0), 139);
    }

    #[test]
    fn test_zero_width_row_skipped() {
        let mut edges = RowEdges::new();
        edges.insert(10, vec![Run::new(40, 40)]);
        assert!(row_scales(&edges, 1435.0).is_empty());
    }

    #[test]
    fn test_left_offset_may_go_negative() {
        let scales = scales_for(&[500], 200);
        let side = [BorderPoint::new(100, 500)];
        let (points, spans) = offset_points(&side, Side::Left, &scales, 2000.0, 1920);

        // 1435 / 200 = 7.175 mm/px, 2000mm = 279px
        assert_eq!(points, vec![BorderPoint::new(-179, 500)]);
        assert_eq!(spans, vec![OffsetSpan { row: 500, start: 0, end: 100 }]);
    }

    #[test]
    fn test_right_offset_at_width_dropped() {
        let scales = scales_for(&[500], 200);
        let side = [BorderPoint::new(1800, 500)];
        let (points, spans) = offset_points(&side, Side::Right, &scales, 2000.0, 1920);

        assert!(points.is_empty());
        assert_eq!(spans[0].end, 1920);
    }

    #[test]
    fn test_interpolation_skips_gaps() {
        let points = vec![
            BorderPoint::new(10, 100),
            BorderPoint::new(10, 90),
            BorderPoint::new(50, 80),
            BorderPoint::new(50, 70),
        ];
        let line = interpolate(&points, &[(90, 80)]);

        assert_eq!(line.len(), 22);
        assert!(!line.iter().any(|p| p.row == 85));
    }

    #[test]
    fn test_interpolation_drops_negative_columns() {
        let points = vec![BorderPoint::new(-5, 20), BorderPoint::new(5, 10)];
        let line = interpolate(&points, &[]);
        assert!(line.iter().all(|p| p.col >= 0));
        assert_eq!(line.last(), Some(&BorderPoint::new(5, 10)));
    }

    #[test]
    fn test_borders_reach_bottom_edge() {
        let grid = ClassGrid::filled(200, 400, 3);
        let scales = scales_for(&[150, 120, 90, 60], 100);
        let sides = RailSides {
            left: [150, 120, 90, 60].iter().map(|&r| BorderPoint::new(150, r)).collect(),
            right: [150, 120, 90, 60].iter().map(|&r| BorderPoint::new(250, r)).collect(),
            ..Default::default()
        };

        let borders = ZoneBorders::build(&grid, &sides, &scales, 1435.0, 0, &ZoneConfig::default());

        // 1435mm is exactly one gauge width
        assert_eq!(borders.left.first(), Some(&BorderPoint::new(50, 199)));
        assert_eq!(borders.left.last(), Some(&BorderPoint::new(50, 60)));
        assert_eq!(borders.right.first(), Some(&BorderPoint::new(350, 199)));
        assert_eq!(borders.right.last(), Some(&BorderPoint::new(350, 60)));
    }
}
