//! Rail side location and outlier rejection

use tracing::{debug, warn};

use crate::config::ZoneConfig;
use crate::edges::{scan_row, RowEdges};
use crate::grid::ClassGrid;
use crate::raster::BorderPoint;

/// Left and right rail sides, ordered nearest to the camera first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RailSides {
    pub left: Vec<BorderPoint>,
    pub right: Vec<BorderPoint>,

    /// Confirmed gaps: flag `i` separates point `i` from point `i + 1`
    pub left_flags: Vec<usize>,
    pub right_flags: Vec<usize>,
}

impl RailSides {
    /// Rows bracketing each confirmed gap, `(near_row, far_row)`
    pub fn left_gaps(&self) -> Vec<(i64, i64)> {
        gap_rows(&self.left, &self.left_flags)
    }

    pub fn right_gaps(&self) -> Vec<(i64, i64)> {
        gap_rows(&self.right, &self.right_flags)
    }
}

fn gap_rows(points: &[BorderPoint], flags: &[usize]) -> Vec<(i64, i64)> {
    flags
        .iter()
        .filter_map(|&i| Some((points.get(i)?.row, points.get(i + 1)?.row)))
        .collect()
}

/// Result of [`split_outliers`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierSplit {
    /// Cleaned points
    pub points: Vec<BorderPoint>,

    /// Input indices that survived, parallel to `points`
    pub kept: Vec<usize>,

    /// Confirmed gaps as indices into `points`
    pub flags: Vec<usize>,

    /// Input indices that were removed
    pub dropped: Vec<usize>,
}

fn median_abs(steps: &[i64]) -> f64 {
    let mut sorted: Vec<i64> = steps.iter().map(|s| s.abs()).collect();
    sorted.sort_unstable();
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    }
}

/// Split a border at column jumps and drop short fragments.
///
/// A step is a jump when it exceeds `threshold` times the median step. A
/// run of adjacent jumps is treated as one split. At each split a side
/// with fewer than two points is dropped; otherwise both sides are
/// cleaned recursively and the split is kept as a confirmed gap.
pub fn split_outliers(points: &[BorderPoint], threshold: f64, max_depth: usize) -> OutlierSplit {
    let kept = split_indices(points, threshold, max_depth);
    finish(points, kept.0, kept.1)
}

/// Returns surviving input indices and gap markers. A gap marker is the
/// input index of the last point before the gap.
fn split_indices(points: &[BorderPoint], threshold: f64, depth: usize) -> (Vec<usize>, Vec<usize>) {
    let all: Vec<usize> = (0..points.len()).collect();
    if points.len() < 2 {
        return (all, Vec::new());
    }

    let steps: Vec<i64> = points.windows(2).map(|w| w[1].col - w[0].col).collect();
    let limit = threshold * median_abs(&steps);
    let mut splits: Vec<usize> = steps
        .iter()
        .enumerate()
        .filter(|(_, step)| step.abs() as f64 > limit)
        .map(|(i, _)| i)
        .collect();

    if splits.is_empty() {
        return (all, Vec::new());
    }
    if depth == 0 {
        warn!("Outlier split depth exhausted with {} jumps left", splits.len());
        return (all, Vec::new());
    }
    if splits.windows(2).all(|w| w[1] == w[0] + 1) {
        splits.truncate(1);
    }

    let mut kept = all;
    let mut gaps = Vec::new();

    for split in splits {
        // Points still kept on the near side of the jump
        let cut = kept.partition_point(|&k| k <= split);
        let (near, far) = kept.split_at(cut);

        if far.len() < 2 {
            debug!("Dropping {} trailing points after jump at {}", far.len(), split);
            kept.truncate(cut);
        } else if near.len() < 2 {
            debug!("Dropping {} leading points before jump at {}", near.len(), split);
            kept.drain(..cut);
        } else {
            let near_points: Vec<BorderPoint> = near.iter().map(|&k| points[k]).collect();
            let far_points: Vec<BorderPoint> = far.iter().map(|&k| points[k]).collect();

            let (near_kept, _) = split_indices(&near_points, threshold, depth - 1);
            let (far_kept, _) = split_indices(&far_points, threshold, depth - 1);

            let mut merged: Vec<usize> = near_kept.iter().map(|&k| near[k]).collect();
            if let Some(&last_near) = merged.last() {
                gaps.push(last_near);
            }
            merged.extend(far_kept.iter().map(|&k| far[k]));
            kept = merged;
        }
    }

    (kept, gaps)
}

fn finish(points: &[BorderPoint], kept: Vec<usize>, gaps: Vec<usize>) -> OutlierSplit {
    let mut flags: Vec<usize> = gaps
        .iter()
        .filter_map(|gap| kept.iter().position(|k| k == gap))
        .filter(|&pos| pos + 1 < kept.len())
        .collect();
    flags.sort_unstable();
    flags.dedup();

    let dropped = (0..points.len()).filter(|i| kept.binary_search(i).is_err()).collect();

    OutlierSplit {
        points: kept.iter().map(|&k| points[k]).collect(),
        kept,
        flags,
        dropped,
    }
}

/// Locate the left and right rail side on every edge row.
///
/// The outermost run boundaries are provisional sides; a rail run whose
/// inner edge lies within `rail_snap_ratio * row` of a side moves that side
/// to the rail's outer edge. Points on the bottom grid row are discarded
/// before outlier rejection.
pub fn locate_rail_sides(grid: &ClassGrid, edges: &RowEdges, config: &ZoneConfig) -> RailSides {
    let mut left = Vec::with_capacity(edges.len());
    let mut right = Vec::with_capacity(edges.len());

    for (&row, runs) in edges.iter().rev() {
        let (Some(min_start), Some(max_end)) = (
            runs.iter().map(|r| r.start).min(),
            runs.iter().map(|r| r.end).max(),
        ) else {
            continue;
        };

        let mut left_col = min_start as i64;
        let mut right_col = max_end as i64;
        let tolerance = row as f64 * config.rail_snap_ratio;

        for rail in scan_row(grid, row, &config.rail_values, config.rail_min_width) {
            if ((rail.end as i64 - left_col).abs() as f64) < tolerance {
                left_col = rail.start as i64;
            }
            if ((rail.start as i64 - right_col).abs() as f64) < tolerance {
                right_col = rail.end as i64;
            }
        }

        left.push(BorderPoint::new(left_col, row as i64));
        right.push(BorderPoint::new(right_col, row as i64));
    }

    let bottom = grid.rows() as i64 - 1;
    left.retain(|p| p.row != bottom);
    right.retain(|p| p.row != bottom);

    let left = split_outliers(&left, config.outlier_threshold, config.max_split_depth);
    let right = split_outliers(&right, config.outlier_threshold, config.max_split_depth);

    if !left.dropped.is_empty() || !right.dropped.is_empty() {
        debug!(
            "Outlier rejection dropped {} left / {} right points",
            left.dropped.len(),
            right.dropped.len()
        );
    }

    RailSides {
        left: left.points,
        right: right.points,
        left_flags: left.flags,
        right_flags: right.flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn border(cols: &[i64]) -> Vec<BorderPoint> {
        cols.iter()
            .enumerate()
            .map(|(i, &col)| BorderPoint::new(col, 900 - 10 * i as i64))
            .collect()
    }

    #[test]
    fn test_clean_border_untouched() {
        let points = border(&[100, 102, 104, 106, 108, 110]);
        let split = split_outliers(&points, 7.0, 32);
        assert_eq!(split.points, points);
        assert!(split.flags.is_empty());
        assert!(split.dropped.is_empty());
    }

    #[test]
    fn test_injected_outlier_removed_and_flagged() {
        // Median step 2, outlier 40 columns off
        let mut cols: Vec<i64> = (0..12).map(|i| 100 + 2 * i).collect();
        cols[6] += 40;
        let points = border(&cols);

        let split = split_outliers(&points, 7.0, 32);

        assert_eq!(split.dropped, vec![6]);
        assert!(!split.points.contains(&points[6]));
        assert_eq!(split.points.len(), 11);

        // The flagged gap straddles the removed row
        assert_eq!(split.flags, vec![5]);
        let near = split.points[5];
        let far = split.points[6];
        assert!(near.row > points[6].row && points[6].row > far.row);
    }

    #[test]
    fn test_real_discontinuity_kept_on_both_sides() {
        let mut cols: Vec<i64> = (0..6).map(|i| 100 + 2 * i).collect();
        cols.extend((0..6).map(|i| 300 + 2 * i));
        let points = border(&cols);

        let split = split_outliers(&points, 7.0, 32);
        assert_eq!(split.points, points);
        assert_eq!(split.flags, vec![5]);
    }

    #[test]
    fn test_short_tail_dropped() {
        let cols = [100, 102, 104, 106, 108, 400];
        let split = split_outliers(&border(&cols), 7.0, 32);
        assert_eq!(split.points.len(), 5);
        assert_eq!(split.dropped, vec![5]);
        assert!(split.flags.is_empty());
    }

    #[test]
    fn test_short_inputs() {
        assert!(split_outliers(&[], 7.0, 32).points.is_empty());
        let one = border(&[5]);
        assert_eq!(split_outliers(&one, 7.0, 32).points, one);
    }

    #[test]
    fn test_sides_snap_to_rails() {
        let mut grid = ClassGrid::filled(200, 400, 3);
        for row in 100..200 {
            grid.fill_span(row, 150, 161, 9);
            grid.fill_span(row, 161, 240, 0);
            grid.fill_span(row, 240, 251, 10);
        }
        let mut edges = RowEdges::new();
        edges.insert(150, scan_row(&grid, 150, &[0, 6], 19));
        edges.insert(120, scan_row(&grid, 120, &[0, 6], 19));

        let sides = locate_rail_sides(&grid, &edges, &ZoneConfig::default());
        assert_eq!(sides.left, vec![BorderPoint::new(150, 150), BorderPoint::new(150, 120)]);
        assert_eq!(sides.right, vec![BorderPoint::new(250, 150), BorderPoint::new(250, 120)]);
    }

    #[test]
    fn test_bottom_row_discarded() {
        let mut grid = ClassGrid::filled(100, 300, 3);
        for row in 0..100 {
            grid.fill_span(row, 100, 200, 0);
        }
        let mut edges = RowEdges::new();
        for row in [50, 70, 99] {
            edges.insert(row, scan_row(&grid, row, &[0, 6], 19));
        }

        let sides = locate_rail_sides(&grid, &edges, &ZoneConfig::default());
        assert!(sides.left.iter().all(|p| p.row != 99));
        assert_eq!(sides.left.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_cleaned_border_is_subsequence(
            cols in prop::collection::vec(0i64..1920, 0..60),
        ) {
            let points = border(&cols);
            let split = split_outliers(&points, 7.0, 32);

            prop_assert_eq!(split.points.len() + split.dropped.len(), points.len());
            for pair in split.kept.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for flag in &split.flags {
                prop_assert!(flag + 1 < split.points.len());
            }
        }
    }
}
