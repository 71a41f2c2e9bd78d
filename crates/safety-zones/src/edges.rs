//! Row edge extraction
//!
//! Scans sampled rows for contiguous runs of track classes. Runs touching
//! the image border are cut off rather than real edges and are dropped.
//! Adjacent guard-rail pixels are absorbed into a run, and runs split by a
//! narrow gap are merged unless neighbouring rows show the gap is a real
//! structure (a level crossing, a diverging track).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ZoneConfig;
use crate::grid::ClassGrid;

/// Inclusive column span of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub start: usize,
    pub end: usize,
}

impl Run {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of pixels in the run
    pub fn pixel_width(&self) -> usize {
        self.end - self.start + 1
    }

    /// Boundary-to-boundary distance, used as the gauge measure
    pub fn span(&self) -> usize {
        self.end - self.start
    }

    fn distance(&self, other: &Run) -> f64 {
        let ds = self.start as f64 - other.start as f64;
        let de = self.end as f64 - other.end as f64;
        (ds * ds + de * de).sqrt()
    }
}

/// Track runs per scanned row; rows without runs are absent
pub type RowEdges = BTreeMap<usize, Vec<Run>>;

/// Find runs of `values` on one row.
///
/// Membership is padded with a false sentinel at both ends, so every run
/// has a rising and a falling transition.
pub fn scan_row(grid: &ClassGrid, row: usize, values: &[u8], min_width: usize) -> Vec<Run> {
    if row >= grid.rows() || grid.cols() == 0 {
        return Vec::new();
    }

    let cols = grid.cols();
    let last_col = cols - 1;
    let line = grid.row(row);

    let mut runs = Vec::new();
    let mut start = None;
    for col in 0..=cols {
        let member = col < cols && values.contains(&line[col]);
        match (start, member) {
            (None, true) => start = Some(col),
            (Some(s), false) => {
                runs.push(Run::new(s, col - 1));
                start = None;
            }
            _ => {}
        }
    }

    runs.retain(|run| run.pixel_width() >= min_width.max(1) && run.start > 0 && run.end < last_col);
    runs
}

/// Absorb contiguous guard-rail pixels on both sides of a run.
///
/// The walk stops one column short of the frame edge, so an extended run
/// never touches the border.
pub fn extend_through_guard(grid: &ClassGrid, row: usize, run: Run, guard: u8, reach: usize) -> Run {
    let line = grid.row(row);
    let last_col = grid.cols().saturating_sub(1);

    let left = (1..=reach)
        .take_while(|d| run.start > *d && line[run.start - d] == guard)
        .count();
    let right = (1..=reach)
        .take_while(|d| run.end + d < last_col && line[run.end + d] == guard)
        .count();

    Run::new(run.start - left, run.end + right)
}

/// Rows probed above and below `row` when judging a gap
fn probe_rows(row: usize, offset: usize, rows: usize) -> (usize, usize) {
    let last_row = rows.saturating_sub(1);

    let mut up = row.saturating_sub(offset);
    if up == 0 {
        up = row + 2 * offset;
    }
    let mut down = (row + offset).min(last_row);
    if down == last_row {
        down = row.saturating_sub(2 * offset);
    }

    (up.min(last_row), down.min(last_row))
}

/// Greedy nearest pairing, driven by the shorter list.
///
/// Returns `(current, probe)` pairs; every run is used at most once.
fn nearest_pairs(current: &[Run], probe: &[Run]) -> Vec<(Run, Run)> {
    let swap = probe.len() < current.len();
    let (base, compare) = if swap { (probe, current) } else { (current, probe) };

    let mut used = vec![false; compare.len()];
    let mut pairs = Vec::with_capacity(base.len());

    for item in base {
        let nearest = compare
            .iter()
            .enumerate()
            .filter(|(idx, _)| !used[*idx])
            .min_by(|(_, a), (_, b)| item.distance(a).total_cmp(&item.distance(b)));

        let Some((idx, other)) = nearest else {
            break;
        };
        used[idx] = true;
        pairs.push(if swap { (*other, *item) } else { (*item, *other) });
    }

    pairs
}

/// True when a gap between `left_end` and `right_start` moves between
/// neighbouring rows, i.e. it belongs to a real structure.
fn gap_is_structural(
    grid: &ClassGrid,
    row: usize,
    runs: &[Run],
    left_end: usize,
    right_start: usize,
    config: &ZoneConfig,
) -> bool {
    let (up, down) = probe_rows(row, config.probe_offset, grid.rows());

    let mut displacements = Vec::new();
    for probe in [up, down] {
        let probe_runs = scan_row(grid, probe, &config.track_values, config.track_min_width);
        for (cur, other) in nearest_pairs(runs, &probe_runs) {
            for boundary in [right_start, left_end] {
                if cur.start == boundary {
                    displacements.push(boundary.abs_diff(other.start));
                }
                if cur.end == boundary {
                    displacements.push(boundary.abs_diff(other.end));
                }
            }
        }
    }

    displacements
        .iter()
        .any(|d| *d > config.max_probe_displacement)
}

/// Merge runs separated by a narrow gap unless the gap is structural
pub fn merge_split_runs(grid: &ClassGrid, row: usize, runs: &[Run], config: &ZoneConfig) -> Vec<Run> {
    let Some((first, rest)) = runs.split_first() else {
        return Vec::new();
    };

    let mut merged = vec![*first];
    for run in rest {
        let Some(last) = merged.last_mut() else {
            break;
        };
        let gap = run.start.saturating_sub(last.end);

        if gap < config.merge_gap && !gap_is_structural(grid, row, runs, last.end, run.start, config) {
            debug!("Row {}: merging runs across {}px gap", row, gap);
            last.end = run.end;
        } else {
            merged.push(*run);
        }
    }

    merged
}

/// Extract track runs on every sampled row
pub fn extract_row_edges(grid: &ClassGrid, rows: &[usize], config: &ZoneConfig) -> RowEdges {
    let mut edges = RowEdges::new();

    for &row in rows {
        if row >= grid.rows() {
            debug!("Skipping clue row {} outside grid", row);
            continue;
        }

        let runs: Vec<Run> = scan_row(grid, row, &config.track_values, config.track_min_width)
            .into_iter()
            .map(|run| extend_through_guard(grid, row, run, config.guard_value, config.guard_reach))
            .collect();

        if !runs.is_empty() {
            edges.insert(row, runs);
        }
    }

    for (row, runs) in edges.iter_mut() {
        *runs = merge_split_runs(grid, *row, runs, config);
    }

    edges
}
