//! Discrete line drawing and line extrapolation

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pixel coordinate on a border curve. Columns may be negative before
/// clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BorderPoint {
    pub col: i64,
    pub row: i64,
}

impl BorderPoint {
    pub fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }

    /// Inside a `rows x cols` grid
    pub fn within(&self, rows: usize, cols: usize) -> bool {
        self.row >= 0 && self.col >= 0 && (self.row as usize) < rows && (self.col as usize) < cols
    }
}

/// Bresenham rasterization, both endpoints included
pub fn bresenham_line(from: BorderPoint, to: BorderPoint) -> Vec<BorderPoint> {
    let dx = (to.col - from.col).abs();
    let dy = -(to.row - from.row).abs();
    let sx = if from.col < to.col { 1 } else { -1 };
    let sy = if from.row < to.row { 1 } else { -1 };
    let mut err = dx + dy;

    let mut line = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    let (mut col, mut row) = (from.col, from.row);
    loop {
        line.push(BorderPoint::new(col, row));
        if col == to.col && row == to.row {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            col += sx;
        }
        if e2 <= dx {
            err += dx;
            row += sy;
        }
    }

    line
}

/// Connect vertices with Bresenham segments, without repeating joints
pub fn polyline(vertices: &[BorderPoint]) -> Vec<BorderPoint> {
    let mut path: Vec<BorderPoint> = Vec::new();
    for pair in vertices.windows(2) {
        let segment = bresenham_line(pair[0], pair[1]);
        let skip = usize::from(path.last() == segment.first());
        path.extend(segment.into_iter().skip(skip));
    }
    if path.is_empty() {
        path.extend(vertices.first().copied());
    }
    path
}

/// Least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    /// Fit over `(x, y)` samples. Constant `x` yields a flat line at the
    /// mean of `y`.
    pub fn fit(samples: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let samples: Vec<(f64, f64)> = samples.into_iter().collect();
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let mean_x = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var = 0.0;
        for (x, y) in &samples {
            cov += (x - mean_x) * (y - mean_y);
            var += (x - mean_x) * (x - mean_x);
        }

        let slope = if var > 0.0 { cov / var } else { 0.0 };
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Extend a pixel path past its last pixel until it leaves the grid.
///
/// The last `window` pixels are fitted in both orientations; the path is
/// walked one pixel at a time along the axis with the larger single-step
/// delta and the other coordinate is taken from the fit. Walking stops at
/// the grid edge or above `min_row`. Returns the new pixels in walking
/// order, or nothing when the path is shorter than `window`.
pub fn extrapolate(
    pixels: &[BorderPoint],
    rows: usize,
    cols: usize,
    min_row: i64,
    window: usize,
) -> Vec<BorderPoint> {
    if window < 2 || pixels.len() < window {
        debug!(
            "Not enough pixels to extrapolate ({} < {})",
            pixels.len(),
            window
        );
        return Vec::new();
    }

    let recent = &pixels[pixels.len() - window..];
    let (Some(col_of_row), Some(row_of_col)) = (
        LineFit::fit(recent.iter().map(|p| (p.row as f64, p.col as f64))),
        LineFit::fit(recent.iter().map(|p| (p.col as f64, p.row as f64))),
    ) else {
        return Vec::new();
    };

    // Largest single steps, most recent first on ties
    let mut col_step = 0i64;
    let mut row_step = 0i64;
    for pair in recent.windows(2).rev() {
        let dc = pair[1].col - pair[0].col;
        let dr = pair[1].row - pair[0].row;
        if dc.abs() > col_step.abs() {
            col_step = dc;
        }
        if dr.abs() > row_step.abs() {
            row_step = dr;
        }
    }

    let horizontal = col_step.abs() >= row_step.abs();
    let direction = if horizontal { col_step.signum() } else { row_step.signum() };
    let direction = if direction == 0 { 1 } else { direction };

    let mut current = recent[window - 1];
    let mut extended = Vec::new();
    loop {
        let next = if horizontal {
            let col = current.col + direction;
            BorderPoint::new(col, row_of_col.at(col as f64).round() as i64)
        } else {
            let row = current.row + direction;
            BorderPoint::new(col_of_row.at(row as f64).round() as i64, row)
        };

        if !next.within(rows, cols) || next.row < min_row {
            break;
        }
        extended.push(next);
        current = next;
    }

    extended
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(col: i64, row: i64) -> BorderPoint {
        BorderPoint::new(col, row)
    }

    #[test]
    fn test_bresenham_includes_endpoints() {
        let line = bresenham_line(p(0, 0), p(5, 2));
        assert_eq!(line.first(), Some(&p(0, 0)));
        assert_eq!(line.last(), Some(&p(5, 2)));
        assert_eq!(line.len(), 6);
    }

    #[test]
    fn test_bresenham_is_connected() {
        let line = bresenham_line(p(10, 3), p(-4, 17));
        for pair in line.windows(2) {
            assert!((pair[1].col - pair[0].col).abs() <= 1);
            assert!((pair[1].row - pair[0].row).abs() <= 1);
        }
    }

    #[test]
    fn test_bresenham_single_point() {
        assert_eq!(bresenham_line(p(3, 3), p(3, 3)), vec![p(3, 3)]);
    }

    #[test]
    fn test_polyline_has_no_repeated_joints() {
        let path = polyline(&[p(0, 0), p(0, 3), p(3, 3)]);
        assert_eq!(path.len(), 7);
        assert_eq!(path.first(), Some(&p(0, 0)));
        assert_eq!(path.last(), Some(&p(3, 3)));
    }

    #[test]
    fn test_line_fit() {
        let fit = LineFit::fit([(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);

        let flat = LineFit::fit([(4.0, 1.0), (4.0, 3.0)]).unwrap();
        assert_eq!(flat.slope, 0.0);
        assert!((flat.at(100.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolate_vertical_down_to_edge() {
        let pixels: Vec<BorderPoint> = (80..90).map(|row| p(40, row)).collect();
        let extended = extrapolate(&pixels, 100, 100, 0, 10);
        assert_eq!(extended.len(), 10);
        assert!(extended.iter().all(|q| q.col == 40));
        assert_eq!(extended.last(), Some(&p(40, 99)));
    }

    #[test]
    fn test_extrapolate_diagonal_reaches_side() {
        // Moving left and down at 2 columns per row
        let pixels: Vec<BorderPoint> = (0..20).map(|i| p(60 - 2 * i, 50 + i)).collect();
        let extended = extrapolate(&pixels, 100, 100, 0, 10);
        let last = extended.last().copied().unwrap();
        assert_eq!(last.col, 0);
        assert!(extended.iter().all(|q| q.within(100, 100)));
    }

    #[test]
    fn test_extrapolate_needs_window() {
        let pixels: Vec<BorderPoint> = (0..5).map(|row| p(1, row)).collect();
        assert!(extrapolate(&pixels, 10, 10, 0, 10).is_empty());
    }

    #[test]
    fn test_extrapolate_respects_min_row() {
        let pixels: Vec<BorderPoint> = (0..10).map(|i| p(20, 60 - i)).collect();
        let extended = extrapolate(&pixels, 100, 100, 45, 10);
        assert_eq!(extended.last(), Some(&p(20, 45)));
    }
}
