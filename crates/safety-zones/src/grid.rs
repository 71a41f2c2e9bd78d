//! Segmentation class grid

use ndarray::{Array2, ArrayView1};

use crate::ZoneError;

/// Per-pixel class IDs, row 0 at the top of the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassGrid {
    cells: Array2<u8>,
}

impl ClassGrid {
    /// Wrap an existing array (shape = rows x cols)
    pub fn new(cells: Array2<u8>) -> Self {
        Self { cells }
    }

    /// Build from row-major data
    pub fn from_vec(rows: usize, cols: usize, data: Vec<u8>) -> Result<Self, ZoneError> {
        let cells = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| ZoneError::GridData(e.to_string()))?;
        Ok(Self { cells })
    }

    /// Grid filled with a single class value
    pub fn filled(rows: usize, cols: usize, value: u8) -> Self {
        Self {
            cells: Array2::from_elem((rows, cols), value),
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    /// Get class at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.cells.get((row, col)).copied()
    }

    /// Set class at (row, col); out-of-bounds writes are ignored
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        if let Some(cell) = self.cells.get_mut((row, col)) {
            *cell = value;
        }
    }

    /// Set a signed coordinate, ignoring anything outside the grid
    pub fn set_signed(&mut self, row: i64, col: i64, value: u8) {
        if row >= 0 && col >= 0 {
            self.set(row as usize, col as usize, value);
        }
    }

    /// Paint columns `[start, end)` of one row, clamped to the grid
    pub fn fill_span(&mut self, row: usize, start: usize, end: usize, value: u8) {
        if row >= self.rows() {
            return;
        }
        let end = end.min(self.cols());
        for col in start.min(end)..end {
            self.cells[[row, col]] = value;
        }
    }

    /// View of one row
    pub fn row(&self, row: usize) -> ArrayView1<'_, u8> {
        self.cells.row(row)
    }

    /// Underlying array
    pub fn cells(&self) -> &Array2<u8> {
        &self.cells
    }

    pub fn into_inner(self) -> Array2<u8> {
        self.cells
    }

    /// Fail unless the grid has the expected shape
    pub fn ensure_shape(&self, rows: usize, cols: usize) -> Result<(), ZoneError> {
        if self.rows() != rows || self.cols() != cols {
            return Err(ZoneError::GridShape {
                expected_rows: rows,
                expected_cols: cols,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(())
    }

    /// Resize using nearest neighbor (class IDs must not be blended)
    pub fn resize_nearest(&self, new_rows: usize, new_cols: usize) -> ClassGrid {
        if new_rows == 0 || new_cols == 0 || self.rows() == 0 || self.cols() == 0 {
            return ClassGrid::new(Array2::zeros((new_rows, new_cols)));
        }

        let row_ratio = self.rows() as f64 / new_rows as f64;
        let col_ratio = self.cols() as f64 / new_cols as f64;
        let last_row = self.rows() - 1;
        let last_col = self.cols() - 1;

        let cells = Array2::from_shape_fn((new_rows, new_cols), |(r, c)| {
            let src_r = ((r as f64 * row_ratio).floor() as usize).min(last_row);
            let src_c = ((c as f64 * col_ratio).floor() as usize).min(last_col);
            self.cells[[src_r, src_c]]
        });

        ClassGrid::new(cells)
    }

    /// First and last row containing any of `values`
    pub fn track_extent(&self, values: &[u8]) -> Option<(usize, usize)> {
        let mut rows = self
            .cells
            .outer_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|v| values.contains(v)))
            .map(|(idx, _)| idx);

        let top = rows.next()?;
        let bottom = rows.last().unwrap_or(top);
        Some((top, bottom))
    }
}

/// Rows to scan for edges ("clues").
///
/// Walks up from the bottom of the track region in equal steps and adds
/// one row half a step below its top.
pub fn sample_clue_rows(grid: &ClassGrid, values: &[u8], count: usize) -> Vec<usize> {
    let Some((top, bottom)) = grid.track_extent(values) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }

    let step = ((bottom - top) as f64 / count as f64 + 1.0) as usize;
    let mut rows: Vec<usize> = (0..count)
        .filter_map(|i| bottom.checked_sub(i * step))
        .collect();
    rows.push(top + step / 2);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banded_grid() -> ClassGrid {
        // Track class only on rows 20..=79
        let mut grid = ClassGrid::filled(100, 50, 3);
        for row in 20..80 {
            grid.fill_span(row, 10, 40, 0);
        }
        grid
    }

    #[test]
    fn test_from_vec_shape_checked() {
        assert!(ClassGrid::from_vec(2, 3, vec![0; 6]).is_ok());
        assert!(ClassGrid::from_vec(2, 3, vec![0; 5]).is_err());
    }

    #[test]
    fn test_track_extent() {
        let grid = banded_grid();
        assert_eq!(grid.track_extent(&[0, 6]), Some((20, 79)));
        assert_eq!(grid.track_extent(&[9]), None);
    }

    #[test]
    fn test_clue_rows_walk_up_from_bottom() {
        let grid = banded_grid();
        let rows = sample_clue_rows(&grid, &[0, 6], 5);
        // step = trunc(59 / 5 + 1) = 12
        assert_eq!(rows, vec![79, 67, 55, 43, 31, 26]);
    }

    #[test]
    fn test_clue_rows_empty_without_track() {
        let grid = ClassGrid::filled(10, 10, 3);
        assert!(sample_clue_rows(&grid, &[0, 6], 5).is_empty());
    }

    #[test]
    fn test_resize_nearest_keeps_classes() {
        let grid = ClassGrid::from_vec(2, 2, vec![0, 6, 9, 10]).unwrap();
        let big = grid.resize_nearest(4, 4);
        assert_eq!(big.get(0, 0), Some(0));
        assert_eq!(big.get(1, 3), Some(6));
        assert_eq!(big.get(3, 0), Some(9));
        assert_eq!(big.get(3, 3), Some(10));
    }

    #[test]
    fn test_ensure_shape() {
        let grid = ClassGrid::filled(1080, 1920, 3);
        assert!(grid.ensure_shape(1080, 1920).is_ok());
        assert!(matches!(
            grid.ensure_shape(1920, 1080),
            Err(ZoneError::GridShape { .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_writes_ignored() {
        let mut grid = ClassGrid::filled(3, 3, 0);
        grid.set(5, 5, 30);
        grid.set_signed(-1, 1, 30);
        grid.fill_span(1, 2, 10, 30);
        assert_eq!(grid.get(1, 2), Some(30));
        assert_eq!(grid.cells().iter().filter(|v| **v == 30).count(), 1);
    }
}
