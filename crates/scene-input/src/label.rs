//! Label-mask segmentation provider

use std::path::{Path, PathBuf};

use image::GrayImage;
use safety_zones::ClassGrid;
use tracing::debug;

use crate::{image_stem, InputError, SegmentationProvider};

/// Reads `<stem>.png` class masks from a directory.
///
/// Masks are single-channel images whose pixel values are class IDs. They
/// are resized with nearest-neighbor sampling to the output resolution.
#[derive(Debug, Clone)]
pub struct LabelMaskProvider {
    label_dir: PathBuf,
    rows: usize,
    cols: usize,
}

impl LabelMaskProvider {
    pub fn new(label_dir: impl Into<PathBuf>, rows: usize, cols: usize) -> Self {
        Self {
            label_dir: label_dir.into(),
            rows,
            cols,
        }
    }

    /// Mask path for an image
    pub fn mask_path(&self, image: &Path) -> Result<PathBuf, InputError> {
        Ok(self.label_dir.join(format!("{}.png", image_stem(image)?)))
    }
}

impl SegmentationProvider for LabelMaskProvider {
    fn classify(&self, image: &Path) -> Result<ClassGrid, InputError> {
        let path = self.mask_path(image)?;
        if !path.exists() {
            return Err(InputError::NotFound(path));
        }

        let mask = image::open(&path)?.to_luma8();
        debug!(
            "Loaded mask {} ({}x{})",
            path.display(),
            mask.width(),
            mask.height()
        );

        let grid = gray_to_grid(mask)?;
        if grid.rows() == self.rows && grid.cols() == self.cols {
            return Ok(grid);
        }
        Ok(grid.resize_nearest(self.rows, self.cols))
    }
}

fn gray_to_grid(mask: GrayImage) -> Result<ClassGrid, InputError> {
    let (cols, rows) = (mask.width() as usize, mask.height() as usize);
    ClassGrid::from_vec(rows, cols, mask.into_raw()).map_err(|e| InputError::Mask(e.to_string()))
}

/// Write a class grid as a grayscale PNG
pub fn export_grid(grid: &ClassGrid, path: &Path) -> Result<(), InputError> {
    let data: Vec<u8> = grid.cells().iter().copied().collect();
    let image = GrayImage::from_raw(grid.cols() as u32, grid.rows() as u32, data)
        .ok_or_else(|| InputError::Mask("grid buffer does not match its shape".to_string()))?;
    image.save(path)?;
    debug!("Exported annotated grid to {}", path.display());
    Ok(())
}
