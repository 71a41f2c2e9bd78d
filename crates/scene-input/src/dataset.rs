//! Dataset layouts

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::InputError;

/// Image extensions picked up from a directory
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// How the image list is discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// Every image in the image directory
    #[default]
    Railsem19,
    /// Images listed in a JSON manifest
    Pilsen,
}

/// List the images to process, sorted for railsem19 and in manifest order
/// for pilsen. Relative manifest paths are resolved against `image_dir`.
pub fn list_images(
    dataset: Dataset,
    image_dir: &Path,
    manifest: Option<&Path>,
) -> Result<Vec<PathBuf>, InputError> {
    let images = match dataset {
        Dataset::Railsem19 => scan_directory(image_dir)?,
        Dataset::Pilsen => {
            let manifest = manifest
                .ok_or_else(|| InputError::Manifest("pilsen dataset requires a manifest".to_string()))?;
            let body = std::fs::read_to_string(manifest).map_err(|source| InputError::Io {
                path: manifest.to_path_buf(),
                source,
            })?;
            parse_manifest(&body)?
                .into_iter()
                .map(|p| if p.is_absolute() { p } else { image_dir.join(p) })
                .collect()
        }
    };

    info!("Found {} images ({:?})", images.len(), dataset);
    Ok(images)
}

fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let entries = std::fs::read_dir(dir).map_err(|source| InputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    Ok(images)
}

/// Manifest layout: `{"data": [[<any>, {"path": "..."}], ...]}`
pub fn parse_manifest(body: &str) -> Result<Vec<PathBuf>, InputError> {
    let root: Value = serde_json::from_str(body)?;
    let entries = root
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| InputError::Manifest("missing \"data\" array".to_string()))?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .get(1)
                .and_then(|meta| meta.get("path"))
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .ok_or_else(|| InputError::Manifest(format!("entry {} has no path", i)))
        })
        .collect()
}
