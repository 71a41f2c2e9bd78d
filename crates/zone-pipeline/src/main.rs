//! Railway Safety Zones - Main Entry Point
//!
//! Usage: `zone-pipeline [config.toml]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use scene_input::{list_images, JsonDetectionProvider, LabelMaskProvider};
use tracing::{info, warn};
use zone_pipeline::{init_logging, run_batch, PipelineConfig, ZonePipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    init_logging(&config.log_level, config.log_json)?;

    info!("=== Railway Safety Zones v{} ===", env!("CARGO_PKG_VERSION"));

    let images = list_images(config.dataset, &config.image_dir, config.manifest.as_deref())
        .context("Failed to list images")?;

    let segmentation = LabelMaskProvider::new(
        &config.label_dir,
        config.output_resolution.rows,
        config.output_resolution.cols,
    );
    let detection = JsonDetectionProvider::new(&config.detection_dir);
    let pipeline = Arc::new(ZonePipeline::new(&config, segmentation, detection)?);

    let summary = run_batch(pipeline, images, config.max_parallel).await;

    for (image, message) in &summary.failed {
        warn!("{}: {}", image.display(), message);
    }
    info!(
        "Done: {} images, {} detections inside zones",
        summary.processed(),
        summary.in_zone_count()
    );

    Ok(())
}
