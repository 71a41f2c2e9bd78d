//! Concurrent batch runner

use std::path::PathBuf;
use std::sync::Arc;

use scene_input::{DetectionProvider, SegmentationProvider};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::pipeline::ZonePipeline;
use crate::report::ImageReport;

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Successful reports, in input order
    pub reports: Vec<ImageReport>,

    /// Failed images with the error message, in input order
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.reports.len()
    }

    /// Detections inside at least one zone, over all images
    pub fn in_zone_count(&self) -> usize {
        self.reports.iter().map(ImageReport::in_zone_count).sum()
    }
}

/// Process images on the blocking pool, at most `max_parallel` at a time.
///
/// A failing image is recorded and the rest of the batch continues.
pub async fn run_batch<S, D>(
    pipeline: Arc<ZonePipeline<S, D>>,
    images: Vec<PathBuf>,
    max_parallel: usize,
) -> BatchSummary
where
    S: SegmentationProvider + 'static,
    D: DetectionProvider + 'static,
{
    let total = images.len();
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut tasks = JoinSet::new();

    info!("Processing {} images ({} in parallel)", total, max_parallel.max(1));

    for (index, image) in images.into_iter().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let permit = semaphore.acquire_owned().await;
            let path = image.clone();
            let result = tokio::task::spawn_blocking(move || pipeline.process(&path))
                .await
                .map_err(|e| format!("worker task failed: {}", e))
                .and_then(|r| r.map_err(|e| e.to_string()));
            drop(permit);
            (index, image, result)
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!("Batch task aborted: {}", e),
        }
    }
    outcomes.sort_by_key(|(index, _, _)| *index);

    let mut summary = BatchSummary::default();
    for (_, image, result) in outcomes {
        match result {
            Ok(report) => summary.reports.push(report),
            Err(message) => summary.failed.push((image, message)),
        }
    }

    info!(
        "Batch complete: {} processed, {} failed",
        summary.processed(),
        summary.failed.len()
    );
    summary
}
