//! Per-image driver: segmentation, zones, detections, classification

use std::path::{Path, PathBuf};

use metrics::counter;
use safety_zones::{
    annotate, classify_detections, Allowlists, ClassGrid, ClassifiedDetection, DetectionFrame,
    ZoneEngine, ZoneSet,
};
use scene_input::{export_grid, DetectionProvider, DetectorOutput, DetectorSettings, SegmentationProvider};
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, Resolution};
use crate::report::{ImageReport, ZoneSummary, NO_ACCEPTED_DETECTIONS};
use crate::PipelineError;

/// Zones, annotations and classified detections for one grid
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub zone_set: ZoneSet,

    /// Copy of the input grid with markers painted
    pub annotated: ClassGrid,

    pub detections: Vec<ClassifiedDetection>,

    /// Detections that passed the class allowlists
    pub accepted: usize,
}

/// Safety-zone pipeline over a segmentation and a detection provider
pub struct ZonePipeline<S, D> {
    engine: ZoneEngine,
    segmentation: S,
    detection: D,
    detector: DetectorSettings,
    allowlists: Allowlists,
    resolution: Resolution,
    detector_fallback: Resolution,
    output_dir: Option<PathBuf>,
    visualize: bool,
}

impl<S, D> ZonePipeline<S, D>
where
    S: SegmentationProvider,
    D: DetectionProvider,
{
    /// Create a new pipeline
    pub fn new(config: &PipelineConfig, segmentation: S, detection: D) -> Result<Self, PipelineError> {
        let engine = ZoneEngine::new(config.zones.clone())?;
        info!(
            "Creating zone pipeline: {}x{} grid, targets {:?}mm",
            config.output_resolution.rows, config.output_resolution.cols, config.zones.target_distances_mm
        );

        Ok(Self {
            engine,
            segmentation,
            detection,
            detector: config.detector.clone(),
            allowlists: config.allowlists.clone(),
            resolution: config.output_resolution,
            detector_fallback: config.image_size,
            output_dir: config.output_dir.clone(),
            visualize: config.visualize,
        })
    }

    /// Build zones on `grid` and classify the detector output against them.
    /// The input grid is not modified.
    pub fn evaluate(&self, grid: &ClassGrid, output: &DetectorOutput) -> Evaluation {
        let marker = self.engine.config().marker_value;
        let zone_set = self.engine.analyze(grid);

        let mut annotated = grid.clone();
        annotate::mark_edges(&mut annotated, &zone_set.edges, marker);
        for (zone, spans) in zone_set.zones.iter().zip(&zone_set.offset_spans) {
            annotate::mark_offsets(&mut annotated, spans, marker);
            annotate::mark_borders(&mut annotated, zone, marker);
        }

        let grouped = self.allowlists.group(&output.detections);
        let accepted = grouped.count();
        let frame = self.detection_frame(output);
        let detections = classify_detections(
            &grouped,
            &zone_set.zones,
            &frame,
            &self.engine.config().palette,
        );
        annotate::mark_detections(&mut annotated, &detections, marker);

        Evaluation {
            zone_set,
            annotated,
            detections,
            accepted,
        }
    }

    fn detection_frame(&self, output: &DetectorOutput) -> DetectionFrame {
        let (detector_rows, detector_cols) = if output.image_rows == 0 || output.image_cols == 0 {
            debug!("Detector reported no frame size, using configured image size");
            (self.detector_fallback.rows, self.detector_fallback.cols)
        } else {
            (output.image_rows, output.image_cols)
        };

        DetectionFrame {
            detector_rows,
            detector_cols,
            output_rows: self.resolution.rows,
            output_cols: self.resolution.cols,
        }
    }

    /// Process one image end to end
    pub fn process(&self, image: &Path) -> Result<ImageReport, PipelineError> {
        counter!("zone_pipeline_images_total").increment(1);

        let result = self.process_inner(image);
        if let Err(e) = &result {
            counter!("zone_pipeline_image_failures_total").increment(1);
            warn!("Failed to process {}: {}", image.display(), e);
        }
        result
    }

    fn process_inner(&self, image: &Path) -> Result<ImageReport, PipelineError> {
        let grid = self.segmentation.classify(image)?;
        grid.ensure_shape(self.resolution.rows, self.resolution.cols)?;

        let output = self.detection.detect(image, &self.detector)?;
        let evaluation = self.evaluate(&grid, &output);

        for detection in &evaluation.detections {
            let zone = if detection.in_zone() {
                detection.criticality.to_string()
            } else {
                "outside".to_string()
            };
            counter!("zone_pipeline_detections_total", "zone" => zone).increment(1);
        }

        let mut notes = Vec::new();
        if evaluation.accepted == 0 {
            notes.push(NO_ACCEPTED_DETECTIONS.to_string());
        }

        let report = ImageReport {
            image: image.to_path_buf(),
            grid_rows: grid.rows(),
            grid_cols: grid.cols(),
            clue_rows: evaluation.zone_set.clue_rows.clone(),
            zones: evaluation.zone_set.zones.iter().map(ZoneSummary::from).collect(),
            detections: evaluation.detections,
            notes,
        };

        if let Some(dir) = &self.output_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| PipelineError::Output(format!("creating {}: {}", dir.display(), e)))?;
            let path = report.write_json(dir)?;
            debug!("Wrote report {}", path.display());

            if self.visualize {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
                export_grid(&evaluation.annotated, &dir.join(format!("{}_zones.png", stem)))?;
            }
        }

        info!(
            "{}: {} zones, {} detections ({} in zone)",
            image.display(),
            report.zones.len(),
            report.detections.len(),
            report.in_zone_count()
        );
        Ok(report)
    }
}
