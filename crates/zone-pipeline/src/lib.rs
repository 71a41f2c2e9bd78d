//! Railway Safety-Zone Pipeline
//!
//! Drives the zone geometry over a dataset:
//! - Configuration from file and `RAILZONE__*` environment
//! - Per-image segmentation, zone building and detection classification
//! - Bounded-concurrency batch processing
//! - JSON reports and optional annotated grids

pub mod batch;
pub mod config;
pub mod pipeline;
pub mod report;

pub use batch::{run_batch, BatchSummary};
pub use config::{PipelineConfig, Resolution};
pub use pipeline::{Evaluation, ZonePipeline};
pub use report::{ImageReport, ZoneSummary, NO_ACCEPTED_DETECTIONS};

use safety_zones::ZoneError;
use scene_input::InputError;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration loading failed: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Zone geometry error: {0}")]
    Zone(#[from] ZoneError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Initialize logging
pub fn init_logging(level: &str, json: bool) -> Result<(), PipelineError> {
    let level: Level = level
        .parse()
        .map_err(|_| PipelineError::Logging(format!("unknown log level: {}", level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    result.map_err(|e| PipelineError::Logging(e.to_string()))
}
