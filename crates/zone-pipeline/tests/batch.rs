mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::*;
use zone_pipeline::{run_batch, PipelineConfig, ZonePipeline};

#[tokio::test]
async fn test_batch_survives_failures() {
    let pipeline = Arc::new(
        ZonePipeline::new(
            &test_config(),
            SyntheticSegmentation,
            FixedDetections(vec![detection(0, 960.0, 1000.0)]),
        )
        .unwrap(),
    );

    let images = vec![
        PathBuf::from("a.jpg"),
        PathBuf::from("bad.jpg"),
        PathBuf::from("b.jpg"),
        PathBuf::from("small.jpg"),
        PathBuf::from("c.jpg"),
    ];

    let summary = run_batch(pipeline, images, 2).await;

    let done: Vec<PathBuf> = summary.reports.iter().map(|r| r.image.clone()).collect();
    assert_eq!(done, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg"), PathBuf::from("c.jpg")]);

    let failed: Vec<PathBuf> = summary.failed.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(failed, vec![PathBuf::from("bad.jpg"), PathBuf::from("small.jpg")]);

    assert_eq!(summary.in_zone_count(), 3);
}

#[tokio::test]
async fn test_batch_writes_outputs() {
    let dir = std::env::temp_dir().join(format!("zone-batch-{}", std::process::id()));
    let config = PipelineConfig {
        output_dir: Some(dir.clone()),
        visualize: true,
        ..test_config()
    };
    let pipeline = Arc::new(ZonePipeline::new(&config, SyntheticSegmentation, FixedDetections(Vec::new())).unwrap());

    let summary = run_batch(pipeline, vec![PathBuf::from("scene_42.jpg")], 1).await;
    assert_eq!(summary.processed(), 1);
    assert!(dir.join("scene_42.json").exists());
    assert!(dir.join("scene_42_zones.png").exists());

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_empty_batch() {
    let pipeline = Arc::new(ZonePipeline::new(&test_config(), SyntheticSegmentation, FixedDetections(Vec::new())).unwrap());
    let summary = run_batch(pipeline, Vec::new(), 4).await;
    assert_eq!(summary.processed(), 0);
    assert!(summary.failed.is_empty());
}
