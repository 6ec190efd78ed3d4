//! End-to-end rendering through the pipeline.

mod common;

use std::sync::Arc;

use common::{clip_store, MemoryStore};
use ndarray::Array3;
use ndarray_npy::WriteNpyExt;
use signpose_media::{MemorySink, SkeletonSchema};
use signpose_models::{ClipLocation, FilterConfig, Keypoint, OutputSpec};
use signpose_worker::{ErrorKind, PipelineConfig, RenderPipeline};

fn toy_schema() -> SkeletonSchema {
    SkeletonSchema::new(
        "toy",
        3,
        vec![[0, 1]],
        vec![Some([255, 0, 0])],
        vec![Some([0, 255, 0]), Some([0, 255, 0]), None],
        None,
    )
    .unwrap()
}

fn clips(ids: &[usize]) -> Vec<ClipLocation> {
    ids.iter().map(|c| ClipLocation::new(format!("kp/{}", c))).collect()
}

fn npy(points: &[Keypoint]) -> Vec<u8> {
    let mut arr = Array3::<f32>::zeros((1, points.len(), 3));
    for (j, kp) in points.iter().enumerate() {
        arr[[0, j, 0]] = kp.x;
        arr[[0, j, 1]] = kp.y;
        arr[[0, j, 2]] = kp.confidence;
    }
    let mut buf = Vec::new();
    arr.write_npy(&mut buf).unwrap();
    buf
}

/// Two clips of two frames each; a figure walking to the right.
fn walking_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    for clip in 1..=2 {
        for frame in 1..=2 {
            let step = ((clip - 1) * 2 + frame) as f32 * 6.0;
            let points = [
                Keypoint::new(10.0 + step, 10.0, 0.9),
                Keypoint::new(10.0 + step, 40.0, 0.9),
                Keypoint::new(20.0 + step, 40.0, 0.9),
            ];
            store.put(format!("kp/{}/{}.npy", clip, frame), npy(&points));
        }
    }
    store
}

fn pipeline(store: MemoryStore, work_dir: &std::path::Path) -> RenderPipeline {
    RenderPipeline::new(
        PipelineConfig::default().with_work_dir(work_dir),
        Arc::new(store),
    )
}

#[tokio::test]
async fn test_two_clips_render_in_order_and_deterministically() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(walking_store(), dir.path());
    let output = OutputSpec::default().with_size(64, 48);
    let filter = FilterConfig::gaussian(1);

    let first = pipeline
        .render_to_sink(&clips(&[1, 2]), &filter, &toy_schema(), &output, MemorySink::new())
        .await
        .unwrap();
    assert_eq!(first.frames, 4);
    assert_eq!(first.skipped_frames, 0);
    assert!(first.sink.is_finished());

    let frames = first.sink.into_frames();
    let ids: Vec<u64> = frames.iter().map(|f| f.sequence_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert!(frames.iter().all(|f| f.pixels.len() == 64 * 48 * 3));
    assert!(frames.windows(2).all(|w| w[0].pixels != w[1].pixels));

    let second = pipeline
        .render_to_sink(&clips(&[1, 2]), &filter, &toy_schema(), &output, MemorySink::new())
        .await
        .unwrap();
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(frames, second.sink.into_frames());
}

#[tokio::test]
async fn test_detection_frames_are_remapped_for_display_schema() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(clip_store(1, 3, 133), dir.path());
    let outcome = pipeline
        .render_to_sink(
            &clips(&[1]),
            &FilterConfig::gaussian(3),
            &SkeletonSchema::coco_wholebody_openpose(),
            &OutputSpec::default(),
            MemorySink::new(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.frames, 3);
}

#[tokio::test]
async fn test_schema_count_mismatch_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(clip_store(1, 2, 5), dir.path());
    let err = pipeline
        .render_to_sink(
            &clips(&[1]),
            &FilterConfig::default(),
            &toy_schema(),
            &OutputSpec::default(),
            MemorySink::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_invalid_filter_fails_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    // The store is empty: reaching it would produce a source data error instead.
    let pipeline = pipeline(MemoryStore::new(), dir.path());
    let err = pipeline
        .render_to_sink(
            &clips(&[1]),
            &FilterConfig::gaussian(0),
            &toy_schema(),
            &OutputSpec::default(),
            MemorySink::new(),
        )
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_no_frames_is_source_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(MemoryStore::new(), dir.path());
    let err = pipeline
        .render_to_sink(
            &clips(&[1, 2]),
            &FilterConfig::default(),
            &toy_schema(),
            &OutputSpec::default(),
            MemorySink::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceData);
}

#[tokio::test]
async fn test_failed_render_leaves_no_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.webm");
    let pipeline = pipeline(walking_store(), &dir.path().join("work"));
    let err = pipeline
        .render(
            &clips(&[1, 2]),
            &FilterConfig::default(),
            &toy_schema(),
            &OutputSpec::default().with_size(63, 48),
            &output_path,
        )
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(!output_path.exists());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_render_writes_video_file() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out").join("signs.webm");
    let pipeline = pipeline(walking_store(), &dir.path().join("work"));
    let outcome = pipeline
        .render(
            &clips(&[1, 2]),
            &FilterConfig::gaussian(3),
            &toy_schema(),
            &OutputSpec::default().with_size(64, 48),
            &output_path,
        )
        .await
        .unwrap();
    assert_eq!(outcome.frames, 4);
    assert_eq!(outcome.output_path, output_path);
    assert!(output_path.exists());
}
