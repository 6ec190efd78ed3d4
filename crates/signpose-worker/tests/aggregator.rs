//! Clip concatenation, ordering and frame policies.

mod common;

use std::sync::Arc;

use common::{clip_store, frame_npy, MemoryStore};
use signpose_models::{ClipLocation, FramePolicy};
use signpose_worker::{ErrorKind, KeypointAggregator};

fn clips(ids: &[usize]) -> Vec<ClipLocation> {
    ids.iter().map(|c| ClipLocation::new(format!("kp/{}", c))).collect()
}

/// Clip and frame encoded into the first keypoint's x by the fixture.
fn origin(x: f32) -> (usize, usize) {
    let v = x as usize;
    (v / 1000, v % 1000)
}

#[tokio::test]
async fn test_three_clips_get_contiguous_ids_in_caller_order() {
    let n = 12;
    let store = Arc::new(clip_store(3, n, 5));
    let agg = KeypointAggregator::new(store, FramePolicy::Abort)
        .aggregate(&clips(&[2, 3, 1]))
        .await
        .unwrap();

    assert_eq!(agg.poses.len(), 3 * n);
    assert_eq!(agg.stats.clips, 3);
    assert_eq!(agg.stats.frames, 3 * n);
    assert_eq!(agg.stats.skipped, 0);
    assert_eq!(agg.num_keypoints(), Some(5));

    let ids: Vec<u64> = agg.poses.iter().map(|p| p.sequence_id).collect();
    assert_eq!(ids, (1..=(3 * n) as u64).collect::<Vec<_>>());

    let order: Vec<(usize, usize)> = agg.poses.iter().map(|p| origin(p.keypoints[0].x)).collect();
    let expected: Vec<(usize, usize)> = [2, 3, 1]
        .iter()
        .flat_map(|&c| (1..=n).map(move |f| (c, f)))
        .collect();
    assert_eq!(order, expected);
}

#[tokio::test]
async fn test_parallel_reads_do_not_change_order() {
    let store = Arc::new(clip_store(6, 10, 3));
    let order = [4, 1, 6, 2, 5, 3];
    let serial = KeypointAggregator::new(store.clone(), FramePolicy::Abort)
        .with_max_parallel_reads(1)
        .aggregate(&clips(&order))
        .await
        .unwrap();
    let parallel = KeypointAggregator::new(store, FramePolicy::Abort)
        .with_max_parallel_reads(6)
        .aggregate(&clips(&order))
        .await
        .unwrap();
    assert_eq!(serial.poses, parallel.poses);
}

#[tokio::test]
async fn test_similar_prefixes_do_not_leak() {
    let mut store = MemoryStore::new();
    store.put("kp/1/1.npy", frame_npy(1, 1, 3));
    store.put("kp/10/1.npy", frame_npy(10, 1, 3));
    store.put("kp/1/extra/2.npy", frame_npy(1, 2, 3));

    let agg = KeypointAggregator::new(Arc::new(store), FramePolicy::Abort)
        .aggregate(&clips(&[1]))
        .await
        .unwrap();
    assert_eq!(agg.poses.len(), 1);
    assert_eq!(origin(agg.poses[0].keypoints[0].x), (1, 1));
}

#[tokio::test]
async fn test_gapped_indices_are_renumbered() {
    let mut store = MemoryStore::new();
    for f in [3, 10, 7] {
        store.put(format!("kp/1/{}.npy", f), frame_npy(1, f, 3));
    }
    store.put("kp/2/1.npy", frame_npy(2, 1, 3));

    let agg = KeypointAggregator::new(Arc::new(store), FramePolicy::Abort)
        .aggregate(&clips(&[1, 2]))
        .await
        .unwrap();
    let frames: Vec<(u64, (usize, usize))> = agg
        .poses
        .iter()
        .map(|p| (p.sequence_id, origin(p.keypoints[0].x)))
        .collect();
    assert_eq!(
        frames,
        vec![(1, (1, 3)), (2, (1, 7)), (3, (1, 10)), (4, (2, 1))]
    );
}

#[tokio::test]
async fn test_skip_policy_keeps_ids_contiguous() {
    let mut store = clip_store(2, 5, 3);
    store.put("kp/1/3.npy", b"corrupt".to_vec());
    store.put_dangling("kp/2/6.npy");
    store.put("kp/2/notes.txt", b"hello".to_vec());

    let agg = KeypointAggregator::new(Arc::new(store), FramePolicy::Skip)
        .aggregate(&clips(&[1, 2]))
        .await
        .unwrap();

    assert_eq!(agg.stats.skipped, 3);
    assert_eq!(agg.stats.frames, 9);
    let ids: Vec<u64> = agg.poses.iter().map(|p| p.sequence_id).collect();
    assert_eq!(ids, (1..=9).collect::<Vec<_>>());
    // Clip 2 starts right after the four retained frames of clip 1.
    assert_eq!(origin(agg.poses[4].keypoints[0].x), (2, 1));
}

#[tokio::test]
async fn test_abort_policy_names_the_key() {
    let mut store = clip_store(2, 5, 3);
    store.put("kp/2/4.npy", b"corrupt".to_vec());

    let err = KeypointAggregator::new(Arc::new(store), FramePolicy::Abort)
        .aggregate(&clips(&[1, 2]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceData);
    assert_eq!(err.source_key(), Some("kp/2/4.npy"));
}

#[tokio::test]
async fn test_abort_on_malformed_name() {
    let mut store = clip_store(1, 2, 3);
    store.put("kp/1/frame_a.npy", frame_npy(1, 9, 3));

    let err = KeypointAggregator::new(Arc::new(store), FramePolicy::Abort)
        .aggregate(&clips(&[1]))
        .await
        .unwrap_err();
    assert_eq!(err.source_key(), Some("kp/1/frame_a.npy"));
}

#[tokio::test]
async fn test_empty_clip_contributes_nothing() {
    let store = Arc::new(clip_store(2, 3, 3));
    let agg = KeypointAggregator::new(store, FramePolicy::Abort)
        .aggregate(&clips(&[1, 7, 2]))
        .await
        .unwrap();
    assert_eq!(agg.stats.clips, 3);
    assert_eq!(agg.poses.len(), 6);
    assert_eq!(origin(agg.poses[3].keypoints[0].x), (2, 1));
}

#[tokio::test]
async fn test_inconsistent_keypoint_counts_fail() {
    let mut store = clip_store(2, 2, 3);
    store.put("kp/2/2.npy", frame_npy(2, 2, 4));

    for policy in [FramePolicy::Abort, FramePolicy::Skip] {
        let err = KeypointAggregator::new(Arc::new(store.clone()), policy)
            .aggregate(&clips(&[1, 2]))
            .await
            .unwrap_err();
        assert!(err.is_source_data());
        assert_eq!(err.source_key(), Some("kp/2/2.npy"));
    }
}
