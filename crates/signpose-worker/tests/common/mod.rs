//! Shared fixtures: an in-memory keyed store and `.npy` frame builders.

#![allow(dead_code)]

use std::collections::BTreeMap;

use async_trait::async_trait;
use ndarray::Array3;
use ndarray_npy::WriteNpyExt;
use signpose_storage::{KeypointStore, StorageError, StorageResult};

/// In-memory store whose listing order is deliberately scrambled.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Vec<u8>>,
    /// Keys that list but cannot be fetched
    dangling: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.insert(key.into(), bytes);
    }

    /// A key that appears in listings but whose object is gone.
    pub fn put_dangling(&mut self, key: impl Into<String>) {
        self.dangling.push(key.into());
    }
}

#[async_trait]
impl KeypointStore for MemoryStore {
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .keys()
            .chain(self.dangling.iter())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        // Lexicographic order puts 10 before 2; reverse and interleave on top.
        keys.sort();
        keys.reverse();
        let (even, odd): (Vec<_>, Vec<_>) = keys
            .into_iter()
            .enumerate()
            .partition(|(i, _)| i % 2 == 0);
        Ok(odd.into_iter().chain(even).map(|(_, k)| k).collect())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// One-instance frame of `k` keypoints whose x encodes `(clip, frame)`.
pub fn frame_npy(clip: usize, frame: usize, k: usize) -> Vec<u8> {
    let mut arr = Array3::<f32>::zeros((1, k, 3));
    for j in 0..k {
        arr[[0, j, 0]] = (clip * 1000 + frame) as f32;
        arr[[0, j, 1]] = j as f32;
        arr[[0, j, 2]] = 0.9;
    }
    let mut buf = Vec::new();
    arr.write_npy(&mut buf).unwrap();
    buf
}

/// Populate `clips` clips of `frames` frames each under `kp/<clip>/`.
pub fn clip_store(clips: usize, frames: usize, k: usize) -> MemoryStore {
    let mut store = MemoryStore::new();
    for c in 1..=clips {
        for f in 1..=frames {
            store.put(format!("kp/{}/{}.npy", c, f), frame_npy(c, f, k));
        }
    }
    store
}
