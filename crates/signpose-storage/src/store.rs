//! Read-only keyed object store abstraction.

use async_trait::async_trait;
use signpose_models::ClipLocation;

use crate::error::StorageResult;
use crate::keys::{frame_keys, FrameKey};

/// A keyed object store holding per-frame keypoint objects.
///
/// Keys are `/`-separated. Implementations return every key under the prefix
/// (recursively); callers filter to the entries they understand.
#[async_trait]
pub trait KeypointStore: Send + Sync {
    /// List all object keys starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Fetch an object's bytes.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// List the frame objects directly under a clip location.
    ///
    /// The returned order is the store's listing order.
    async fn list_clip(&self, clip: &ClipLocation) -> StorageResult<Vec<FrameKey>> {
        let prefix = clip.prefix();
        let keys = self.list_keys(&prefix).await?;
        Ok(frame_keys(&prefix, keys))
    }
}
