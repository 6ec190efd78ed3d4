//! Local filesystem store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::KeypointStore;

/// Keyed store backed by a directory tree; keys are `/`-separated paths
/// relative to the root.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root, refusing escapes.
    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::invalid_key(key));
        }
        Ok(self.root.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        parts.map(|p| p.join("/"))
    }
}

#[async_trait]
impl KeypointStore for LocalStore {
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // Walk from the deepest directory the prefix names completely.
        let dir_part = match prefix.rfind('/') {
            Some(pos) => &prefix[..pos],
            None => "",
        };
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.resolve(dir_part)?
        };

        if !tokio::fs::try_exists(&start).await? {
            debug!("No directory for prefix {}", prefix);
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        debug!("Listed {} local objects under {}", keys.len(), prefix);
        Ok(keys)
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(StorageError::download_failed(format!("{}: {}", key, e))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
