//! Per-run scratch directories.

use std::path::{Path, PathBuf};

use signpose_models::RunId;
use tempfile::TempDir;
use tracing::debug;

use crate::error::PipelineResult;

/// Scratch directory owned by one run, removed on drop.
#[derive(Debug)]
pub struct RunWorkspace {
    run_id: RunId,
    dir: TempDir,
}

impl RunWorkspace {
    /// Create `signpose-<run-id>-*` under `work_dir`, creating `work_dir` if needed.
    pub async fn create(work_dir: impl AsRef<Path>, run_id: &RunId) -> PipelineResult<Self> {
        let work_dir = work_dir.as_ref();
        tokio::fs::create_dir_all(work_dir).await?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("signpose-{}-", run_id))
            .tempdir_in(work_dir)?;
        debug!(run_id = %run_id, "Created workspace {}", dir.path().display());

        Ok(Self {
            run_id: run_id.clone(),
            dir,
        })
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory for in-progress encoder output.
    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.path().join("encode")
    }
}
