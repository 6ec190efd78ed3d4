//! Filesystem helpers for publishing finished outputs.
//!
//! Encoders write into a scratch directory that may live on a different
//! filesystem than the final output path, so a plain rename can fail with
//! EXDEV.

use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a file from `src` to `dst`, falling back to copy-and-delete across devices.
///
/// The cross-device copy goes to a sibling temp file first and is then renamed
/// into place, so `dst` never holds a partially written file.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    ensure_parent(dst).await?;

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Produce `dst` by writing `scratch` first and moving it into place.
///
/// If `produce` fails, the scratch file is removed and `dst` is left untouched.
pub async fn publish_via_scratch<F, Fut>(
    scratch: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    produce: F,
) -> MediaResult<()>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = MediaResult<()>>,
{
    let scratch = scratch.as_ref();
    if let Err(e) = produce(scratch.to_path_buf()).await {
        if let Err(cleanup) = remove_if_exists(scratch).await {
            tracing::warn!("Failed to remove {}: {}", scratch.display(), cleanup);
        }
        return Err(e);
    }
    move_file(scratch, dst).await
}

/// Remove a file if it exists.
pub async fn remove_if_exists(path: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

async fn ensure_parent(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    let tmp_dst = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &tmp_dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        tracing::error!(
            "Failed to copy {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        tracing::error!(
            "Failed to rename {} -> {}: {}",
            tmp_dst.display(),
            dst.display(),
            e
        );
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!("Failed to remove {} after copy: {}", src.display(), e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_failed_producer_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("work").join("retimed.webm");
        let dst = dir.path().join("out").join("final.webm");
        fs::create_dir_all(scratch.parent().unwrap()).await.unwrap();

        let err = publish_via_scratch(&scratch, &dst, |path| async move {
            fs::write(&path, b"half a video").await?;
            Err(MediaError::ffmpeg_failed("exit 1", None, Some(1)))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::FfmpegFailed { .. }));
        assert!(!scratch.exists());
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_successful_producer_is_published() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("retimed.webm");
        let dst = dir.path().join("out").join("final.webm");

        publish_via_scratch(&scratch, &dst, |path| async move {
            fs::write(&path, b"video").await?;
            Ok::<(), MediaError>(())
        })
        .await
        .unwrap();

        assert!(!scratch.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_move_file_same_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("render.webm");
        let dst = dir.path().join("out.webm");
        fs::write(&src, b"frames").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"frames");
    }

    #[tokio::test]
    async fn test_move_file_creates_parent_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mp4");
        let dst = dir.path().join("nested").join("b.mp4");
        fs::write(&src, b"new").await.unwrap();
        fs::create_dir_all(dst.parent().unwrap()).await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        move_file(&src, &dst).await.unwrap();
        assert_eq!(fs::read(&dst).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.webm");
        remove_if_exists(&path).await.unwrap();
        fs::write(&path, b"x").await.unwrap();
        remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
