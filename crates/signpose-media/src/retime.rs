//! Re-timing a rendered video to a target duration.

use signpose_models::Container;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{move_file, publish_via_scratch};
use crate::probe::get_duration;

/// Presentation-timestamp filter stretching a clip by `factor`.
pub fn setpts_filter(factor: f64) -> String {
    format!("setpts={:.6}*PTS", factor)
}

/// Stretch factor mapping `actual` seconds onto `target` seconds.
pub fn stretch_factor(actual: f64, target: f64) -> MediaResult<f64> {
    if !(actual.is_finite() && actual > 0.0) {
        return Err(MediaError::InvalidVideo(format!(
            "cannot retime a video of duration {}",
            actual
        )));
    }
    if !(target.is_finite() && target > 0.0) {
        return Err(MediaError::invalid_config(format!(
            "target duration must be positive, got {}",
            target
        )));
    }
    Ok(target / actual)
}

/// Re-time `input` so that it plays for `target_duration` seconds.
///
/// `None` keeps the original speed and only moves the file. FFmpeg writes
/// next to `input`; `output` appears only once it has succeeded.
pub async fn retime_video(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    target_duration: Option<f64>,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let Some(target) = target_duration else {
        return move_file(input, output).await;
    };

    let actual = get_duration(input).await?;
    let factor = stretch_factor(actual, target)?;
    info!(
        "Retiming {} from {:.3}s to {:.3}s (factor {:.4})",
        input.display(),
        actual,
        target,
        factor
    );

    let container = Container::from_path(output);
    publish_via_scratch(scratch_path(input, output), output, |scratch| async move {
        let mut cmd = FfmpegCommand::new(input, &scratch)
            .video_filter(setpts_filter(factor))
            .no_audio();
        if let Some(container) = container {
            cmd = cmd
                .video_codec(container.video_codec())
                .pixel_format("yuv420p");
        }
        FfmpegRunner::new().run(&cmd).await
    })
    .await
}

/// Sibling of `input` keeping the output's extension, so FFmpeg picks the same muxer.
fn scratch_path(input: &Path, output: &Path) -> PathBuf {
    let name = match output.extension() {
        Some(ext) => format!("retimed.{}", ext.to_string_lossy()),
        None => "retimed".to_string(),
    };
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setpts_filter() {
        assert_eq!(setpts_filter(2.0), "setpts=2.000000*PTS");
        assert_eq!(setpts_filter(0.5), "setpts=0.500000*PTS");
    }

    #[test]
    fn test_stretch_factor() {
        assert!((stretch_factor(4.0, 6.0).unwrap() - 1.5).abs() < 1e-12);
        assert!(stretch_factor(0.0, 6.0).is_err());
        assert!(stretch_factor(4.0, 0.0).unwrap_err().is_configuration());
        assert!(stretch_factor(4.0, f64::NAN).is_err());
    }

    #[test]
    fn test_scratch_sits_beside_input() {
        let scratch = scratch_path(Path::new("/work/run/rendered.webm"), Path::new("/out/a.mp4"));
        assert_eq!(scratch, Path::new("/work/run/retimed.mp4"));
    }

    #[tokio::test]
    async fn test_no_target_moves_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.webm");
        let output = dir.path().join("out.webm");
        tokio::fs::write(&input, b"video").await.unwrap();

        retime_video(&input, &output, None).await.unwrap();
        assert!(!input.exists());
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"video");
    }
}
