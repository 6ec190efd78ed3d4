//! Streaming rendered frames into a video container.
//!
//! [`VideoEncoder`] owns the ordering and validation rules; a [`FrameSink`]
//! owns the bytes. [`FfmpegSink`] pipes raw RGB24 into FFmpeg and publishes
//! the file only after FFmpeg exits cleanly. [`MemorySink`] keeps frames in
//! memory.

use async_trait::async_trait;
use signpose_models::OutputSpec;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::{collect_stderr, join_stderr, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{move_file, remove_if_exists};
use crate::renderer::RenderedFrame;

/// Destination for encoded frames.
#[async_trait]
pub trait FrameSink: Send {
    /// Prepare to receive frames of the given spec.
    async fn start(&mut self, spec: &OutputSpec) -> MediaResult<()>;

    /// Accept the next frame. Frames arrive in playback order.
    async fn write_frame(&mut self, frame: &RenderedFrame) -> MediaResult<()>;

    /// Finalize output.
    async fn finish(&mut self) -> MediaResult<()>;

    /// Discard everything written so far. Must be safe to call at any point.
    async fn abort(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    Open,
    Finished,
    Aborted,
}

/// Ordered, validated writer over a [`FrameSink`].
pub struct VideoEncoder<S: FrameSink> {
    spec: OutputSpec,
    expected_frames: usize,
    written: usize,
    last_sequence_id: Option<u64>,
    sink: S,
    state: EncoderState,
}

impl<S: FrameSink> VideoEncoder<S> {
    /// Validate the request and start the sink.
    ///
    /// Invalid specs or a zero frame count are rejected before the sink is touched.
    pub async fn open(spec: OutputSpec, frame_count: usize, mut sink: S) -> MediaResult<Self> {
        if frame_count == 0 {
            return Err(MediaError::invalid_config("cannot encode zero frames"));
        }
        spec.validate()?;

        sink.start(&spec).await?;
        debug!(
            frames = frame_count,
            width = spec.width,
            height = spec.height,
            fps = spec.fps,
            container = %spec.container,
            "Encoder opened"
        );

        Ok(Self {
            spec,
            expected_frames: frame_count,
            written: 0,
            last_sequence_id: None,
            sink,
            state: EncoderState::Open,
        })
    }

    pub fn spec(&self) -> &OutputSpec {
        &self.spec
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }

    /// Write the next frame. Any failure aborts the sink.
    pub async fn write(&mut self, frame: &RenderedFrame) -> MediaResult<()> {
        if self.state != EncoderState::Open {
            return Err(MediaError::encode_failed("encoder is closed"));
        }
        if let Err(e) = self.check_frame(frame) {
            self.abort_sink().await;
            return Err(e);
        }
        if let Err(e) = self.sink.write_frame(frame).await {
            self.abort_sink().await;
            return Err(e);
        }
        self.written += 1;
        self.last_sequence_id = Some(frame.sequence_id);
        Ok(())
    }

    /// Finalize the output and hand the sink back.
    pub async fn finish(mut self) -> MediaResult<S> {
        if self.state != EncoderState::Open {
            return Err(MediaError::encode_failed("encoder is closed"));
        }
        if self.written != self.expected_frames {
            self.abort_sink().await;
            return Err(MediaError::encode_failed(format!(
                "expected {} frames, got {}",
                self.expected_frames, self.written
            )));
        }
        if let Err(e) = self.sink.finish().await {
            self.abort_sink().await;
            return Err(e);
        }
        self.state = EncoderState::Finished;
        info!(frames = self.written, "Encoding finished");
        Ok(self.sink)
    }

    /// Abort the sink and drop any partial output.
    pub async fn abort(mut self) {
        self.abort_sink().await;
    }

    fn check_frame(&self, frame: &RenderedFrame) -> MediaResult<()> {
        if self.written >= self.expected_frames {
            return Err(MediaError::encode_failed(format!(
                "more than the announced {} frames",
                self.expected_frames
            )));
        }
        check_dimensions(&self.spec, frame)?;
        if let Some(last) = self.last_sequence_id {
            if frame.sequence_id <= last {
                return Err(MediaError::encode_failed(format!(
                    "frame {} written after frame {}",
                    frame.sequence_id, last
                )));
            }
        }
        Ok(())
    }

    async fn abort_sink(&mut self) {
        if self.state == EncoderState::Open {
            self.state = EncoderState::Aborted;
            self.sink.abort().await;
        }
    }
}

fn check_dimensions(spec: &OutputSpec, frame: &RenderedFrame) -> MediaResult<()> {
    if frame.width != spec.width || frame.height != spec.height {
        return Err(MediaError::invalid_config(format!(
            "frame {} is {}x{}, output is {}x{}",
            frame.sequence_id, frame.width, frame.height, spec.width, spec.height
        )));
    }
    if frame.pixels.len() != frame.expected_len() {
        return Err(MediaError::invalid_config(format!(
            "frame {} has {} bytes, expected {}",
            frame.sequence_id,
            frame.pixels.len(),
            frame.expected_len()
        )));
    }
    Ok(())
}

/// Encode a complete, already rendered sequence.
///
/// Every frame is checked before the sink is opened.
pub async fn encode_frames<S: FrameSink>(
    spec: OutputSpec,
    frames: &[RenderedFrame],
    sink: S,
) -> MediaResult<S> {
    spec.validate()?;
    for frame in frames {
        check_dimensions(&spec, frame)?;
    }

    let mut encoder = VideoEncoder::open(spec, frames.len(), sink).await?;
    for frame in frames {
        encoder.write(frame).await?;
    }
    encoder.finish().await
}

/// Sink that pipes raw RGB24 frames into an FFmpeg child process.
pub struct FfmpegSink {
    output_path: PathBuf,
    scratch_dir: PathBuf,
    scratch_path: Option<PathBuf>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
}

impl FfmpegSink {
    /// `scratch_dir` receives the in-progress file; `output_path` only ever
    /// sees a finished video.
    pub fn new(output_path: impl AsRef<Path>, scratch_dir: impl AsRef<Path>) -> Self {
        Self {
            output_path: output_path.as_ref().to_path_buf(),
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
            scratch_path: None,
            child: None,
            stdin: None,
            stderr_task: None,
        }
    }

    /// FFmpeg invocation for a spec writing to `scratch`.
    pub fn command(spec: &OutputSpec, scratch: impl AsRef<Path>) -> FfmpegCommand {
        FfmpegCommand::from_stdin(scratch)
            .raw_rgb_input(spec.width, spec.height, spec.fps)
            .video_codec(spec.container.video_codec())
            .pixel_format("yuv420p")
            .format(spec.container.format())
    }
}

#[async_trait]
impl FrameSink for FfmpegSink {
    async fn start(&mut self, spec: &OutputSpec) -> MediaResult<()> {
        if self.child.is_some() {
            return Err(MediaError::encode_failed("ffmpeg sink already started"));
        }
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let scratch = self
            .scratch_dir
            .join(format!("encode.{}", spec.container.extension()));
        let cmd = Self::command(spec, &scratch);

        let mut child = FfmpegRunner::new().spawn(&cmd)?;
        self.stdin = child.stdin.take();
        self.stderr_task = collect_stderr(child.stderr.take());
        self.child = Some(child);
        self.scratch_path = Some(scratch);

        if self.stdin.is_none() {
            return Err(MediaError::encode_failed("ffmpeg stdin not captured"));
        }
        Ok(())
    }

    async fn write_frame(&mut self, frame: &RenderedFrame) -> MediaResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(MediaError::encode_failed("ffmpeg sink not started"));
        };
        stdin
            .write_all(&frame.pixels)
            .await
            .map_err(|e| MediaError::encode_failed(format!("writing to ffmpeg failed: {}", e)))
    }

    async fn finish(&mut self) -> MediaResult<()> {
        let Some(mut child) = self.child.take() else {
            return Err(MediaError::encode_failed("ffmpeg sink not started"));
        };

        // Closing stdin signals end of stream.
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.shutdown().await {
                warn!("Failed to close ffmpeg stdin: {}", e);
            }
        }

        let status = child.wait().await?;
        let stderr = join_stderr(self.stderr_task.take()).await;
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr),
                status.code(),
            ));
        }

        let Some(scratch) = self.scratch_path.take() else {
            return Err(MediaError::encode_failed("ffmpeg sink has no scratch file"));
        };
        move_file(&scratch, &self.output_path).await?;
        info!("Wrote {}", self.output_path.display());
        Ok(())
    }

    async fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                debug!("ffmpeg already exited: {}", e);
            }
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        if let Some(scratch) = self.scratch_path.take() {
            if let Err(e) = remove_if_exists(&scratch).await {
                warn!("Failed to remove partial output {}: {}", scratch.display(), e);
            }
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // The child is killed by kill_on_drop; remove what it left behind.
        if let Some(scratch) = self.scratch_path.take() {
            let _ = std::fs::remove_file(scratch);
        }
    }
}

/// Sink that keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    spec: Option<OutputSpec>,
    frames: Vec<RenderedFrame>,
    finished: bool,
    aborted: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec passed to `start`, if the sink was started.
    pub fn spec(&self) -> Option<&OutputSpec> {
        self.spec.as_ref()
    }

    pub fn frames(&self) -> &[RenderedFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<RenderedFrame> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn start(&mut self, spec: &OutputSpec) -> MediaResult<()> {
        self.spec = Some(spec.clone());
        Ok(())
    }

    async fn write_frame(&mut self, frame: &RenderedFrame) -> MediaResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    async fn finish(&mut self) -> MediaResult<()> {
        self.finished = true;
        Ok(())
    }

    async fn abort(&mut self) {
        self.frames.clear();
        self.aborted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signpose_models::Container;

    fn frame(sequence_id: u64, width: u32, height: u32) -> RenderedFrame {
        RenderedFrame {
            sequence_id,
            width,
            height,
            pixels: vec![0; (width * height * 3) as usize],
        }
    }

    fn small_spec() -> OutputSpec {
        OutputSpec::default().with_size(4, 2)
    }

    #[tokio::test]
    async fn test_memory_sink_collects_in_order() {
        let frames = vec![frame(1, 4, 2), frame(2, 4, 2), frame(3, 4, 2)];
        let sink = encode_frames(small_spec(), &frames, MemorySink::new())
            .await
            .unwrap();
        assert!(sink.is_finished());
        let ids: Vec<u64> = sink.frames().iter().map(|f| f.sequence_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_zero_frames_rejected_before_start() {
        let err = VideoEncoder::open(small_spec(), 0, MemorySink::new())
            .await
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_out_of_order_write_aborts() {
        let mut encoder = VideoEncoder::open(small_spec(), 2, MemorySink::new())
            .await
            .unwrap();
        encoder.write(&frame(2, 4, 2)).await.unwrap();
        assert!(encoder.write(&frame(1, 4, 2)).await.is_err());
        assert!(encoder.write(&frame(3, 4, 2)).await.is_err());
        assert!(encoder.finish().await.is_err());
    }

    #[tokio::test]
    async fn test_short_sequence_fails_on_finish() {
        let mut encoder = VideoEncoder::open(small_spec(), 2, MemorySink::new())
            .await
            .unwrap();
        encoder.write(&frame(1, 4, 2)).await.unwrap();
        assert_eq!(encoder.frames_written(), 1);
        assert!(encoder.finish().await.is_err());
    }

    #[test]
    fn test_ffmpeg_command_for_spec() {
        let spec = OutputSpec::default().with_container(Container::Mp4);
        let args = FfmpegSink::command(&spec, "/tmp/encode.mp4").build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgb24 -s 640x480 -r 30 -i -"));
        assert!(joined.contains("-c:v libx264 -pix_fmt yuv420p -f mp4 /tmp/encode.mp4"));
    }

    #[tokio::test]
    async fn test_unstarted_ffmpeg_sink() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut sink = FfmpegSink::new(dir.path().join("out.webm"), dir.path());
        assert!(sink.write_frame(&frame(1, 4, 2)).await.is_err());
        assert!(sink.finish().await.is_err());
        sink.abort().await;
        assert!(!dir.path().join("out.webm").exists());
    }
}
