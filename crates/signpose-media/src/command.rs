//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Input path that makes FFmpeg read from stdin.
const STDIN_INPUT: &str = "-";

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path (`-` for stdin)
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Create a command whose input is read from stdin.
    pub fn from_stdin(output: impl AsRef<Path>) -> Self {
        Self::new(STDIN_INPUT, output)
    }

    /// Add multiple input arguments.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Raw RGB24 video on the input side.
    pub fn raw_rgb_input(self, width: u32, height: u32, fps: u32) -> Self {
        self.input_args([
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-s".to_string(),
            format!("{}x{}", width, height),
            "-r".to_string(),
            fps.to_string(),
        ])
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, pix_fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(pix_fmt)
    }

    /// Set output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Drop any audio stream.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push("error".to_string());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }

    fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == STDIN_INPUT
    }
}

/// Runner for FFmpeg commands.
#[derive(Debug, Default)]
pub struct FfmpegRunner;

impl FfmpegRunner {
    pub fn new() -> Self {
        Self
    }

    /// Spawn FFmpeg. The child is killed if dropped before it exits.
    pub fn spawn(&self, cmd: &FfmpegCommand) -> MediaResult<Child> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let stdin = if cmd.reads_stdin() {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        Ok(child)
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let mut child = self.spawn(cmd)?;
        let stderr_task = collect_stderr(child.stderr.take());

        let status = child.wait().await?;
        let stderr = join_stderr(stderr_task).await;
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr),
                status.code(),
            ))
        }
    }
}

/// Drain a child's stderr in the background so the pipe never fills.
pub(crate) fn collect_stderr(stderr: Option<ChildStderr>) -> Option<JoinHandle<String>> {
    stderr.map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        })
    })
}

pub(crate) async fn join_stderr(task: Option<JoinHandle<String>>) -> String {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
