//! Rendered-track inspection through FFprobe.
//!
//! Only the first video stream is queried; retiming needs its duration and
//! the rest is reported for logging.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// First video stream of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

const PROBE_ARGS: [&str; 8] = [
    "-v",
    "error",
    "-select_streams",
    "v:0",
    "-show_entries",
    "stream=codec_name,width,height,avg_frame_rate,duration:format=duration",
    "-print_format",
    "json",
];

/// Inspect the first video stream of `path`.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !tokio::fs::try_exists(path).await? {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    let ffprobe = check_ffprobe()?;

    let output = Command::new(ffprobe)
        .args(PROBE_ARGS)
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("cannot inspect {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }

    parse_report(&output.stdout)
}

/// Duration of the first video stream, in seconds.
pub async fn get_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    Ok(probe_video(path).await?.duration)
}

fn parse_report(json: &[u8]) -> MediaResult<VideoInfo> {
    let report: ProbeReport = serde_json::from_slice(json)?;
    let Some(stream) = report.streams.into_iter().next() else {
        return Err(MediaError::InvalidVideo("no video stream".to_string()));
    };

    // Stream duration is absent for some containers (WebM); fall back to the format's.
    let duration = stream
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            report
                .format
                .and_then(|f| f.duration)
                .and_then(|d| d.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    Ok(VideoInfo {
        duration,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps: stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .unwrap_or(0.0),
        codec: stream.codec_name.unwrap_or_default(),
    })
}

/// Parse an FFprobe rate such as `30/1` or `29.97`. `0/0` yields `None`.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let (num, den) = (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?);
            (den > 0.0).then(|| num / den)
        }
        None => s.parse().ok(),
    }
}
