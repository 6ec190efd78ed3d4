//! Output video specification.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Output container, which fixes the video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    #[default]
    WebM,
}

impl Container {
    /// FFmpeg encoder name.
    pub fn video_codec(&self) -> &'static str {
        match self {
            Container::Mp4 => "libx264",
            Container::WebM => "libvpx-vp9",
        }
    }

    /// FFmpeg muxer name.
    pub fn format(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::WebM => "webm",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.format()
    }

    /// Container for a path's extension, if recognized.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl FromStr for Container {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp4" => Ok(Container::Mp4),
            "webm" => Ok(Container::WebM),
            _ => Err(ModelError::UnsupportedContainer(s.to_string())),
        }
    }
}

/// Output video settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputSpec {
    #[serde(default)]
    pub container: Container,

    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Frame width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Frame height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_fps() -> u32 {
    30
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            container: Container::default(),
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl OutputSpec {
    pub fn new(container: Container, fps: u32, width: u32, height: u32) -> Self {
        Self {
            container,
            fps,
            width,
            height,
        }
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Bytes in one packed RGB frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Check the settings the encoder will accept.
    ///
    /// yuv420p output needs even dimensions.
    pub fn validate(&self) -> ModelResult<()> {
        if self.fps == 0 {
            return Err(ModelError::invalid_output("fps must be positive"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ModelError::invalid_output(format!(
                "frame size must be nonzero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ModelError::invalid_output(format!(
                "frame size must be even, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = OutputSpec::default();
        assert_eq!(spec.container, Container::WebM);
        assert_eq!(spec.fps, 30);
        assert_eq!((spec.width, spec.height), (640, 480));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_codec_follows_container() {
        assert_eq!(Container::Mp4.video_codec(), "libx264");
        assert_eq!(Container::WebM.video_codec(), "libvpx-vp9");
    }

    #[test]
    fn test_container_parsing() {
        assert_eq!("MP4".parse::<Container>().unwrap(), Container::Mp4);
        assert_eq!(Container::from_path("out/run.webm"), Some(Container::WebM));
        assert_eq!(Container::from_path("out/run.avi"), None);
        assert!(matches!(
            "avi".parse::<Container>(),
            Err(ModelError::UnsupportedContainer(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_sizes() {
        assert!(OutputSpec::default().with_size(641, 480).validate().is_err());
        assert!(OutputSpec::default().with_size(0, 480).validate().is_err());
        assert!(OutputSpec::default().with_fps(0).validate().is_err());
        assert!(OutputSpec::default().with_size(2, 2).validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize() {
        let spec: OutputSpec = serde_json::from_str(r#"{"container": "mp4"}"#).unwrap();
        assert_eq!(spec.container, Container::Mp4);
        assert_eq!(spec.fps, 30);
        assert_eq!(spec.frame_bytes(), 640 * 480 * 3);
    }
}
