//! Per-frame skeleton rendering.

use serde::{Deserialize, Serialize};
use signpose_models::{Keypoint, PoseInstance};
use tracing::debug;

use crate::canvas::Canvas;
use crate::error::{MediaError, MediaResult};
use crate::schema::{SkeletonSchema, BODY_LINK_COUNT};

/// Fixed opacity of body segments.
pub const BODY_LINK_ALPHA: f32 = 0.6;

/// Width of fine (face/hand/foot) links in pixels.
pub const FINE_LINK_WIDTH: i32 = 2;

/// Keypoints after this index are drawn at half radius.
pub const LAST_BODY_KEYPOINT: usize = 17;

/// Drawing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Minimum confidence for a keypoint to be drawn or linked
    #[serde(default = "default_kpt_threshold")]
    pub kpt_threshold: f32,

    /// Body keypoint radius in pixels
    #[serde(default = "default_radius")]
    pub radius: i32,

    /// Half-thickness of body segments in pixels
    #[serde(default = "default_line_width")]
    pub line_width: i32,

    /// Base opacity of keypoints and fine links
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Scale opacity by detection confidence
    #[serde(default = "default_true")]
    pub confidence_weighted: bool,

    /// Leading links drawn as body segments
    #[serde(default = "default_body_link_count")]
    pub body_link_count: usize,
}

fn default_kpt_threshold() -> f32 {
    0.3
}

fn default_radius() -> i32 {
    4
}

fn default_line_width() -> i32 {
    5
}

fn default_alpha() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_body_link_count() -> usize {
    BODY_LINK_COUNT
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            kpt_threshold: default_kpt_threshold(),
            radius: default_radius(),
            line_width: default_line_width(),
            alpha: default_alpha(),
            confidence_weighted: true,
            body_link_count: default_body_link_count(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> MediaResult<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(MediaError::invalid_config(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        if self.radius < 0 || self.line_width < 0 {
            return Err(MediaError::invalid_config(
                "radius and line_width must be non-negative",
            ));
        }
        if !self.kpt_threshold.is_finite() {
            return Err(MediaError::invalid_config("kpt_threshold must be finite"));
        }
        Ok(())
    }
}

/// One rendered RGB24 frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    pub sequence_id: u64,
    pub width: u32,
    pub height: u32,
    /// Packed RGB24, row-major
    pub pixels: Vec<u8>,
}

impl RenderedFrame {
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Draws display-convention poses with a skeleton schema.
#[derive(Debug, Clone)]
pub struct SkeletonRenderer {
    config: RenderConfig,
    width: u32,
    height: u32,
}

impl SkeletonRenderer {
    pub fn new(config: RenderConfig, width: u32, height: u32) -> MediaResult<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(MediaError::invalid_config(format!(
                "canvas must be non-empty, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            config,
            width,
            height,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render one pose onto a fresh black canvas.
    pub fn render(
        &self,
        pose: &PoseInstance,
        schema: &SkeletonSchema,
    ) -> MediaResult<RenderedFrame> {
        let canvas = self.draw(&pose.keypoints, schema)?;
        Ok(RenderedFrame {
            sequence_id: pose.sequence_id,
            width: self.width,
            height: self.height,
            pixels: canvas.into_raw(),
        })
    }

    /// Draw keypoints onto a fresh canvas.
    pub fn draw(&self, keypoints: &[Keypoint], schema: &SkeletonSchema) -> MediaResult<Canvas> {
        schema.check_keypoint_count(keypoints.len())?;

        let mut canvas = Canvas::new(self.width, self.height);
        let mut links_drawn = 0usize;
        for (i, (link, color)) in schema.links.iter().zip(schema.link_colors.iter()).enumerate() {
            let Some(color) = color else { continue };
            let (a, b) = (&keypoints[link[0]], &keypoints[link[1]]);
            let (pa, pb) = (pixel(a), pixel(b));

            if !canvas.contains(pa.0, pa.1) || !canvas.contains(pb.0, pb.1) {
                continue;
            }
            let threshold = self.config.kpt_threshold;
            if !a.is_visible(threshold) || !b.is_visible(threshold) {
                continue;
            }

            if i < self.config.body_link_count {
                self.draw_body_link(&mut canvas, pa, pb, *color);
            } else {
                let alpha = self.weighted_alpha((a.confidence + b.confidence) / 2.0);
                canvas.line(pa, pb, FINE_LINK_WIDTH, *color, alpha);
            }
            links_drawn += 1;
        }

        let mut points_drawn = 0usize;
        for (k, (kp, color)) in keypoints.iter().zip(schema.keypoint_colors.iter()).enumerate() {
            let Some(color) = color else { continue };
            if !kp.is_visible(self.config.kpt_threshold) {
                continue;
            }
            let radius = if k <= LAST_BODY_KEYPOINT {
                self.config.radius
            } else {
                self.config.radius / 2
            };
            canvas.circle(pixel(kp), radius, *color, self.weighted_alpha(kp.confidence));
            points_drawn += 1;
        }

        debug!(links = links_drawn, keypoints = points_drawn, "Rendered skeleton");
        Ok(canvas)
    }

    fn draw_body_link(&self, canvas: &mut Canvas, pa: (i32, i32), pb: (i32, i32), color: [u8; 3]) {
        let (dx, dy) = ((pa.0 - pb.0) as f64, (pa.1 - pb.1) as f64);
        let center = ((pa.0 + pb.0) / 2, (pa.1 + pb.1) / 2);
        let length = (dx * dx + dy * dy).sqrt();
        let angle = dy.atan2(dx).to_degrees() as i32;
        canvas.stadium(
            center,
            ((length / 2.0) as i32, self.config.line_width),
            angle,
            color,
            BODY_LINK_ALPHA,
        );
    }

    fn weighted_alpha(&self, confidence: f32) -> f32 {
        if self.config.confidence_weighted {
            self.config.alpha * confidence.clamp(0.0, 1.0)
        } else {
            self.config.alpha
        }
    }
}

/// Pixel coordinate of a keypoint.
fn pixel(kp: &Keypoint) -> (i32, i32) {
    (kp.x.floor() as i32, kp.y.floor() as i32)
}
