//! RGB canvas with alpha-blended shape primitives.
//!
//! Each primitive is rasterized into a coverage mask over its clipped
//! bounding box, then blended into the canvas once per covered pixel:
//! `dst = round((1 - a) * dst + a * color)`.

use image::{GrayImage, Luma, Rgb as Pixel, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

use crate::schema::Rgb;

const COVERED: Luma<u8> = Luma([255]);

/// Angular step of the stadium outline, in degrees.
const STADIUM_STEP_DEG: i32 = 1;

/// An owned RGB24 frame buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    image: RgbImage,
}

/// Pixel bounding box `[x0, x1] × [y0, y1]` (inclusive).
#[derive(Debug, Clone, Copy)]
struct BBox {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl Canvas {
    /// Black canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether a pixel coordinate is on the canvas.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.image.get_pixel(x, y).0
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB24 bytes, row-major.
    pub fn into_raw(self) -> Vec<u8> {
        self.image.into_raw()
    }

    /// Filled circle.
    pub fn circle(&mut self, center: (i32, i32), radius: i32, color: Rgb, alpha: f32) {
        let radius = radius.max(0);
        let bbox = BBox {
            x0: center.0.saturating_sub(radius),
            y0: center.1.saturating_sub(radius),
            x1: center.0.saturating_add(radius),
            y1: center.1.saturating_add(radius),
        };
        self.fill_masked(bbox, color, alpha, |mask, (ox, oy)| {
            let local = (center.0.saturating_sub(ox), center.1.saturating_sub(oy));
            draw_filled_circle_mut(mask, local, radius, COVERED);
        });
    }

    /// Filled stadium (elongated ellipse) around `center`.
    ///
    /// `axes` are the semi-axes along and across the segment; the outline is
    /// sampled every degree after rotating by `angle_deg`.
    pub fn stadium(
        &mut self,
        center: (i32, i32),
        axes: (i32, i32),
        angle_deg: i32,
        color: Rgb,
        alpha: f32,
    ) {
        let outline = ellipse_polygon(center, axes, angle_deg);
        self.polygon(&outline, color, alpha);
    }

    /// Straight segment of the given width.
    pub fn line(&mut self, from: (i32, i32), to: (i32, i32), width: i32, color: Rgb, alpha: f32) {
        let (dx, dy) = (to.0 as f64 - from.0 as f64, to.1 as f64 - from.1 as f64);
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 || width <= 1 {
            self.polygon(&[from, to], color, alpha);
            return;
        }

        let half = width as f64 / 2.0;
        let (nx, ny) = (-dy / len * half, dx / len * half);
        let offset = |p: (i32, i32), sign: f64| {
            (
                (p.0 as f64 + sign * nx).round() as i32,
                (p.1 as f64 + sign * ny).round() as i32,
            )
        };
        let quad = [offset(from, 1.0), offset(to, 1.0), offset(to, -1.0), offset(from, -1.0)];
        self.polygon(&quad, color, alpha);
    }

    /// Filled polygon; degenerate outlines fall back to a 1-pixel segment.
    fn polygon(&mut self, points: &[(i32, i32)], color: Rgb, alpha: f32) {
        let mut outline: Vec<(i32, i32)> = Vec::with_capacity(points.len());
        for p in points {
            if outline.last() != Some(p) {
                outline.push(*p);
            }
        }
        while outline.len() > 1 && outline.first() == outline.last() {
            outline.pop();
        }
        if outline.is_empty() {
            return;
        }

        let bbox = BBox {
            x0: outline.iter().map(|p| p.0).min().unwrap_or(0),
            y0: outline.iter().map(|p| p.1).min().unwrap_or(0),
            x1: outline.iter().map(|p| p.0).max().unwrap_or(0),
            y1: outline.iter().map(|p| p.1).max().unwrap_or(0),
        };

        self.fill_masked(bbox, color, alpha, |mask, (ox, oy)| {
            if outline.len() >= 3 {
                let poly: Vec<Point<i32>> = outline
                    .iter()
                    .map(|p| Point::new(p.0.saturating_sub(ox), p.1.saturating_sub(oy)))
                    .collect();
                draw_polygon_mut(mask, &poly, COVERED);
            } else {
                let a = outline[0];
                let b = outline[outline.len() - 1];
                draw_line_segment_mut(
                    mask,
                    (a.0.saturating_sub(ox) as f32, a.1.saturating_sub(oy) as f32),
                    (b.0.saturating_sub(ox) as f32, b.1.saturating_sub(oy) as f32),
                    COVERED,
                );
            }
        });
    }

    /// Rasterize into a mask over the on-canvas part of `bbox`, then blend.
    fn fill_masked<F>(&mut self, bbox: BBox, color: Rgb, alpha: f32, draw: F)
    where
        F: FnOnce(&mut GrayImage, (i32, i32)),
    {
        let x0 = bbox.x0.max(0);
        let y0 = bbox.y0.max(0);
        let x1 = bbox.x1.min(self.width() as i32 - 1);
        let y1 = bbox.y1.min(self.height() as i32 - 1);
        if x0 > x1 || y0 > y1 {
            return;
        }

        let mut mask = GrayImage::new((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
        draw(&mut mask, (x0, y0));

        let a = alpha.clamp(0.0, 1.0);
        for (mx, my, m) in mask.enumerate_pixels() {
            if m.0[0] == 0 {
                continue;
            }
            let px = self.image.get_pixel_mut(x0 as u32 + mx, y0 as u32 + my);
            *px = blend(*px, color, a);
        }
    }
}

/// `round((1 - a) * dst + a * color)` per channel.
fn blend(dst: Pixel<u8>, color: Rgb, a: f32) -> Pixel<u8> {
    let mix = |d: u8, c: u8| {
        ((1.0 - a) * d as f32 + a * c as f32)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Pixel([
        mix(dst.0[0], color[0]),
        mix(dst.0[1], color[1]),
        mix(dst.0[2], color[2]),
    ])
}

/// Outline of a rotated ellipse sampled every `STADIUM_STEP_DEG` over a full turn.
pub fn ellipse_polygon(center: (i32, i32), axes: (i32, i32), angle_deg: i32) -> Vec<(i32, i32)> {
    let (sin_a, cos_a) = (angle_deg as f64).to_radians().sin_cos();
    let (ax, ay) = (axes.0.max(0) as f64, axes.1.max(0) as f64);

    let mut points = Vec::with_capacity((360 / STADIUM_STEP_DEG + 1) as usize);
    let mut deg = 0;
    while deg <= 360 {
        let (sin_t, cos_t) = (deg as f64).to_radians().sin_cos();
        let x = ax * cos_t;
        let y = ay * sin_t;
        let p = (
            (center.0 as f64 + x * cos_a - y * sin_a).round() as i32,
            (center.1 as f64 + x * sin_a + y * cos_a).round() as i32,
        );
        if points.last() != Some(&p) {
            points.push(p);
        }
        deg += STADIUM_STEP_DEG;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered_columns(canvas: &Canvas) -> Vec<u32> {
        let mut cols: Vec<u32> = canvas
            .as_image()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0 != [0, 0, 0])
            .map(|(x, _, _)| x)
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    #[test]
    fn test_circle_extent() {
        let mut canvas = Canvas::new(40, 40);
        canvas.circle((20, 20), 4, [255, 0, 0], 1.0);
        assert_eq!(covered_columns(&canvas).len(), 9);
        assert_eq!(canvas.pixel(20, 20), [255, 0, 0]);
    }

    #[test]
    fn test_alpha_blend_once_per_pixel() {
        let mut canvas = Canvas::new(20, 20);
        canvas.circle((10, 10), 3, [200, 100, 0], 0.5);
        assert_eq!(canvas.pixel(10, 10), [100, 50, 0]);
    }

    #[test]
    fn test_blend_rounding() {
        assert_eq!(blend(Pixel([0, 0, 0]), [255, 255, 1], 0.6).0, [153, 153, 1]);
        assert_eq!(blend(Pixel([10, 20, 30]), [200, 200, 200], 1.0).0, [200, 200, 200]);
        assert_eq!(blend(Pixel([10, 20, 30]), [200, 200, 200], 0.0).0, [10, 20, 30]);
    }

    #[test]
    fn test_shapes_clip_at_borders() {
        let mut canvas = Canvas::new(10, 10);
        canvas.circle((0, 0), 5, [255, 255, 255], 1.0);
        canvas.stadium((9, 9), (8, 3), 45, [255, 255, 255], 1.0);
        canvas.line((-5, 5), (20, 5), 2, [255, 255, 255], 1.0);
        canvas.circle((-50, -50), 3, [255, 255, 255], 1.0);
        assert_eq!(canvas.pixel(0, 0), [255, 255, 255]);
    }

    #[test]
    fn test_far_off_canvas_circles_are_ignored() {
        let mut canvas = Canvas::new(10, 10);
        canvas.circle((i32::MIN, 5), 4, [255, 255, 255], 1.0);
        canvas.circle((i32::MAX, i32::MAX), 4, [255, 255, 255], 1.0);
        canvas.circle((5, i32::MIN + 2), 4, [255, 255, 255], 1.0);
        assert!(covered_columns(&canvas).is_empty());
    }

    #[test]
    fn test_stadium_is_elongated() {
        let mut canvas = Canvas::new(60, 60);
        canvas.stadium((30, 30), (20, 3), 0, [0, 255, 0], 1.0);
        assert_eq!(canvas.pixel(48, 30), [0, 255, 0]);
        assert_eq!(canvas.pixel(30, 36), [0, 0, 0]);
    }

    #[test]
    fn test_degenerate_shapes_do_not_panic() {
        let mut canvas = Canvas::new(10, 10);
        canvas.stadium((5, 5), (0, 5), 0, [255, 0, 0], 1.0);
        canvas.stadium((5, 5), (0, 0), 0, [255, 0, 0], 1.0);
        canvas.line((3, 3), (3, 3), 2, [255, 0, 0], 1.0);
        assert_eq!(canvas.pixel(5, 5), [255, 0, 0]);
    }

    #[test]
    fn test_ellipse_polygon_returns_to_start() {
        let pts = ellipse_polygon((0, 0), (10, 5), 30);
        assert!(pts.len() > 3);
        assert_eq!(pts.first(), pts.last());
    }
}
