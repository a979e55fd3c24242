// src/render.rs
//
// Lane overlay: lanes are painted onto a black canvas the size of the frame,
// then added onto the frame with `frame_weight·frame + overlay_weight·canvas
// + gamma`, rounded half-to-even and saturated per channel.

use crate::types::{LaneLine, RenderConfig};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

#[derive(Debug, Clone, Default)]
pub struct LaneRenderer {
    config: RenderConfig,
}

impl LaneRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Frame with the lanes blended on top.
    pub fn render(&self, frame: &RgbImage, lanes: &[LaneLine]) -> RgbImage {
        let canvas = self.draw_lanes(frame.width(), frame.height(), lanes);
        add_weighted(
            frame,
            self.config.frame_weight,
            &canvas,
            self.config.overlay_weight,
            self.config.gamma,
        )
    }

    /// Black canvas with each lane drawn as a thick line.
    pub fn draw_lanes(&self, width: u32, height: u32, lanes: &[LaneLine]) -> RgbImage {
        let mut canvas = RgbImage::new(width, height);
        let color = Rgb(self.config.color);
        for lane in lanes {
            draw_thick_line(
                &mut canvas,
                (lane.x1 as f64, lane.y1 as f64),
                (lane.x2 as f64, lane.y2 as f64),
                self.config.thickness,
                color,
            );
        }
        canvas
    }
}

/// `alpha·a + beta·b + gamma` per channel, saturated to `u8`.
pub fn add_weighted(a: &RgbImage, alpha: f32, b: &RgbImage, beta: f32, gamma: f32) -> RgbImage {
    let mut out = RgbImage::new(a.width(), a.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let pa = a.get_pixel(x, y).0;
        let pb = b.get_pixel(x, y).0;
        for c in 0..3 {
            let value = pa[c] as f32 * alpha + pb[c] as f32 * beta + gamma;
            pixel.0[c] = value.round_ties_even().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Line of the given pixel width with round caps, clipped to the canvas.
pub fn draw_thick_line(
    canvas: &mut RgbImage,
    start: (f64, f64),
    end: (f64, f64),
    thickness: u32,
    color: Rgb<u8>,
) {
    if thickness == 0 {
        return;
    }

    let margin = thickness as f64;
    let bounds = (
        -margin,
        -margin,
        canvas.width() as f64 + margin,
        canvas.height() as f64 + margin,
    );
    let Some((p1, p2)) = clip_segment(start, end, bounds) else {
        return;
    };

    if thickness == 1 {
        draw_line_segment_mut(
            canvas,
            (p1.0 as f32, p1.1 as f32),
            (p2.0 as f32, p2.1 as f32),
            color,
        );
        return;
    }

    let half = thickness as f64 / 2.0;
    let radius = (thickness / 2) as i32;
    let (dx, dy) = (p2.0 - p1.0, p2.1 - p1.1);
    let len = dx.hypot(dy);

    if len > f64::EPSILON {
        let (nx, ny) = (-dy / len * half, dx / len * half);
        let corners = [
            (p1.0 + nx, p1.1 + ny),
            (p2.0 + nx, p2.1 + ny),
            (p2.0 - nx, p2.1 - ny),
            (p1.0 - nx, p1.1 - ny),
        ];
        let mut poly: Vec<Point<i32>> = corners
            .iter()
            .map(|&(x, y)| Point::new(x.round() as i32, y.round() as i32))
            .collect();
        poly.dedup();
        if poly.len() >= 3 && poly.first() != poly.last() {
            draw_polygon_mut(canvas, &poly, color);
        } else {
            draw_line_segment_mut(
                canvas,
                (p1.0 as f32, p1.1 as f32),
                (p2.0 as f32, p2.1 as f32),
                color,
            );
        }
    }

    for p in [p1, p2] {
        draw_filled_circle_mut(canvas, (p.0.round() as i32, p.1.round() as i32), radius, color);
    }
}

/// Liang-Barsky clip of a segment to `(x_min, y_min, x_max, y_max)`.
pub fn clip_segment(
    start: (f64, f64),
    end: (f64, f64),
    bounds: (f64, f64, f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (x_min, y_min, x_max, y_max) = bounds;
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    for (p, q) in [
        (-dx, start.0 - x_min),
        (dx, x_max - start.0),
        (-dy, start.1 - y_min),
        (dy, y_max - start.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        (start.0 + t0 * dx, start.1 + t0 * dy),
        (start.0 + t1 * dx, start.1 + t1 * dy),
    ))
}
