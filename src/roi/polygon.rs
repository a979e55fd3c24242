// src/roi/polygon.rs

use crate::color_gate::{bitwise_and, MASK_ON};
use crate::error::LaneError;
use image::{GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// Closed region of interest. Vertex order is the boundary walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<(i32, i32)>,
}

impl Polygon {
    /// Build a polygon from operator or config points.
    ///
    /// A trailing vertex equal to the first one is dropped (the boundary is
    /// closed implicitly). Fewer than 3 distinct vertices is rejected.
    pub fn new(mut points: Vec<(i32, i32)>) -> Result<Self, LaneError> {
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        let mut distinct = points.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 3 {
            return Err(LaneError::InsufficientPolygon {
                points: distinct.len(),
            });
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    /// Zeroed canvas with the polygon interior and boundary set to 255.
    pub fn mask(&self, width: u32, height: u32) -> GrayImage {
        let mut canvas = GrayImage::new(width, height);
        let vertices: Vec<Point<i32>> = self.points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        draw_polygon_mut(&mut canvas, &vertices, Luma([MASK_ON]));
        canvas
    }

    /// Keep only the pixels of `image` inside the polygon.
    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        let mask = self.mask(image.width(), image.height());
        bitwise_and(image, &mask)
    }

    /// Three-channel variant of [`Polygon::apply`].
    pub fn apply_rgb(&self, frame: &RgbImage) -> RgbImage {
        let mask = self.mask(frame.width(), frame.height());
        let mut out = frame.clone();
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let m = mask.get_pixel(x, y).0[0];
            pixel.0 = pixel.0.map(|c| c & m);
        }
        out
    }
}
