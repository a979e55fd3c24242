// src/color_gate.rs
//
// HSV band gating for lane paint.
//
// Each configured category (red, yellow, white, ...) is a union of
// inclusive HSV ranges. The gate mask is the bitwise OR of every range of
// every requested category, so it stays strictly binary (0 / 255).

use crate::error::LaneError;
use crate::types::{ColorTable, HsvRange};
use image::{GrayImage, Luma, RgbImage};
use tracing::debug;

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

// ============================================================================
// HSV CONVERSION
// ============================================================================

/// Convert an 8-bit RGB pixel to 8-bit HSV.
/// Returns (H: 0-180, S: 0-255, V: 0-255), hue in half-degrees.
#[inline]
pub fn rgb_to_hsv8(r: u8, g: u8, b: u8) -> [u8; 3] {
    let rf = r as f32;
    let gf = g as f32;
    let bf = b as f32;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };

    // Half-degree hue, rounded before wrapping negative values
    let h = if delta <= 0.0 {
        0.0
    } else if max == rf {
        30.0 * (gf - bf) / delta
    } else if max == gf {
        60.0 + 30.0 * (bf - rf) / delta
    } else {
        120.0 + 30.0 * (rf - gf) / delta
    };
    let mut h = (h + 0.5).floor();
    if h < 0.0 {
        h += 180.0;
    }

    [
        h.min(180.0) as u8,
        (s * 255.0).round() as u8,
        max as u8,
    ]
}

// ============================================================================
// GATE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ColorGate {
    table: ColorTable,
}

impl ColorGate {
    pub fn new(table: ColorTable) -> Self {
        Self { table }
    }

    /// Collect the ranges for `categories`, failing on the first unknown name.
    pub fn ranges_for<S: AsRef<str>>(&self, categories: &[S]) -> Result<Vec<HsvRange>, LaneError> {
        let mut ranges = Vec::new();
        for name in categories {
            let name = name.as_ref();
            let bands = self
                .table
                .0
                .get(name)
                .ok_or_else(|| LaneError::UnknownColor {
                    name: name.to_string(),
                })?;
            ranges.extend_from_slice(bands);
        }
        Ok(ranges)
    }

    /// Binary mask of pixels falling inside any band of any requested category.
    pub fn mask<S: AsRef<str>>(
        &self,
        frame: &RgbImage,
        categories: &[S],
    ) -> Result<GrayImage, LaneError> {
        let ranges = self.ranges_for(categories)?;

        let mask = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let [r, g, b] = frame.get_pixel(x, y).0;
            let hsv = rgb_to_hsv8(r, g, b);
            if ranges.iter().any(|range| range.contains(hsv)) {
                Luma([MASK_ON])
            } else {
                Luma([MASK_OFF])
            }
        });

        debug!(
            "Color gate: {} range(s), {} pixel(s) selected",
            ranges.len(),
            mask.pixels().filter(|p| p.0[0] == MASK_ON).count()
        );

        Ok(mask)
    }
}

/// Pixel-wise AND of two same-size binary or gray images.
pub fn bitwise_and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] & b.get_pixel(x, y).0[0]])
    })
}

/// Pixel-wise OR of two same-size binary or gray images.
pub fn bitwise_or(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] | b.get_pixel(x, y).0[0]])
    })
}
