// src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preprocessing: PreprocessingConfig,
    pub hough: HoughConfig,
    pub estimator: EstimatorConfig,
    pub render: RenderConfig,
    pub colors: ColorTable,
    /// Categories from `colors` used to gate edges. Empty disables the gate.
    pub lane_colors: Vec<String>,
    pub roi: RoiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Gaussian kernel size, must be odd
    pub blur_kernel_size: u32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    /// Distance resolution of the accumulator in pixels
    pub rho: f64,
    /// Angle resolution of the accumulator in radians
    pub theta: f64,
    /// Minimum accumulator votes for a line
    pub threshold: u32,
    pub min_line_length: f64,
    pub max_line_gap: f64,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            rho: 2.0,
            theta: std::f64::consts::PI / 180.0,
            threshold: 100,
            min_line_length: 40.0,
            max_line_gap: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Segments closer to horizontal than this are discarded
    pub min_angle_degrees: f64,
    /// Upper end of the extrapolated lane, as a fraction of frame height
    pub horizon_ratio: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_angle_degrees: 15.0,
            horizon_ratio: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Lane color in RGB
    pub color: [u8; 3],
    pub thickness: u32,
    pub frame_weight: f32,
    pub overlay_weight: f32,
    pub gamma: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            thickness: 10,
            frame_weight: 0.8,
            overlay_weight: 1.0,
            gamma: 1.0,
        }
    }
}

/// Inclusive HSV bounds in the 8-bit convention (H 0-180, S/V 0-255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub low: [u8; 3],
    pub high: [u8; 3],
}

impl HsvRange {
    pub const fn new(low: [u8; 3], high: [u8; 3]) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.low[c] <= hsv[c] && hsv[c] <= self.high[c])
    }
}

/// Named color categories, each a union of HSV ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTable(pub BTreeMap<String, Vec<HsvRange>>);

impl Default for ColorTable {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert(
            "red".to_string(),
            vec![
                HsvRange::new([0, 43, 46], [10, 255, 255]),
                HsvRange::new([156, 43, 46], [180, 255, 255]),
            ],
        );
        table.insert(
            "yellow".to_string(),
            vec![HsvRange::new([20, 43, 46], [30, 255, 255])],
        );
        table.insert(
            "white".to_string(),
            vec![HsvRange::new([0, 0, 100], [255, 255, 255])],
        );
        Self(table)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Pre-selected polygon vertices; empty means ask the operator
    pub polygon: Vec<[i32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// LANE GEOMETRY
// ============================================================================

/// Raw detector output, endpoints in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_vertical(&self) -> bool {
        self.x1 == self.x2
    }

    pub fn length(&self) -> f64 {
        let dx = (self.x2 - self.x1) as f64;
        let dy = (self.y2 - self.y1) as f64;
        dx.hypot(dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneSide {
    Left,
    Right,
}

impl LaneSide {
    /// Image y grows downward, so a falling slope is the left boundary.
    pub fn from_slope(slope: f64) -> Self {
        if slope < 0.0 {
            LaneSide::Left
        } else {
            LaneSide::Right
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LaneSide::Left => "LEFT",
            LaneSide::Right => "RIGHT",
        }
    }
}

/// `y = slope * x + intercept` in image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneHypothesis {
    pub slope: f64,
    pub intercept: f64,
}

impl LaneHypothesis {
    pub fn side(&self) -> LaneSide {
        LaneSide::from_slope(self.slope)
    }

    /// Angle from horizontal in degrees, in (-90, 90).
    pub fn angle_degrees(&self) -> f64 {
        self.slope.atan().to_degrees()
    }
}

/// Extrapolated lane boundary spanning the lower part of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLine {
    pub side: LaneSide,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LaneLine {
    pub fn endpoints(&self) -> [i32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_slope() {
        assert_eq!(LaneSide::from_slope(-0.5), LaneSide::Left);
        assert_eq!(LaneSide::from_slope(0.5), LaneSide::Right);
        assert_eq!(LaneSide::from_slope(0.0), LaneSide::Right);
    }

    #[test]
    fn test_hsv_range_inclusive_bounds() {
        let range = HsvRange::new([20, 43, 46], [30, 255, 255]);
        assert!(range.contains([20, 43, 46]));
        assert!(range.contains([30, 255, 255]));
        assert!(!range.contains([19, 100, 100]));
        assert!(!range.contains([25, 42, 100]));
    }

    #[test]
    fn test_default_color_table_has_two_red_ranges() {
        let table = ColorTable::default();
        assert_eq!(table.0["red"].len(), 2);
        assert_eq!(table.0["yellow"].len(), 1);
        assert_eq!(table.0["white"].len(), 1);
    }

    #[test]
    fn test_hypothesis_angle() {
        let h = LaneHypothesis {
            slope: 1.0,
            intercept: 0.0,
        };
        assert!((h.angle_degrees() - 45.0).abs() < 1e-9);
        assert_eq!(h.side(), LaneSide::Right);
    }
}
