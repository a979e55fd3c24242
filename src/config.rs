// src/config.rs

use crate::error::LaneError;
use crate::roi::Polygon;
use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), LaneError> {
        let pre = &self.preprocessing;
        if pre.blur_kernel_size == 0 || pre.blur_kernel_size % 2 == 0 {
            return Err(LaneError::InvalidConfig(format!(
                "blur_kernel_size must be a positive odd number, got {}",
                pre.blur_kernel_size
            )));
        }
        if pre.canny_low < 0.0 || pre.canny_low > pre.canny_high {
            return Err(LaneError::InvalidConfig(format!(
                "canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                pre.canny_low, pre.canny_high
            )));
        }

        let hough = &self.hough;
        if hough.rho <= 0.0 || hough.theta <= 0.0 {
            return Err(LaneError::InvalidConfig(
                "hough rho and theta resolutions must be positive".to_string(),
            ));
        }
        if hough.threshold == 0 {
            return Err(LaneError::InvalidConfig(
                "hough threshold must be at least 1".to_string(),
            ));
        }

        let est = &self.estimator;
        if !(0.0..90.0).contains(&est.min_angle_degrees) {
            return Err(LaneError::InvalidConfig(format!(
                "min_angle_degrees must be in [0, 90), got {}",
                est.min_angle_degrees
            )));
        }
        if !(0.0..=1.0).contains(&est.horizon_ratio) {
            return Err(LaneError::InvalidConfig(format!(
                "horizon_ratio must be in [0, 1], got {}",
                est.horizon_ratio
            )));
        }

        for name in &self.lane_colors {
            if !self.colors.0.contains_key(name) {
                return Err(LaneError::UnknownColor { name: name.clone() });
            }
        }

        if !self.roi.polygon.is_empty() {
            Polygon::new(self.roi.polygon.iter().map(|p| (p[0], p[1])).collect())?;
        }

        Ok(())
    }
}
