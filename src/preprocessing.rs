// src/preprocessing.rs

use crate::types::PreprocessingConfig;
use image::{GrayImage, Luma, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

/// Grayscale → Gaussian blur → Canny.
#[derive(Debug, Clone, Default)]
pub struct EdgeExtractor {
    config: PreprocessingConfig,
}

impl EdgeExtractor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, frame: &RgbImage) -> GrayImage {
        let gray = rgb_to_gray(frame);
        let blurred = self.blur(&gray);
        canny(&blurred, self.config.canny_low, self.config.canny_high)
    }

    pub fn blur(&self, gray: &GrayImage) -> GrayImage {
        if self.config.blur_kernel_size <= 1 {
            return gray.clone();
        }
        gaussian_blur_f32(gray, sigma_for_kernel(self.config.blur_kernel_size))
    }
}

/// BT.601 luma, rounded.
pub fn rgb_to_gray(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Sigma implied by an odd kernel size when none is given explicitly.
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_sigma_for_kernel() {
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_rgb_to_gray() {
        let mut frame = RgbImage::new(3, 1);
        frame.put_pixel(0, 0, Rgb([255, 255, 255]));
        frame.put_pixel(1, 0, Rgb([255, 0, 0]));
        frame.put_pixel(2, 0, Rgb([0, 0, 0]));
        let gray = rgb_to_gray(&frame);
        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
        assert_eq!(gray.get_pixel(1, 0).0[0], 76);
        assert_eq!(gray.get_pixel(2, 0).0[0], 0);
    }

    #[test]
    fn test_uniform_frame_has_no_edges() {
        let frame = RgbImage::from_pixel(32, 32, Rgb([120, 120, 120]));
        let edges = EdgeExtractor::default().extract(&frame);
        assert_eq!(edges.dimensions(), (32, 32));
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_step_produces_edges() {
        let frame = RgbImage::from_fn(40, 40, |x, _| {
            if x < 20 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let edges = EdgeExtractor::default().extract(&frame);
        let column_hits = (0..40).filter(|&y| {
            (17..23).any(|x| edges.get_pixel(x, y).0[0] == 255)
        });
        assert!(column_hits.count() > 30);
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }
}
