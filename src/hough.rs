// src/hough.rs
//
// Line segment detection on a binary edge image.
//
// Edge pixels vote into a (theta, rho) accumulator. Peaks at or above the
// vote threshold are visited strongest-first, and each peak line is walked
// across the image to split it into segments: runs of edge pixels whose
// consecutive hits are at most `max_line_gap` apart and whose span is at
// least `min_line_length`. Pixels claimed by an emitted segment do not
// count for later peaks.

use crate::types::{HoughConfig, LineSegment};
use image::GrayImage;
use std::cmp::Reverse;
use tracing::debug;

pub trait LineDetector {
    /// `None` when no segment was found.
    fn detect(&self, edges: &GrayImage) -> Option<Vec<LineSegment>>;
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

struct HoughAccumulator {
    data: Vec<u32>,
    rho_bins: usize,
    theta_bins: usize,
    rho_step: f64,
    max_rho: f64,
    cos_table: Vec<f64>,
    sin_table: Vec<f64>,
}

impl HoughAccumulator {
    fn new(width: u32, height: u32, rho_step: f64, theta_step: f64) -> Self {
        let max_rho = (width as f64).hypot(height as f64);
        let rho_bins = ((2.0 * max_rho) / rho_step).ceil() as usize + 1;
        let theta_bins = ((std::f64::consts::PI / theta_step).round() as usize).max(1);

        let (cos_table, sin_table) = (0..theta_bins)
            .map(|t| {
                let angle = t as f64 * theta_step;
                (angle.cos(), angle.sin())
            })
            .unzip();

        Self {
            data: vec![0; rho_bins * theta_bins],
            rho_bins,
            theta_bins,
            rho_step,
            max_rho,
            cos_table,
            sin_table,
        }
    }

    #[inline]
    fn rho_index(&self, rho: f64) -> usize {
        let idx = ((rho + self.max_rho) / self.rho_step).round() as isize;
        idx.clamp(0, self.rho_bins as isize - 1) as usize
    }

    #[inline]
    fn rho_value(&self, index: usize) -> f64 {
        index as f64 * self.rho_step - self.max_rho
    }

    #[inline]
    fn votes(&self, theta: usize, rho: usize) -> u32 {
        self.data[theta * self.rho_bins + rho]
    }

    fn vote(&mut self, x: u32, y: u32) {
        for theta in 0..self.theta_bins {
            let rho = x as f64 * self.cos_table[theta] + y as f64 * self.sin_table[theta];
            let idx = theta * self.rho_bins + self.rho_index(rho);
            self.data[idx] = self.data[idx].saturating_add(1);
        }
    }

    /// Cells at or above `threshold` that are maximal in their 3×3
    /// neighborhood, strongest first.
    fn peaks(&self, threshold: u32) -> Vec<(usize, usize)> {
        let mut peaks = Vec::new();

        for theta in 0..self.theta_bins {
            for rho in 0..self.rho_bins {
                let votes = self.votes(theta, rho);
                if votes < threshold {
                    continue;
                }
                let is_max = (-1isize..=1).all(|dt| {
                    (-1isize..=1).all(|dr| {
                        let t = theta as isize + dt;
                        let r = rho as isize + dr;
                        if (dt == 0 && dr == 0)
                            || t < 0
                            || r < 0
                            || t >= self.theta_bins as isize
                            || r >= self.rho_bins as isize
                        {
                            return true;
                        }
                        self.votes(t as usize, r as usize) <= votes
                    })
                });
                if is_max {
                    peaks.push((theta, rho));
                }
            }
        }

        peaks.sort_by_key(|&(theta, rho)| (Reverse(self.votes(theta, rho)), theta, rho));
        peaks
    }
}

// ============================================================================
// DETECTOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ProbabilisticHough {
    config: HoughConfig,
}

impl ProbabilisticHough {
    pub fn new(config: HoughConfig) -> Self {
        Self { config }
    }

    /// Walk one accumulator line across the image and cut it into segments.
    fn trace(
        &self,
        edges: &GrayImage,
        used: &mut [bool],
        cos_t: f64,
        sin_t: f64,
        rho: f64,
        segments: &mut Vec<LineSegment>,
    ) {
        let (width, height) = edges.dimensions();
        let tolerance = (self.config.rho / 2.0).ceil().max(1.0) as i64;
        let is_free_edge = |x: i64, y: i64, used: &[bool]| {
            x >= 0
                && y >= 0
                && x < width as i64
                && y < height as i64
                && !used[(y as usize) * width as usize + x as usize]
                && edges.get_pixel(x as u32, y as u32).0[0] > 0
        };

        // Step along the axis the line runs closest to.
        let along_x = sin_t.abs() > cos_t.abs();
        let steps = (if along_x { width } else { height }) as i64;

        let mut run: Vec<(i64, i64)> = Vec::new();
        for i in 0..steps {
            let (x, y) = if along_x {
                (i, ((rho - i as f64 * cos_t) / sin_t).round() as i64)
            } else {
                (((rho - i as f64 * sin_t) / cos_t).round() as i64, i)
            };

            let claimed: &[bool] = used;
            let hit = std::iter::once(0)
                .chain((1..=tolerance).flat_map(|d| [-d, d]))
                .map(|d| if along_x { (x, y + d) } else { (x + d, y) })
                .find(|&(px, py)| is_free_edge(px, py, claimed));

            let Some(point) = hit else {
                continue;
            };

            if let Some(&last) = run.last() {
                if distance(last, point) > self.config.max_line_gap {
                    self.close_run(&mut run, width, used, segments);
                }
            }
            run.push(point);
        }
        self.close_run(&mut run, width, used, segments);
    }

    fn close_run(
        &self,
        run: &mut Vec<(i64, i64)>,
        width: u32,
        used: &mut [bool],
        segments: &mut Vec<LineSegment>,
    ) {
        if let (Some(&first), Some(&last)) = (run.first(), run.last()) {
            if distance(first, last) >= self.config.min_line_length {
                for &(x, y) in run.iter() {
                    used[(y as usize) * width as usize + x as usize] = true;
                }
                segments.push(LineSegment::new(
                    first.0 as i32,
                    first.1 as i32,
                    last.0 as i32,
                    last.1 as i32,
                ));
            }
        }
        run.clear();
    }
}

impl LineDetector for ProbabilisticHough {
    fn detect(&self, edges: &GrayImage) -> Option<Vec<LineSegment>> {
        let (width, height) = edges.dimensions();
        let mut accumulator =
            HoughAccumulator::new(width, height, self.config.rho, self.config.theta);

        let mut edge_count = 0usize;
        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel.0[0] > 0 {
                accumulator.vote(x, y);
                edge_count += 1;
            }
        }
        if edge_count == 0 {
            return None;
        }

        let peaks = accumulator.peaks(self.config.threshold);
        let mut used = vec![false; width as usize * height as usize];
        let mut segments = Vec::new();

        for &(theta, rho) in &peaks {
            self.trace(
                edges,
                &mut used,
                accumulator.cos_table[theta],
                accumulator.sin_table[theta],
                accumulator.rho_value(rho),
                &mut segments,
            );
        }

        debug!(
            "Hough: {} edge pixel(s), {} peak(s), {} segment(s)",
            edge_count,
            peaks.len(),
            segments.len()
        );

        if segments.is_empty() {
            None
        } else {
            Some(segments)
        }
    }
}

fn distance(a: (i64, i64), b: (i64, i64)) -> f64 {
    ((b.0 - a.0) as f64).hypot((b.1 - a.1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_line_segment_mut;

    fn detector() -> ProbabilisticHough {
        ProbabilisticHough::new(HoughConfig {
            rho: 1.0,
            theta: std::f64::consts::PI / 180.0,
            threshold: 30,
            min_line_length: 40.0,
            max_line_gap: 5.0,
        })
    }

    fn canvas() -> GrayImage {
        GrayImage::new(100, 100)
    }

    #[test]
    fn test_empty_image_finds_nothing() {
        assert!(ProbabilisticHough::default().detect(&canvas()).is_none());
    }

    #[test]
    fn test_diagonal_line() {
        let mut edges = canvas();
        draw_line_segment_mut(&mut edges, (10.0, 10.0), (90.0, 90.0), Luma([255]));

        let segments = detector().detect(&edges).unwrap();
        let longest = segments
            .iter()
            .max_by(|a, b| a.length().total_cmp(&b.length()))
            .unwrap();
        assert!(longest.length() > 100.0, "got {:?}", segments);
        let slope = (longest.y2 - longest.y1) as f64 / (longest.x2 - longest.x1) as f64;
        assert!((slope - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_vertical_line() {
        let mut edges = canvas();
        draw_line_segment_mut(&mut edges, (50.0, 5.0), (50.0, 95.0), Luma([255]));

        let segments = detector().detect(&edges).unwrap();
        assert!(segments.iter().any(|s| s.is_vertical() && s.length() >= 80.0));
    }

    #[test]
    fn test_gap_splits_segment() {
        let mut edges = canvas();
        draw_line_segment_mut(&mut edges, (0.0, 50.0), (45.0, 50.0), Luma([255]));
        draw_line_segment_mut(&mut edges, (55.0, 50.0), (99.0, 50.0), Luma([255]));

        let split = detector().detect(&edges).unwrap();
        assert_eq!(split.len(), 2, "got {:?}", split);

        let bridged = ProbabilisticHough::new(HoughConfig {
            max_line_gap: 20.0,
            ..detector().config
        })
        .detect(&edges)
        .unwrap();
        assert_eq!(bridged.len(), 1, "got {:?}", bridged);
        assert!(bridged[0].length() >= 95.0);
    }

    #[test]
    fn test_short_lines_dropped() {
        let mut edges = canvas();
        draw_line_segment_mut(&mut edges, (10.0, 10.0), (30.0, 30.0), Luma([255]));
        let lenient_votes = ProbabilisticHough::new(HoughConfig {
            threshold: 5,
            ..detector().config
        });
        assert!(lenient_votes.detect(&edges).is_none());
    }

    #[test]
    fn test_threshold_blocks_weak_lines() {
        let mut edges = canvas();
        draw_line_segment_mut(&mut edges, (0.0, 20.0), (99.0, 20.0), Luma([255]));
        let strict = ProbabilisticHough::new(HoughConfig {
            threshold: 500,
            ..detector().config
        });
        assert!(strict.detect(&edges).is_none());
    }
}
