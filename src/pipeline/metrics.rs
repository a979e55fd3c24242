// src/pipeline/metrics.rs
//
// Per-run counters, reported once the frame source is exhausted.

use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RunMetrics {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_without_segments: u64,
    pub frames_with_lanes: u64,
    pub lanes_found: u64,
    pub started_at: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            frames_processed: 0,
            frames_skipped: 0,
            frames_without_segments: 0,
            frames_with_lanes: 0,
            lanes_found: 0,
            started_at: Instant::now(),
        }
    }

    /// Empty frame from the source, or a frame whose processing failed.
    pub fn record_skipped(&mut self) {
        self.frames_skipped += 1;
    }

    pub fn record_frame(&mut self, segments: usize, lanes: usize) {
        self.frames_processed += 1;
        if segments == 0 {
            self.frames_without_segments += 1;
        }
        if lanes > 0 {
            self.frames_with_lanes += 1;
        }
        self.lanes_found += lanes as u64;
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.frames_processed as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            frames_without_segments: self.frames_without_segments,
            frames_with_lanes: self.frames_with_lanes,
            lanes_found: self.lanes_found,
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_without_segments: u64,
    pub frames_with_lanes: u64,
    pub lanes_found: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!("📊 Final Report:");
        info!("  Frames processed: {}", self.frames_processed);
        info!("  Frames skipped: {}", self.frames_skipped);
        info!(
            "  Frames with lanes: {} ({:.1}%)",
            self.frames_with_lanes,
            100.0 * self.frames_with_lanes as f64 / self.frames_processed.max(1) as f64
        );
        info!("  Frames without segments: {}", self.frames_without_segments);
        info!("  Lanes found: {}", self.lanes_found);
        info!("  Processing Speed: {:.1} FPS", self.fps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut metrics = RunMetrics::new();
        metrics.record_skipped();
        metrics.record_frame(0, 0);
        metrics.record_frame(5, 2);
        metrics.record_frame(3, 1);
        metrics.record_frame(4, 0);

        let summary = metrics.summary();
        assert_eq!(summary.frames_processed, 4);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.frames_without_segments, 1);
        assert_eq!(summary.frames_with_lanes, 2);
        assert_eq!(summary.lanes_found, 3);
    }
}
