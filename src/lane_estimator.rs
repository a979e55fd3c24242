// src/lane_estimator.rs
//
// Left/right lane boundary estimation from raw Hough segments.
//
// Each segment is fit to `y = m·x + b`, near-horizontal segments are
// dropped, the rest are bucketed by slope sign and averaged per side. The
// averaged line is then extrapolated from the bottom of the frame up to
// `horizon_ratio · H`.

use crate::types::{EstimatorConfig, LaneHypothesis, LaneLine, LaneSide, LineSegment};
use tracing::debug;

/// Averaged slopes smaller than this cannot be extrapolated to a fixed y.
const MIN_EXTRAPOLATION_SLOPE: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct SideBuckets {
    pub left: Vec<LaneHypothesis>,
    pub right: Vec<LaneHypothesis>,
}

/// Averaged hypothesis per side, before extrapolation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideHypotheses {
    pub right: Option<LaneHypothesis>,
    pub left: Option<LaneHypothesis>,
}

impl SideHypotheses {
    /// Right first, then left.
    pub fn iter(&self) -> impl Iterator<Item = LaneHypothesis> {
        self.right.into_iter().chain(self.left)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaneEstimator {
    config: EstimatorConfig,
}

impl LaneEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Estimate up to two lane lines for a frame `frame_height` pixels tall.
    /// Output order is right then left; a side with no qualifying segment
    /// is omitted.
    pub fn estimate(&self, frame_height: u32, segments: &[LineSegment]) -> Vec<LaneLine> {
        let hypotheses = self.hypotheses(segments);

        let lanes: Vec<LaneLine> = hypotheses
            .iter()
            .filter_map(|h| self.extrapolate(&h, frame_height))
            .collect();

        debug!(
            "Estimated {} lane(s) from {} segment(s): right={:?} left={:?}",
            lanes.len(),
            segments.len(),
            hypotheses.right,
            hypotheses.left
        );

        lanes
    }

    /// Per-side mean slope and intercept.
    pub fn hypotheses(&self, segments: &[LineSegment]) -> SideHypotheses {
        let buckets = self.classify(segments);
        SideHypotheses {
            right: average(&buckets.right),
            left: average(&buckets.left),
        }
    }

    /// Fit every segment and sort it into a side, dropping vertical and
    /// near-horizontal ones.
    pub fn classify(&self, segments: &[LineSegment]) -> SideBuckets {
        let min_angle = self.config.min_angle_degrees.to_radians();
        let mut buckets = SideBuckets::default();

        for segment in segments {
            let Some(hypothesis) = fit_segment(segment) else {
                debug!("Skipping vertical segment {:?}", segment);
                continue;
            };

            if hypothesis.slope.atan().abs() < min_angle {
                continue;
            }

            match hypothesis.side() {
                LaneSide::Left => buckets.left.push(hypothesis),
                LaneSide::Right => buckets.right.push(hypothesis),
            }
        }

        buckets
    }

    /// Endpoints of `hypothesis` at `y = H` and `y = trunc(horizon_ratio · H)`.
    pub fn extrapolate(&self, hypothesis: &LaneHypothesis, frame_height: u32) -> Option<LaneLine> {
        let LaneHypothesis { slope, intercept } = *hypothesis;
        if !slope.is_finite() || !intercept.is_finite() || slope.abs() < MIN_EXTRAPOLATION_SLOPE {
            debug!("Cannot extrapolate degenerate hypothesis {:?}", hypothesis);
            return None;
        }

        let y1 = frame_height as i32;
        let y2 = (frame_height as f64 * self.config.horizon_ratio) as i32;
        let x1 = floor_div(y1 as f64 - intercept, slope);
        let x2 = floor_div(y2 as f64 - intercept, slope);
        if !x1.is_finite() || !x2.is_finite() {
            return None;
        }

        Some(LaneLine {
            side: hypothesis.side(),
            x1: x1 as i32,
            y1,
            x2: x2 as i32,
            y2,
        })
    }
}

/// Least-squares line through the two endpoints. `None` for vertical segments.
pub fn fit_segment(segment: &LineSegment) -> Option<LaneHypothesis> {
    if segment.is_vertical() {
        return None;
    }
    let dx = (segment.x2 - segment.x1) as f64;
    let dy = (segment.y2 - segment.y1) as f64;
    let slope = dy / dx;
    let intercept = segment.y1 as f64 - slope * segment.x1 as f64;
    Some(LaneHypothesis { slope, intercept })
}

/// Arithmetic mean of slopes and intercepts.
pub fn average(hypotheses: &[LaneHypothesis]) -> Option<LaneHypothesis> {
    if hypotheses.is_empty() {
        return None;
    }
    let n = hypotheses.len() as f64;
    let slope = hypotheses.iter().map(|h| h.slope).sum::<f64>() / n;
    let intercept = hypotheses.iter().map(|h| h.intercept).sum::<f64>() / n;
    Some(LaneHypothesis { slope, intercept })
}

/// Floored float division, computed through the remainder so results just
/// below an integer are not rounded across it.
pub fn floor_div(a: f64, b: f64) -> f64 {
    let rem = a % b;
    let mut div = (a - rem) / b;
    if rem != 0.0 && ((b < 0.0) != (rem < 0.0)) {
        div -= 1.0;
    }
    if div == 0.0 {
        return 0.0;
    }
    let mut floored = div.floor();
    if div - floored > 0.5 {
        floored += 1.0;
    }
    floored
}
