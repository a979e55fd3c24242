// src/pipeline/detector.rs
//
// Per-frame lane detection: edges, ROI and color gating, line detection,
// lane estimation, compositing.

use crate::color_gate::{bitwise_and, ColorGate};
use crate::error::LaneError;
use crate::hough::{LineDetector, ProbabilisticHough};
use crate::lane_estimator::LaneEstimator;
use crate::preprocessing::EdgeExtractor;
use crate::render::LaneRenderer;
use crate::roi::PolygonSelector;
use crate::types::{Config, LaneLine, LineSegment};
use image::{GrayImage, RgbImage};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DetectorKind {
    /// Canny edges, probabilistic Hough, per-side averaging
    #[default]
    A,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::A => "a",
        }
    }
}

/// Result for one frame. `frame` is the input unchanged when no segment was
/// detected, the composited frame otherwise.
#[derive(Debug, Clone)]
pub struct LaneDetection {
    pub frame: RgbImage,
    pub lanes: Vec<LaneLine>,
    pub segments: Vec<LineSegment>,
}

impl LaneDetection {
    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }
}

pub struct LaneDetector {
    kind: DetectorKind,
    edges: EdgeExtractor,
    color_gate: ColorGate,
    lane_colors: Vec<String>,
    line_detector: Box<dyn LineDetector>,
    estimator: LaneEstimator,
    renderer: LaneRenderer,
}

impl LaneDetector {
    pub fn from_config(kind: DetectorKind, config: &Config) -> Result<Self, LaneError> {
        config.validate()?;

        let color_gate = ColorGate::new(config.colors.clone());
        // Surface unknown categories before the first frame
        color_gate.ranges_for(&config.lane_colors)?;

        let line_detector: Box<dyn LineDetector> = match kind {
            DetectorKind::A => Box::new(ProbabilisticHough::new(config.hough.clone())),
        };

        Ok(Self {
            kind,
            edges: EdgeExtractor::new(config.preprocessing.clone()),
            color_gate,
            lane_colors: config.lane_colors.clone(),
            line_detector,
            estimator: LaneEstimator::new(config.estimator.clone()),
            renderer: LaneRenderer::new(config.render.clone()),
        })
    }

    /// Replace the segment detector.
    pub fn with_line_detector(mut self, line_detector: Box<dyn LineDetector>) -> Self {
        self.line_detector = line_detector;
        self
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    /// Edge image restricted to the ROI and, when lane colors are
    /// configured, to pixels of those colors.
    pub fn gated_edges(&self, frame: &RgbImage, roi: &PolygonSelector) -> Result<GrayImage, LaneError> {
        let edges = self.edges.extract(frame);
        let masked = roi.apply(&edges)?;

        if self.lane_colors.is_empty() {
            return Ok(masked);
        }

        let color_mask = self.color_gate.mask(frame, &self.lane_colors)?;
        Ok(bitwise_and(&masked, &color_mask))
    }

    pub fn detect(&self, frame: &RgbImage, roi: &PolygonSelector) -> Result<LaneDetection, LaneError> {
        let gated = self.gated_edges(frame, roi)?;

        let segments = match self.line_detector.detect(&gated) {
            Some(segments) if !segments.is_empty() => segments,
            _ => {
                warn!("No car lanes detected");
                return Ok(LaneDetection {
                    frame: frame.clone(),
                    lanes: Vec::new(),
                    segments: Vec::new(),
                });
            }
        };

        let lanes = self.estimator.estimate(frame.height(), &segments);
        for lane in &lanes {
            debug!("{} lane: {:?}", lane.side.as_str(), lane.endpoints());
        }

        Ok(LaneDetection {
            frame: self.renderer.render(frame, &lanes),
            lanes,
            segments,
        })
    }
}
