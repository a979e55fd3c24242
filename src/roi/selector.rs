// src/roi/selector.rs
//
// Operator-driven ROI selection.
//
//   AWAITING_INPUT → COLLECTING_POINTS → AWAITING_CONFIRM → CONFIRMED
//                          ↑                    │
//                          └──── reject ────────┘
//
// A selector built from a pre-supplied polygon starts CONFIRMED and never
// prompts. Once confirmed the polygon is fixed until `reset()`.

use super::input::{OperatorEvent, OperatorInput, SelectionStage};
use super::polygon::Polygon;
use crate::error::LaneError;
use crate::types::RoiConfig;
use anyhow::Result;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use tracing::{debug, info, warn};

const POINT_MARKER_RADIUS: i32 = 4;
const POINT_MARKER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiState {
    AwaitingInput,
    CollectingPoints,
    AwaitingConfirm,
    Confirmed,
}

impl RoiState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoiState::AwaitingInput => "AWAITING_INPUT",
            RoiState::CollectingPoints => "COLLECTING_POINTS",
            RoiState::AwaitingConfirm => "AWAITING_CONFIRM",
            RoiState::Confirmed => "CONFIRMED",
        }
    }
}

/// Result of ending point collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Enough points; the candidate polygon waits for confirmation
    ReadyToConfirm,
    /// Too few points; the buffer was cleared and collection restarted
    Rejected { points: usize },
}

#[derive(Debug, Clone)]
pub struct PolygonSelector {
    state: RoiState,
    points: Vec<(i32, i32)>,
    candidate: Option<Polygon>,
    polygon: Option<Polygon>,
}

impl Default for PolygonSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonSelector {
    pub fn new() -> Self {
        Self {
            state: RoiState::AwaitingInput,
            points: Vec::new(),
            candidate: None,
            polygon: None,
        }
    }

    /// Selector fixed to a known polygon; starts CONFIRMED.
    pub fn with_polygon(points: Vec<(i32, i32)>) -> Result<Self, LaneError> {
        let polygon = Polygon::new(points)?;
        info!("✓ ROI preset with {} vertices", polygon.points().len());
        Ok(Self {
            state: RoiState::Confirmed,
            points: Vec::new(),
            candidate: None,
            polygon: Some(polygon),
        })
    }

    pub fn from_config(config: &RoiConfig) -> Result<Self, LaneError> {
        if config.polygon.is_empty() {
            Ok(Self::new())
        } else {
            Self::with_polygon(config.polygon.iter().map(|p| (p[0], p[1])).collect())
        }
    }

    pub fn state(&self) -> RoiState {
        self.state
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == RoiState::Confirmed
    }

    /// Points collected so far in the current attempt.
    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    pub fn polygon(&self) -> Option<&Polygon> {
        self.polygon.as_ref()
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    pub fn begin_collection(&mut self) -> Result<(), LaneError> {
        match self.state {
            RoiState::AwaitingInput => {
                self.points.clear();
                self.state = RoiState::CollectingPoints;
                debug!("ROI: collecting points");
                Ok(())
            }
            RoiState::CollectingPoints => Ok(()),
            _ => Err(self.unexpected(RoiState::AwaitingInput)),
        }
    }

    /// Append a vertex. The first point also starts collection.
    pub fn add_point(&mut self, x: i32, y: i32) -> Result<(), LaneError> {
        if self.state == RoiState::AwaitingInput {
            self.begin_collection()?;
        }
        if self.state != RoiState::CollectingPoints {
            return Err(self.unexpected(RoiState::CollectingPoints));
        }
        self.points.push((x, y));
        debug!("ROI: point ({}, {}), {} selected", x, y, self.points.len());
        Ok(())
    }

    /// End collection regardless of point count.
    pub fn finish_collection(&mut self) -> Result<FinishOutcome, LaneError> {
        if self.state != RoiState::CollectingPoints {
            return Err(self.unexpected(RoiState::CollectingPoints));
        }

        match Polygon::new(self.points.clone()) {
            Ok(candidate) => {
                self.candidate = Some(candidate);
                self.state = RoiState::AwaitingConfirm;
                debug!("ROI: {} points, awaiting confirmation", self.points.len());
                Ok(FinishOutcome::ReadyToConfirm)
            }
            Err(_) => {
                let points = self.points.len();
                warn!(
                    "ROI: {} point(s) selected, please select at least 3 points",
                    points
                );
                self.points.clear();
                Ok(FinishOutcome::Rejected { points })
            }
        }
    }

    pub fn confirm(&mut self) -> Result<(), LaneError> {
        if self.state != RoiState::AwaitingConfirm {
            return Err(self.unexpected(RoiState::AwaitingConfirm));
        }
        let polygon = self.candidate.take().ok_or(LaneError::InsufficientPolygon {
            points: self.points.len(),
        })?;
        info!("✓ ROI confirmed: {:?}", polygon.points());
        self.polygon = Some(polygon);
        self.points.clear();
        self.state = RoiState::Confirmed;
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), LaneError> {
        if self.state != RoiState::AwaitingConfirm {
            return Err(self.unexpected(RoiState::AwaitingConfirm));
        }
        info!("ROI rejected, re-select the polygon");
        self.candidate = None;
        self.points.clear();
        self.state = RoiState::CollectingPoints;
        Ok(())
    }

    /// Forget any polygon and go back to AWAITING_INPUT.
    pub fn reset(&mut self) {
        self.state = RoiState::AwaitingInput;
        self.points.clear();
        self.candidate = None;
        self.polygon = None;
    }

    // ------------------------------------------------------------------------
    // Masking
    // ------------------------------------------------------------------------

    /// Mask of the confirmed polygon for a `width`×`height` frame.
    pub fn mask(&self, width: u32, height: u32) -> Result<GrayImage, LaneError> {
        Ok(self.confirmed()?.mask(width, height))
    }

    /// Keep only the pixels of `image` inside the confirmed polygon.
    pub fn apply(&self, image: &GrayImage) -> Result<GrayImage, LaneError> {
        Ok(self.confirmed()?.apply(image))
    }

    /// Mask of the polygon waiting for confirmation.
    pub fn pending_mask(&self, width: u32, height: u32) -> Option<GrayImage> {
        self.candidate.as_ref().map(|p| p.mask(width, height))
    }

    fn confirmed(&self) -> Result<&Polygon, LaneError> {
        self.polygon
            .as_ref()
            .ok_or_else(|| self.unexpected(RoiState::Confirmed))
    }

    // ------------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------------

    /// Run the workflow against `input` until the polygon is confirmed and
    /// return its mask for `frame`. A confirmed selector returns immediately.
    pub fn select(&mut self, frame: &RgbImage, input: &mut dyn OperatorInput) -> Result<GrayImage> {
        let (width, height) = frame.dimensions();

        loop {
            match self.state {
                RoiState::Confirmed => return Ok(self.mask(width, height)?),
                RoiState::AwaitingInput => self.begin_collection()?,
                RoiState::CollectingPoints => {
                    let preview = self.collection_preview(frame);
                    match input.next_event(SelectionStage::Collecting, &preview)? {
                        OperatorEvent::Click { x, y } => self.add_point(x, y)?,
                        OperatorEvent::Finish => {
                            self.finish_collection()?;
                        }
                        OperatorEvent::Key(c) if is_accept_key(c) => {
                            self.finish_collection()?;
                        }
                        OperatorEvent::Key(_) => {}
                    }
                }
                RoiState::AwaitingConfirm => {
                    let preview = self.confirmation_preview(frame);
                    match input.next_event(SelectionStage::Confirming, &preview)? {
                        OperatorEvent::Click { .. } => {}
                        OperatorEvent::Finish => self.confirm()?,
                        OperatorEvent::Key(c) if is_accept_key(c) => self.confirm()?,
                        OperatorEvent::Key(_) => self.reject()?,
                    }
                }
            }
        }
    }

    /// Frame with the points collected so far marked on it.
    fn collection_preview(&self, frame: &RgbImage) -> RgbImage {
        let mut preview = frame.clone();
        for &(x, y) in &self.points {
            draw_filled_circle_mut(&mut preview, (x, y), POINT_MARKER_RADIUS, POINT_MARKER_COLOR);
        }
        preview
    }

    /// Frame masked by the candidate polygon.
    fn confirmation_preview(&self, frame: &RgbImage) -> RgbImage {
        match &self.candidate {
            Some(candidate) => candidate.apply_rgb(frame),
            None => frame.clone(),
        }
    }

    fn unexpected(&self, expected: RoiState) -> LaneError {
        LaneError::InvalidState {
            expected: expected.as_str(),
            actual: self.state.as_str(),
        }
    }
}

fn is_accept_key(c: char) -> bool {
    c.eq_ignore_ascii_case(&'y')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::input::ScriptedInput;
    use image::Luma;

    fn frame(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([90, 90, 90]))
    }

    fn triangle() -> Vec<(i32, i32)> {
        vec![(10, 90), (50, 20), (90, 90)]
    }

    #[test]
    fn test_preset_polygon_starts_confirmed() {
        let selector = PolygonSelector::with_polygon(triangle()).unwrap();
        assert_eq!(selector.state(), RoiState::Confirmed);
        assert!(selector.mask(100, 100).is_ok());
    }

    #[test]
    fn test_preset_polygon_never_prompts() {
        let mut selector = PolygonSelector::with_polygon(triangle()).unwrap();
        let mut input = ScriptedInput::new(Vec::new());
        let mask = selector.select(&frame(100, 100), &mut input).unwrap();
        assert_eq!(mask.get_pixel(50, 70).0[0], 255);
    }

    #[test]
    fn test_preset_short_polygon_rejected() {
        assert!(matches!(
            PolygonSelector::with_polygon(vec![(0, 0), (1, 1)]),
            Err(LaneError::InsufficientPolygon { .. })
        ));
    }

    #[test]
    fn test_manual_happy_path() {
        let mut selector = PolygonSelector::new();
        assert_eq!(selector.state(), RoiState::AwaitingInput);

        for (x, y) in triangle() {
            selector.add_point(x, y).unwrap();
        }
        assert_eq!(selector.state(), RoiState::CollectingPoints);
        assert_eq!(selector.points().len(), 3);

        assert_eq!(
            selector.finish_collection().unwrap(),
            FinishOutcome::ReadyToConfirm
        );
        assert_eq!(selector.state(), RoiState::AwaitingConfirm);
        assert!(selector.pending_mask(100, 100).is_some());

        selector.confirm().unwrap();
        assert!(selector.is_confirmed());
        assert_eq!(selector.polygon().unwrap().points(), triangle().as_slice());
    }

    #[test]
    fn test_too_few_points_resets_buffer() {
        let mut selector = PolygonSelector::new();
        selector.add_point(1, 1).unwrap();
        selector.add_point(5, 5).unwrap();

        let outcome = selector.finish_collection().unwrap();
        assert_eq!(outcome, FinishOutcome::Rejected { points: 2 });
        assert_eq!(selector.state(), RoiState::CollectingPoints);
        assert!(selector.points().is_empty());
        assert!(selector.polygon().is_none());
        assert!(selector.mask(10, 10).is_err());
    }

    #[test]
    fn test_reject_restarts_collection() {
        let mut selector = PolygonSelector::new();
        for (x, y) in triangle() {
            selector.add_point(x, y).unwrap();
        }
        selector.finish_collection().unwrap();
        selector.reject().unwrap();

        assert_eq!(selector.state(), RoiState::CollectingPoints);
        assert!(selector.points().is_empty());
        assert!(selector.pending_mask(100, 100).is_none());
    }

    #[test]
    fn test_transitions_out_of_order_are_errors() {
        let mut selector = PolygonSelector::new();
        assert!(matches!(
            selector.confirm(),
            Err(LaneError::InvalidState { .. })
        ));
        assert!(selector.reject().is_err());
        assert!(selector.finish_collection().is_err());

        let mut confirmed = PolygonSelector::with_polygon(triangle()).unwrap();
        assert!(confirmed.add_point(3, 3).is_err());
        assert!(confirmed.finish_collection().is_err());
    }

    #[test]
    fn test_confirmed_polygon_is_reused_across_frames() {
        let mut selector = PolygonSelector::new();
        let mut input = ScriptedInput::new(vec![
            OperatorEvent::Click { x: 10, y: 90 },
            OperatorEvent::Click { x: 50, y: 20 },
            OperatorEvent::Click { x: 90, y: 90 },
            OperatorEvent::Finish,
            OperatorEvent::Key('y'),
        ]);

        let first = selector.select(&frame(100, 100), &mut input).unwrap();

        // No events left: a second prompt would fail
        let bright = RgbImage::from_pixel(100, 100, Rgb([250, 250, 250]));
        let second = selector.select(&bright, &mut input).unwrap();
        assert_eq!(first, second);

        let edges = GrayImage::from_pixel(100, 100, Luma([200]));
        let a = selector.apply(&edges).unwrap();
        let b = selector.apply(&edges).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get_pixel(50, 70).0[0], 200);
        assert_eq!(a.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn test_scripted_retry_loop() {
        let mut selector = PolygonSelector::new();
        let mut input = ScriptedInput::new(vec![
            // Two points only: rejected, buffer cleared
            OperatorEvent::Click { x: 0, y: 0 },
            OperatorEvent::Click { x: 5, y: 5 },
            OperatorEvent::Finish,
            // Unrelated keys while collecting are ignored
            OperatorEvent::Key('q'),
            // Valid triangle, but the operator rejects it
            OperatorEvent::Click { x: 0, y: 0 },
            OperatorEvent::Click { x: 20, y: 0 },
            OperatorEvent::Click { x: 0, y: 20 },
            OperatorEvent::Key('y'),
            OperatorEvent::Click { x: 3, y: 3 },
            OperatorEvent::Key('n'),
            // Final selection accepted
            OperatorEvent::Click { x: 10, y: 90 },
            OperatorEvent::Click { x: 50, y: 20 },
            OperatorEvent::Click { x: 90, y: 90 },
            OperatorEvent::Key('Y'),
            OperatorEvent::Key('Y'),
        ]);

        selector.select(&frame(100, 100), &mut input).unwrap();
        assert!(selector.is_confirmed());
        assert_eq!(selector.polygon().unwrap().points(), triangle().as_slice());
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_exhausted_input_is_error_not_hang() {
        let mut selector = PolygonSelector::new();
        let mut input = ScriptedInput::new(vec![OperatorEvent::Click { x: 1, y: 1 }]);
        assert!(selector.select(&frame(10, 10), &mut input).is_err());
        assert!(!selector.is_confirmed());
    }

    #[test]
    fn test_reset_clears_confirmed_polygon() {
        let mut selector = PolygonSelector::with_polygon(triangle()).unwrap();
        selector.reset();
        assert_eq!(selector.state(), RoiState::AwaitingInput);
        assert!(selector.polygon().is_none());
    }

    #[test]
    fn test_from_config() {
        let empty = PolygonSelector::from_config(&RoiConfig::default()).unwrap();
        assert_eq!(empty.state(), RoiState::AwaitingInput);

        let preset = PolygonSelector::from_config(&RoiConfig {
            polygon: vec![[10, 90], [50, 20], [90, 90]],
        })
        .unwrap();
        assert!(preset.is_confirmed());
    }
}
