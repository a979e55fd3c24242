// src/pipeline/mod.rs
//
// Frame loop: pull frames, make sure an ROI is confirmed, detect lanes on
// every frame, hand results to the sink.

pub mod detector;
pub mod metrics;

pub use detector::{DetectorKind, LaneDetection, LaneDetector};
pub use metrics::{MetricsSummary, RunMetrics};

use crate::frame_source::FrameSource;
use crate::output::FrameSink;
use crate::roi::{OperatorInput, PolygonSelector};
use anyhow::{Context, Result};
use tracing::{debug, info};

pub struct Pipeline {
    detector: LaneDetector,
    roi: PolygonSelector,
}

impl Pipeline {
    pub fn new(detector: LaneDetector, roi: PolygonSelector) -> Self {
        Self { detector, roi }
    }

    pub fn roi(&self) -> &PolygonSelector {
        &self.roi
    }

    /// Process every frame of `source`. The operator is asked for an ROI on
    /// the first non-empty frame unless one is already confirmed.
    pub fn run(
        &mut self,
        source: FrameSource,
        sink: &mut FrameSink,
        operator: &mut dyn OperatorInput,
    ) -> Result<MetricsSummary> {
        let mut metrics = RunMetrics::new();

        for (index, item) in source.enumerate() {
            let index = index as u64;
            let Some(frame) = item? else {
                debug!("Skipping empty frame {}", index);
                metrics.record_skipped();
                continue;
            };

            if !self.roi.is_confirmed() {
                info!("Select the region of interest on frame {}", index);
                self.roi
                    .select(&frame, operator)
                    .context("Region of interest selection failed")?;
            }

            let detection = self
                .detector
                .detect(&frame, &self.roi)
                .with_context(|| format!("Lane detection failed on frame {}", index))?;
            metrics.record_frame(detection.segments.len(), detection.lanes.len());

            sink.emit(index, &detection.frame)?;

            if metrics.frames_processed % 100 == 0 {
                info!("Processed {} frame(s)", metrics.frames_processed);
            }
        }

        Ok(metrics.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::{OperatorEvent, RoiState, ScriptedInput};
    use crate::types::Config;
    use image::{Rgb, RgbImage};

    fn pipeline(roi: PolygonSelector) -> Pipeline {
        let detector = LaneDetector::from_config(DetectorKind::A, &Config::default()).unwrap();
        Pipeline::new(detector, roi)
    }

    fn source(frames: Vec<Option<RgbImage>>) -> FrameSource {
        Box::new(frames.into_iter().map(Ok))
    }

    #[test]
    fn test_blank_frames_pass_through_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let first = RgbImage::from_pixel(64, 48, Rgb([40, 80, 120]));
        let second = RgbImage::from_pixel(64, 48, Rgb([200, 10, 10]));

        let mut operator = ScriptedInput::new([
            OperatorEvent::Click { x: 0, y: 47 },
            OperatorEvent::Click { x: 32, y: 10 },
            OperatorEvent::Click { x: 63, y: 47 },
            OperatorEvent::Finish,
            OperatorEvent::Key('y'),
        ]);
        let mut sink = FrameSink::new(Some(dir.path().to_path_buf()), false);
        let mut pipeline = pipeline(PolygonSelector::new());

        let summary = pipeline
            .run(
                source(vec![None, Some(first.clone()), None, Some(second.clone())]),
                &mut sink,
                &mut operator,
            )
            .unwrap();

        assert_eq!(pipeline.roi().state(), RoiState::Confirmed);
        assert_eq!(operator.remaining(), 0);
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(summary.frames_skipped, 2);
        assert_eq!(summary.frames_without_segments, 2);
        assert_eq!(summary.lanes_found, 0);

        // Files are named by position in the source, empty frames included
        assert!(!dir.path().join("0.png").exists());
        assert!(!dir.path().join("2.png").exists());
        let saved1 = image::open(dir.path().join("1.png")).unwrap().to_rgb8();
        let saved3 = image::open(dir.path().join("3.png")).unwrap().to_rgb8();
        assert_eq!(saved1.as_raw(), first.as_raw());
        assert_eq!(saved3.as_raw(), second.as_raw());
    }

    #[test]
    fn test_output_index_counts_skipped_frames() {
        let dir = tempfile::tempdir().unwrap();
        let roi = PolygonSelector::with_polygon(vec![(0, 0), (7, 0), (7, 7)]).unwrap();
        let mut sink = FrameSink::new(Some(dir.path().to_path_buf()), false);

        pipeline(roi)
            .run(
                source(vec![None, Some(RgbImage::new(8, 8))]),
                &mut sink,
                &mut ScriptedInput::default(),
            )
            .unwrap();

        assert!(!dir.path().join("0.png").exists());
        assert!(dir.path().join("1.png").exists());
    }

    #[test]
    fn test_preset_roi_never_prompts() {
        let roi = PolygonSelector::with_polygon(vec![(0, 0), (10, 0), (10, 10)]).unwrap();
        let mut operator = ScriptedInput::default();
        let mut sink = FrameSink::new(None, false);

        let summary = pipeline(roi)
            .run(
                source(vec![Some(RgbImage::new(16, 16)), Some(RgbImage::new(16, 16))]),
                &mut sink,
                &mut operator,
            )
            .unwrap();
        assert_eq!(summary.frames_processed, 2);
    }

    #[test]
    fn test_operator_giving_up_aborts_run() {
        let mut operator = ScriptedInput::new([OperatorEvent::Click { x: 1, y: 1 }]);
        let mut sink = FrameSink::new(None, false);

        let result = pipeline(PolygonSelector::new()).run(
            source(vec![Some(RgbImage::new(16, 16))]),
            &mut sink,
            &mut operator,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_source_error_aborts_run() {
        let roi = PolygonSelector::with_polygon(vec![(0, 0), (10, 0), (10, 10)]).unwrap();
        let mut sink = FrameSink::new(None, false);
        let failing: FrameSource = Box::new(
            vec![
                Ok(Some(RgbImage::new(8, 8))),
                Err(anyhow::anyhow!("decoder failure")),
            ]
            .into_iter(),
        );

        let result = pipeline(roi).run(failing, &mut sink, &mut ScriptedInput::default());
        assert!(result.is_err());
    }
}
