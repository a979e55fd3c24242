// src/roi/input.rs
//
// Sources of operator actions for the ROI selector. The selector only sees
// `OperatorEvent`s, so a terminal session, a GUI binding or a scripted test
// can all drive it.

use crate::error::LaneError;
use anyhow::{Context, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStage {
    /// Operator is placing polygon vertices
    Collecting,
    /// Operator is accepting or rejecting the masked preview
    Confirming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorEvent {
    /// Pointer action at a pixel position
    Click { x: i32, y: i32 },
    /// The designated finish / accept action
    Finish,
    /// Any other key
    Key(char),
}

pub trait OperatorInput {
    /// Block until the operator acts. `preview` is what the operator should
    /// be looking at for this stage.
    fn next_event(&mut self, stage: SelectionStage, preview: &RgbImage) -> Result<OperatorEvent>;
}

// ============================================================================
// SCRIPTED
// ============================================================================

/// Replays a fixed list of events; running dry is an error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: VecDeque<OperatorEvent>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = OperatorEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl OperatorInput for ScriptedInput {
    fn next_event(&mut self, _stage: SelectionStage, _preview: &RgbImage) -> Result<OperatorEvent> {
        self.events
            .pop_front()
            .ok_or_else(|| LaneError::InputExhausted.into())
    }
}

// ============================================================================
// CONSOLE
// ============================================================================

/// Terminal-driven selection: each preview is written to `preview_path`
/// and the operator types `x y` (or `x,y`) per vertex, `y` to finish or
/// accept, anything else to reject the preview.
pub struct ConsoleInput<R, W> {
    reader: R,
    writer: W,
    preview_path: PathBuf,
}

impl<R: BufRead, W: Write> ConsoleInput<R, W> {
    pub fn new(reader: R, writer: W, preview_path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            writer,
            preview_path: preview_path.into(),
        }
    }

    fn prompt(&mut self, stage: SelectionStage) -> Result<()> {
        let text = match stage {
            SelectionStage::Collecting => {
                "Enter polygon vertices enclosing the lanes as `x y`, press y when finished"
            }
            SelectionStage::Confirming => {
                "Does the selected region look good? y to continue, anything else to re-select"
            }
        };
        writeln!(self.writer, "{} (preview: {})", text, self.preview_path.display())?;
        write!(self.writer, "> ")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> OperatorInput for ConsoleInput<R, W> {
    fn next_event(&mut self, stage: SelectionStage, preview: &RgbImage) -> Result<OperatorEvent> {
        preview
            .save(&self.preview_path)
            .with_context(|| format!("Failed to write preview {}", self.preview_path.display()))?;
        self.prompt(stage)?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(LaneError::InputExhausted.into());
        }

        let event = parse_event(line.trim());
        if let OperatorEvent::Click { x, y } = event {
            writeln!(self.writer, "selected ({}, {})", x, y)?;
        }
        Ok(event)
    }
}

/// `y`/`Y` → Finish, `x y` or `x,y` → Click, otherwise the first char as a key.
pub fn parse_event(line: &str) -> OperatorEvent {
    if line.eq_ignore_ascii_case("y") {
        return OperatorEvent::Finish;
    }

    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    if let (Some(xs), Some(ys), None) = (parts.next(), parts.next(), parts.next()) {
        if let (Ok(x), Ok(y)) = (xs.parse::<f64>(), ys.parse::<f64>()) {
            return OperatorEvent::Click {
                x: x.round_ties_even() as i32,
                y: y.round_ties_even() as i32,
            };
        }
    }

    OperatorEvent::Key(line.chars().next().unwrap_or(' '))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::{PolygonSelector, RoiState};
    use image::Rgb;
    use std::io::Cursor;

    #[test]
    fn test_parse_event() {
        assert_eq!(parse_event("y"), OperatorEvent::Finish);
        assert_eq!(parse_event("Y"), OperatorEvent::Finish);
        assert_eq!(parse_event("12 34"), OperatorEvent::Click { x: 12, y: 34 });
        assert_eq!(parse_event("12,34"), OperatorEvent::Click { x: 12, y: 34 });
        assert_eq!(parse_event("12.6, 3.2"), OperatorEvent::Click { x: 13, y: 3 });
        assert_eq!(parse_event("2.5 3.5"), OperatorEvent::Click { x: 2, y: 4 });
        assert_eq!(parse_event("-0.5,0.5"), OperatorEvent::Click { x: 0, y: 0 });
        assert_eq!(parse_event("n"), OperatorEvent::Key('n'));
        assert_eq!(parse_event("1 2 3"), OperatorEvent::Key('1'));
        assert_eq!(parse_event(""), OperatorEvent::Key(' '));
    }

    #[test]
    fn test_scripted_input_runs_dry() {
        let mut input = ScriptedInput::new(vec![OperatorEvent::Finish]);
        let preview = RgbImage::new(1, 1);
        assert_eq!(
            input.next_event(SelectionStage::Collecting, &preview).unwrap(),
            OperatorEvent::Finish
        );
        assert!(input.next_event(SelectionStage::Collecting, &preview).is_err());
    }

    #[test]
    fn test_console_session_confirms_polygon() {
        let dir = tempfile::tempdir().unwrap();
        let preview_path = dir.path().join("roi_preview.png");
        let script = "10 90\n50,20\n90 90\ny\ny\n";
        let mut output = Vec::new();

        let mut selector = PolygonSelector::new();
        {
            let mut input = ConsoleInput::new(Cursor::new(script), &mut output, preview_path.clone());
            let frame = RgbImage::from_pixel(100, 100, Rgb([60, 60, 60]));
            selector.select(&frame, &mut input).unwrap();
        }

        assert_eq!(selector.state(), RoiState::Confirmed);
        assert!(preview_path.exists());
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("selected (50, 20)"));
    }

    #[test]
    fn test_console_eof_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = ConsoleInput::new(Cursor::new(""), Vec::new(), dir.path().join("p.png"));
        let preview = RgbImage::new(2, 2);
        assert!(input.next_event(SelectionStage::Collecting, &preview).is_err());
    }
}
