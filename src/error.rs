// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaneError {
    #[error("Unknown color category '{name}'")]
    UnknownColor { name: String },

    #[error("A polygon needs at least 3 distinct points, got {points}")]
    InsufficientPolygon { points: usize },

    #[error("ROI selector is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Cannot read input '{path}': {reason}")]
    UnreadableInput { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operator input ended before the ROI was confirmed")]
    InputExhausted,
}
