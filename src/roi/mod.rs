// src/roi/mod.rs

pub mod input;
pub mod polygon;
pub mod selector;

pub use input::{ConsoleInput, OperatorEvent, OperatorInput, ScriptedInput, SelectionStage};
pub use polygon::Polygon;
pub use selector::{FinishOutcome, PolygonSelector, RoiState};
