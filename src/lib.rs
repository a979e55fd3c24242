// src/lib.rs

pub mod color_gate;
pub mod config;
pub mod error;
pub mod frame_source;
pub mod hough;
pub mod lane_estimator;
pub mod output;
pub mod pipeline;
pub mod preprocessing;
pub mod render;
pub mod roi;
pub mod types;

pub use error::LaneError;
pub use types::Config;
