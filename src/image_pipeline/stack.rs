//! Image stack module
//!
//! Masked float stacks, their statistics and regions of interest.

pub mod roi;
pub mod types;

pub use roi::Rect;
pub use types::{Calibration, DisplayRange, ImageStack, Sample, Statistics, ensure_same_shape};
