//! Display rendering module
//!
//! Lookup tables, RGB previews and the calibration bar. Nothing here alters the
//! float samples used for quantitative output.

pub mod calibration_bar;
pub mod font;
pub mod lut;

pub use calibration_bar::CalibrationBar;
pub use lut::{Lut, LutName, RgbImage};
