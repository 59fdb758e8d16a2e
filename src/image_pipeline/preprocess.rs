//! Corrections applied to the Donor and Acceptor stacks before thresholding:
//! saturation masking, photobleaching correction and background subtraction.

pub mod background;
pub mod bleach;
pub mod depth;
pub mod fit;

pub use background::{BackgroundMode, BackgroundSubtractor, RoiMeanSubtractor, RollingBall};
pub use bleach::{BleachCorrector, BleachMethod, corrector_for};
pub use depth::{detect_bit_depth, mask_saturated, max_value};
