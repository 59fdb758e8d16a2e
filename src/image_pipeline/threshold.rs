//! Thresholding module
//!
//! Range masking with despeckle, plus the automatic threshold seed offered to
//! the operator.

pub mod auto;
pub mod mask;
pub mod range;

pub use auto::default_dark;
pub use mask::{apply_threshold, despeckle};
pub use range::ThresholdRange;
