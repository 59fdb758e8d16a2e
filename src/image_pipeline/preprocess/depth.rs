use tracing::debug;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::stack::ImageStack;
use crate::image_pipeline::threshold::{ThresholdRange, apply_threshold};

/// Largest value a 12-bit camera can report, plus one.
const TWELVE_BIT_LIMIT: f32 = 4096.0;

/// Effective sensor depth of an acquisition.
///
/// 12-bit cameras are commonly stored in 16-bit containers; when the first raw
/// plane never reaches 4096 the depth is taken to be 12.
pub fn detect_bit_depth(source_depth: u32, first_plane: &ImageStack) -> u32 {
    let max = first_plane.plane_statistics(0).map(|s| s.max);
    let depth = match max {
        Some(max) if source_depth > 8 && max < TWELVE_BIT_LIMIT => 12,
        _ => source_depth,
    };
    debug!(source_depth, ?max, depth, "Detected sensor depth");
    depth
}

/// `2^depth - 1`.
pub fn max_value(depth: u32) -> f64 {
    2f64.powi(depth as i32) - 1.0
}

/// Drops saturated samples: keeps `[0, max_value - 1]`.
pub fn saturation_range(depth: u32) -> Result<ThresholdRange> {
    ThresholdRange::new(0.0, max_value(depth) - 1.0)
}

/// Masks saturated and negative samples of a freshly loaded stack.
pub fn mask_saturated(image: &ImageStack, depth: u32) -> Result<ImageStack> {
    Ok(apply_threshold(image, saturation_range(depth)?))
}
