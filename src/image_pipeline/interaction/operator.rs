use crate::image_pipeline::acquisition::ChannelPair;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::stack::{ImageStack, Rect};
use crate::image_pipeline::threshold::ThresholdRange;

/// Decisions the workflow delegates to a person (or a script standing in for one).
///
/// Every call blocks until answered. Returning `FretError::Cancelled` aborts the run.
pub trait Operator {
    /// Background region on `image`, reused for both channels.
    fn pick_roi(&self, image: &ImageStack) -> Result<Rect>;

    /// Donor/Acceptor channels, given the mean intensity of every channel.
    fn pick_channels(&self, channels: usize, profile: &[Option<f64>]) -> Result<ChannelPair>;

    /// Confirms or replaces the automatic threshold `seed` for `image`.
    fn pick_threshold(&self, image: &ImageStack, seed: ThresholdRange) -> Result<ThresholdRange>;

    /// 0-based series out of `count`.
    fn pick_series(&self, count: usize) -> Result<usize>;
}
