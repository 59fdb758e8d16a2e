use tracing::{debug, info};

use crate::image_pipeline::acquisition::ChannelPair;
use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::interaction::operator::Operator;
use crate::image_pipeline::stack::{ImageStack, Rect};
use crate::image_pipeline::threshold::ThresholdRange;

/// Answers every question from values fixed up front.
///
/// Unset answers fall back to the defaults an operator would accept: the
/// automatic threshold, channels 3 and 7, the first series. There is no
/// default ROI.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    roi: Option<Rect>,
    channels: Option<ChannelPair>,
    threshold: Option<ThresholdRange>,
    series: Option<usize>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roi(mut self, roi: Rect) -> Self {
        self.roi = Some(roi);
        self
    }

    pub fn with_channels(mut self, channels: ChannelPair) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_threshold(mut self, threshold: ThresholdRange) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_series(mut self, series: usize) -> Self {
        self.series = Some(series);
        self
    }
}

impl Operator for ScriptedOperator {
    fn pick_roi(&self, _image: &ImageStack) -> Result<Rect> {
        let roi = self.roi.ok_or(FretError::MissingRoi)?;
        info!(%roi, "Using scripted background ROI");
        Ok(roi)
    }

    fn pick_channels(&self, channels: usize, profile: &[Option<f64>]) -> Result<ChannelPair> {
        for (i, mean) in profile.iter().enumerate() {
            match mean {
                Some(mean) => info!(channel = i + 1, mean = format!("{mean:.2}"), "Spectral profile"),
                None => info!(channel = i + 1, "Spectral profile: no valid samples"),
            }
        }
        let pair = self.channels.unwrap_or_default();
        debug!(donor = pair.donor, acceptor = pair.acceptor, channels, "Channel pair");
        Ok(pair)
    }

    fn pick_threshold(&self, _image: &ImageStack, seed: ThresholdRange) -> Result<ThresholdRange> {
        let range = self.threshold.unwrap_or(seed);
        info!(
            min = range.min(),
            max = range.max(),
            automatic = self.threshold.is_none(),
            "Threshold"
        );
        Ok(range)
    }

    fn pick_series(&self, count: usize) -> Result<usize> {
        let series = self.series.unwrap_or(0);
        debug!(series, count, "Series");
        Ok(series)
    }
}
