use std::path::Path;

use tracing::debug;

use crate::image_pipeline::acquisition::reader::{AcquisitionInfo, AcquisitionReader, ChannelSelection};
use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::stack::{ImageStack, Rect};

/// Channel indices used when the operator is not asked.
pub const DEFAULT_DONOR_CHANNEL: usize = 3;
pub const DEFAULT_ACCEPTOR_CHANNEL: usize = 7;

/// 1-based Donor/Acceptor channel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPair {
    pub donor: usize,
    pub acceptor: usize,
}

impl Default for ChannelPair {
    fn default() -> Self {
        Self {
            donor: DEFAULT_DONOR_CHANNEL,
            acceptor: DEFAULT_ACCEPTOR_CHANNEL,
        }
    }
}

impl ChannelPair {
    pub fn validate(&self, channels: usize) -> Result<()> {
        for (name, index) in [("donor", self.donor), ("acceptor", self.acceptor)] {
            if index == 0 || index > channels {
                return Err(FretError::InvalidChannel(format!(
                    "{name} channel {index} outside 1..={channels}"
                )));
            }
        }
        if self.donor == self.acceptor {
            return Err(FretError::InvalidChannel(format!(
                "donor and acceptor both use channel {}",
                self.donor
            )));
        }
        Ok(())
    }
}

/// Per-pixel maximum over all planes. A pixel with no valid sample stays invalid.
pub fn max_project(stack: &ImageStack) -> ImageStack {
    let mut out = stack.plane(0).to_vec();
    for p in 1..stack.planes() {
        for (acc, sample) in out.iter_mut().zip(stack.plane(p)) {
            *acc = match (*acc, *sample) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
    }
    stack.extract_plane(0).derive(out)
}

/// One Z-projected plane per channel, taken at the middle timepoint.
pub fn spectral_stack<R: AcquisitionReader + ?Sized>(
    reader: &R,
    path: &Path,
    info: &AcquisitionInfo,
    series: usize,
) -> Result<ImageStack> {
    let frame = info.frames / 2;
    let mut data = Vec::with_capacity(info.width * info.height * info.channels);
    let mut calibration = None;
    for channel in 1..=info.channels {
        let planes = reader.read_channel(
            path,
            ChannelSelection {
                channel,
                series,
                frame: Some(frame),
            },
        )?;
        let projected = if planes.planes() > 1 { max_project(&planes) } else { planes };
        calibration.get_or_insert_with(|| projected.calibration().clone());
        data.extend_from_slice(projected.samples());
    }
    debug!(channels = info.channels, frame, "Built spectral stack");
    let stack = ImageStack::new(info.width, info.height, info.channels, data)?;
    Ok(match calibration {
        Some(cal) => stack.with_calibration(cal).with_bit_depth(info.bit_depth),
        None => stack.with_bit_depth(info.bit_depth),
    })
}

/// Mean intensity per channel, over `roi` or the whole plane.
pub fn spectral_profile(spectral: &ImageStack, roi: Option<Rect>) -> Vec<Option<f64>> {
    (0..spectral.planes())
        .map(|p| match roi {
            Some(roi) => roi.plane_mean(spectral, p),
            None => spectral.plane_statistics(p).map(|s| s.mean),
        })
        .collect()
}
