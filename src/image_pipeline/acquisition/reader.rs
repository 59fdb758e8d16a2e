use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::stack::ImageStack;

/// Shape of a multi-dimensional acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionInfo {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
    pub series: usize,
    pub bit_depth: u32,
}

/// Which planes to pull out of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelection {
    /// 1-based channel index.
    pub channel: usize,
    /// 0-based series index.
    pub series: usize,
    /// 0-based timepoint; `None` keeps every timepoint.
    pub frame: Option<usize>,
}

pub trait AcquisitionReader {
    fn probe(&self, path: &Path) -> Result<AcquisitionInfo>;

    /// All Z×T planes of one channel, slice index fastest.
    fn read_channel(&self, path: &Path, selection: ChannelSelection) -> Result<ImageStack>;

    /// Every plane of a single-channel file.
    fn read_stack(&self, path: &Path) -> Result<ImageStack>;
}
