//! Acquisition reading module
//!
//! Probing and channel extraction for multi-channel timelapse acquisitions.

mod reader;
mod tiff_reader;
pub mod channels;

pub use channels::{ChannelPair, max_project, spectral_profile, spectral_stack};
pub use reader::{AcquisitionInfo, AcquisitionReader, ChannelSelection};
pub use tiff_reader::TiffHyperstackReader;
