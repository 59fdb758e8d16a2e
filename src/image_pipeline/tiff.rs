//! TIFF writing module
//!
//! Float stacks and RGB previews, optionally tagged with ImageJ metadata.

mod standard_tiff_writer;
mod writer;
pub mod imagej;
pub mod types;

pub use imagej::ImageJDescription;
pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{OutputConfig, TiffCompression};
pub use writer::TiffWriter;
