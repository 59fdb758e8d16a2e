//! FRET image analysis pipeline module
//!
//! Masked float stacks, the Donor/Acceptor preprocessing chain, the FRET metric
//! engine and TIFF input/output, orchestrated by `workflow`.

pub mod acquisition;
pub mod common;
pub mod interaction;
pub mod metric;
pub mod preprocess;
pub mod render;
pub mod stack;
pub mod threshold;
pub mod tiff;
pub mod workflow;

pub use common::{FretError, PipelineTimings, Result};

pub use acquisition::{AcquisitionInfo, AcquisitionReader, ChannelPair, TiffHyperstackReader};

pub use interaction::{Operator, ScriptedOperator};

pub use metric::FretMetric;

pub use preprocess::{BackgroundMode, BleachMethod};

pub use render::{CalibrationBar, LutName};

pub use stack::{ImageStack, Rect};

pub use threshold::ThresholdRange;

pub use tiff::{OutputConfig, StandardTiffWriter, TiffCompression, TiffWriter};

pub use workflow::{FretConfig, FretConfigBuilder, FretPipeline, FretReport, InputSource};
