//! End-to-end FRET analysis: load, preprocess, threshold, compute and save.

mod config;
mod fret_pipeline;
mod layout;

#[cfg(test)]
mod tests;

pub use config::{FretConfig, FretConfigBuilder, InputSource};
pub use fret_pipeline::{FretPipeline, FretReport};
pub use layout::OutputLayout;
