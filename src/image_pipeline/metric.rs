//! FRET metric engine.
//!
//! Pixel-wise index and ratio metrics over a co-registered Donor/Acceptor pair.
//! Masking happens only at the documented steps; stored values are never
//! clipped or rescaled.

use std::fmt;

use clap::ValueEnum;
use tracing::{debug, instrument};

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::stack::{ImageStack, Statistics, ensure_same_shape};

/// Smallest denominator kept before dividing.
const MIN_DENOMINATOR: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FretMetric {
    /// 100 x A / (A + D)
    #[value(name = "index")]
    Index,
    /// A / D
    #[value(name = "ratio-a-d")]
    RatioAcceptorDonor,
    /// D / A
    #[value(name = "ratio-d-a")]
    RatioDonorAcceptor,
}

impl FretMetric {
    pub fn label(&self) -> &'static str {
        match self {
            FretMetric::Index => "FRET index = 100 x A/(A+D)",
            FretMetric::RatioAcceptorDonor => "FRET ratio = A/D",
            FretMetric::RatioDonorAcceptor => "FRET ratio = D/A",
        }
    }

    /// Tag used in output file names.
    pub fn file_tag(&self) -> &'static str {
        match self {
            FretMetric::Index => "index",
            FretMetric::RatioAcceptorDonor => "ratioA_D",
            FretMetric::RatioDonorAcceptor => "ratioD_A",
        }
    }

    #[instrument(skip_all, fields(metric = self.file_tag()))]
    pub fn compute(&self, donor: &ImageStack, acceptor: &ImageStack) -> Result<ImageStack> {
        ensure_same_shape(donor, acceptor)?;
        let out = match self {
            FretMetric::Index => fret_index(donor, acceptor)?,
            FretMetric::RatioAcceptorDonor => fret_ratio(acceptor, donor)?,
            FretMetric::RatioDonorAcceptor => fret_ratio(donor, acceptor)?,
        };
        debug!(valid = out.valid_count(), "FRET metric computed");
        Ok(out)
    }

    /// Display window for the computed image. The index is widened to whole
    /// percentages.
    pub fn display_range(&self, stats: &Statistics) -> (f64, f64) {
        let (min, max) = (stats.min as f64, stats.max as f64);
        match self {
            FretMetric::Index => (min.floor(), max.ceil()),
            _ => (min, max),
        }
    }
}

impl fmt::Display for FretMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn fret_index(donor: &ImageStack, acceptor: &ImageStack) -> Result<ImageStack> {
    let sum = acceptor
        .zip_with(donor, |a, d| Some(a + d))?
        .map(keep_denominator);
    let fraction = acceptor
        .zip_with(&sum, |a, s| Some(a / s))?
        .map(|r| (0.0..=1.0).contains(&r).then_some(r));
    Ok(fraction.map(|r| Some(r * 100.0)))
}

/// `numerator / denominator` with the denominator masked below 1 and negative
/// or non-finite quotients dropped.
fn fret_ratio(numerator: &ImageStack, denominator: &ImageStack) -> Result<ImageStack> {
    let denominator = denominator.map(keep_denominator);
    Ok(numerator
        .zip_with(&denominator, |n, d| Some(n / d))?
        .map(|r| (r.is_finite() && r >= 0.0).then_some(r)))
}

fn keep_denominator(v: f32) -> Option<f32> {
    (v >= MIN_DENOMINATOR).then_some(v)
}
