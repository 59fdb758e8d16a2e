//! Photobleaching correction.
//!
//! Each corrector rescales the planes of a timelapse stack to compensate for a
//! monotonic intensity decay. Dimensions and invalid samples are preserved.

use std::fmt;

use clap::ValueEnum;
use tracing::{debug, instrument, warn};

use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::preprocess::fit::ExponentialDecay;
use crate::image_pipeline::stack::{ImageStack, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BleachMethod {
    SimpleRatio,
    ExponentialFit,
    HistogramMatching,
}

impl fmt::Display for BleachMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BleachMethod::SimpleRatio => "Simple Ratio",
            BleachMethod::ExponentialFit => "Exponential Fit",
            BleachMethod::HistogramMatching => "Histogram Matching",
        })
    }
}

pub trait BleachCorrector {
    fn correct(&self, image: &ImageStack) -> Result<ImageStack>;
}

/// Builds the corrector for `method`. Simple ratio takes its background level
/// from `roi` on the first plane of `image`.
pub fn corrector_for(
    method: BleachMethod,
    image: &ImageStack,
    roi: Option<Rect>,
) -> Result<Box<dyn BleachCorrector>> {
    Ok(match method {
        BleachMethod::SimpleRatio => {
            let roi = roi.ok_or(FretError::MissingRoi)?;
            Box::new(SimpleRatio::from_roi(image, roi)?)
        }
        BleachMethod::ExponentialFit => Box::new(ExponentialFit),
        BleachMethod::HistogramMatching => Box::new(HistogramMatching),
    })
}

fn plane_means(image: &ImageStack) -> Vec<Option<f64>> {
    (0..image.planes())
        .map(|p| image.plane_statistics(p).map(|s| s.mean))
        .collect()
}

fn scale_planes(image: &ImageStack, factor: impl Fn(usize, f32) -> f32) -> ImageStack {
    let mut out = Vec::with_capacity(image.samples().len());
    for p in 0..image.planes() {
        out.extend(image.plane(p).iter().map(|s| s.map(|v| factor(p, v))));
    }
    image.derive(out)
}

/// `v' = (v - bg) · (mean₀ - bg) / (meanₜ - bg) + bg`
pub struct SimpleRatio {
    background: f64,
}

impl SimpleRatio {
    pub fn new(background: f64) -> Self {
        Self { background }
    }

    pub fn from_roi(image: &ImageStack, roi: Rect) -> Result<Self> {
        roi.validate_for(image)?;
        let background = roi.plane_mean(image, 0).ok_or_else(|| {
            FretError::DegenerateStatistics("bleach-correction background ROI".to_string())
        })?;
        Ok(Self::new(background))
    }
}

impl BleachCorrector for SimpleRatio {
    #[instrument(skip_all, fields(background = self.background))]
    fn correct(&self, image: &ImageStack) -> Result<ImageStack> {
        let means = plane_means(image);
        let reference = means[0]
            .ok_or_else(|| FretError::BleachCorrection("first plane is fully masked".to_string()))?;
        let bg = self.background;
        let ratios: Vec<f64> = means
            .iter()
            .enumerate()
            .map(|(p, mean)| match mean {
                Some(m) if (m - bg).abs() > f64::EPSILON => (reference - bg) / (m - bg),
                _ => {
                    warn!(plane = p, "Plane left uncorrected");
                    1.0
                }
            })
            .collect();
        debug!(?ratios, "Simple-ratio factors");
        Ok(scale_planes(image, |p, v| {
            ((v as f64 - bg) * ratios[p] + bg) as f32
        }))
    }
}

/// Multiplies each plane by `f(0) / f(t)` for the decay fitted to the plane means.
pub struct ExponentialFit;

impl BleachCorrector for ExponentialFit {
    #[instrument(skip_all)]
    fn correct(&self, image: &ImageStack) -> Result<ImageStack> {
        let points: Vec<(f64, f64)> = plane_means(image)
            .iter()
            .enumerate()
            .filter_map(|(t, m)| m.map(|m| (t as f64, m)))
            .collect();
        let decay = ExponentialDecay::fit(&points).ok_or_else(|| {
            FretError::BleachCorrection(format!(
                "exponential fit needs at least 3 measurable planes, found {}",
                points.len()
            ))
        })?;
        debug!(a = decay.a, b = decay.b, c = decay.c, "Fitted y = a*exp(-bx) + c");

        let start = decay.eval(0.0);
        let factors: Vec<f64> = (0..image.planes())
            .map(|t| {
                let y = decay.eval(t as f64);
                if y > 0.0 && start > 0.0 { start / y } else { 1.0 }
            })
            .collect();
        Ok(scale_planes(image, |p, v| (v as f64 * factors[p]) as f32))
    }
}

/// Maps each plane's valid samples by rank onto the distribution of plane 0.
pub struct HistogramMatching;

impl HistogramMatching {
    fn sorted_valid(plane: &[Option<f32>]) -> Vec<f32> {
        let mut values: Vec<f32> = plane.iter().flatten().copied().collect();
        values.sort_by(f32::total_cmp);
        values
    }
}

impl BleachCorrector for HistogramMatching {
    #[instrument(skip_all)]
    fn correct(&self, image: &ImageStack) -> Result<ImageStack> {
        let reference = Self::sorted_valid(image.plane(0));
        if reference.is_empty() {
            return Err(FretError::BleachCorrection(
                "reference plane is fully masked".to_string(),
            ));
        }
        let quantile = |q: f64| reference[(q * (reference.len() - 1) as f64).round() as usize];

        let mut out = image.plane(0).to_vec();
        for p in 1..image.planes() {
            let plane = image.plane(p);
            let mut ranked: Vec<(f32, usize)> = plane
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.map(|v| (v, i)))
                .collect();
            ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut matched = vec![None; plane.len()];
            let n = ranked.len();
            let mut start = 0;
            while start < n {
                let mut end = start;
                while end + 1 < n && ranked[end + 1].0 == ranked[start].0 {
                    end += 1;
                }
                // ties share the quantile of their mid rank
                let q = if n > 1 {
                    (start + end) as f64 / 2.0 / (n - 1) as f64
                } else {
                    0.5
                };
                let value = quantile(q);
                for &(_, i) in &ranked[start..=end] {
                    matched[i] = Some(value);
                }
                start = end + 1;
            }
            out.extend(matched);
        }
        Ok(image.derive(out))
    }
}
