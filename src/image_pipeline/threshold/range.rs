use std::str::FromStr;

use crate::image_pipeline::common::error::{FretError, Result};

/// Closed intensity interval `[min, max]` used for masking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRange {
    min: f64,
    max: f64,
}

impl ThresholdRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(FretError::InvalidThreshold(min, max));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f32) -> bool {
        let v = value as f64;
        v >= self.min && v <= self.max
    }

    /// Narrows an operator-chosen range to `[max(lo, floor), min(hi, ceiling)]`.
    pub fn clamp_to(&self, floor: f64, ceiling: f64) -> Result<Self> {
        Self::new(self.min.max(floor), self.max.min(ceiling))
    }
}

/// Parses `lo,hi`.
impl FromStr for ThresholdRange {
    type Err = FretError;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |p: &str| p.trim().parse::<f64>().ok();
        match s.split_once(',') {
            Some((lo, hi)) => match (parse(lo), parse(hi)) {
                (Some(lo), Some(hi)) => Self::new(lo, hi),
                _ => Err(FretError::InvalidThreshold(f64::NAN, f64::NAN)),
            },
            None => Err(FretError::InvalidThreshold(f64::NAN, f64::NAN)),
        }
    }
}
