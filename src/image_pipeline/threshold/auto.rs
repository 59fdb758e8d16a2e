//! Automatic threshold seed ("Default dark").
//!
//! The iterative intermediate-means method on a 256-bin histogram of the valid
//! samples, with the first and last bins ignored. Foreground is bright.

use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::stack::ImageStack;
use crate::image_pipeline::threshold::range::ThresholdRange;

const BINS: usize = 256;

/// Seed range `[level, max]` for a dark-background image.
pub fn default_dark(image: &ImageStack) -> Result<ThresholdRange> {
    let stats = image.statistics("threshold image")?;
    let (min, max) = (stats.min as f64, stats.max as f64);
    if max <= min {
        return ThresholdRange::new(min, max);
    }

    let bin_width = (max - min) / BINS as f64;
    let mut histogram = [0u64; BINS];
    for v in image.samples().iter().flatten() {
        let bin = (((*v as f64) - min) / bin_width) as usize;
        histogram[bin.min(BINS - 1)] += 1;
    }

    let level = iso_data_level(&histogram);
    let lower = min + (level + 1) as f64 * bin_width;
    ThresholdRange::new(lower.min(max), max)
        .map_err(|_| FretError::InvalidThreshold(lower, max))
}

fn iso_data_level(histogram: &[u64; BINS]) -> usize {
    let mut data = *histogram;
    let last = BINS - 1;
    data[0] = 0;
    data[last] = 0;

    let mut lo = 0;
    while data[lo] == 0 && lo < last {
        lo += 1;
    }
    let mut hi = last;
    while data[hi] == 0 && hi > 0 {
        hi -= 1;
    }
    if lo >= hi {
        return BINS / 2;
    }

    let mut moving = lo;
    let mut result;
    loop {
        let (mut s1, mut n1, mut s2, mut n2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for (i, &count) in data.iter().enumerate().take(moving + 1).skip(lo) {
            s1 += i as f64 * count as f64;
            n1 += count as f64;
        }
        for (i, &count) in data.iter().enumerate().take(hi + 1).skip(moving + 1) {
            s2 += i as f64 * count as f64;
            n2 += count as f64;
        }
        let below = if n1 > 0.0 { s1 / n1 } else { lo as f64 };
        let above = if n2 > 0.0 { s2 / n2 } else { hi as f64 };
        result = (below + above) / 2.0;
        moving += 1;
        if !((moving + 1) as f64 <= result && moving < hi - 1) {
            break;
        }
    }
    result.round() as usize
}
