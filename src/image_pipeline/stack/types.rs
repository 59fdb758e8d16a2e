//! Masked floating-point image stacks.
//!
//! Every sample is an explicit `Option<f32>`: `None` marks a pixel that has been
//! invalidated by masking. Invalid samples propagate through arithmetic and are
//! excluded from statistics.

use crate::image_pipeline::common::error::{FretError, Result};

/// A single sample. `None` is the invalid marker.
pub type Sample = Option<f32>;

/// Physical calibration carried alongside the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub pixel_depth: f64,
    pub unit: String,
    /// Interval between two timepoints, in `time_unit`.
    pub frame_interval: Option<f64>,
    pub time_unit: String,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pixel_width: 1.0,
            pixel_height: 1.0,
            pixel_depth: 1.0,
            unit: "pixel".to_string(),
            frame_interval: None,
            time_unit: "sec".to_string(),
        }
    }
}

impl Calibration {
    /// Spelled-out micron units are shortened to `um`.
    pub fn normalized_unit(&self) -> &str {
        match self.unit.as_str() {
            "micron" | "microns" | "µm" => "um",
            other => other,
        }
    }
}

/// Display-only intensity window. Never applied to stored samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub min: f64,
    pub max: f64,
}

/// Min/max/mean over the valid samples of a stack or plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub count: usize,
}

impl Statistics {
    fn from_samples<'a>(samples: impl Iterator<Item = &'a Sample>) -> Option<Self> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for v in samples.flatten() {
            min = min.min(*v);
            max = max.max(*v);
            sum += *v as f64;
            count += 1;
        }
        (count > 0).then(|| Self {
            min,
            max,
            mean: sum / count as f64,
            count,
        })
    }
}

/// `width × height × planes` grid of masked samples, planes stored contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStack {
    width: usize,
    height: usize,
    planes: usize,
    data: Vec<Sample>,
    calibration: Calibration,
    display_range: Option<DisplayRange>,
    bit_depth: u32,
}

impl ImageStack {
    pub fn new(width: usize, height: usize, planes: usize, data: Vec<Sample>) -> Result<Self> {
        if width == 0 || height == 0 || planes == 0 {
            return Err(FretError::InvalidDimensions(width, height));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(planes))
            .ok_or(FretError::InvalidDimensions(width, height))?;
        if data.len() != expected {
            return Err(FretError::UnsupportedFormat(format!(
                "buffer holds {} samples, expected {}x{}x{} = {}",
                data.len(),
                width,
                height,
                planes,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            planes,
            data,
            calibration: Calibration::default(),
            display_range: None,
            bit_depth: 32,
        })
    }

    /// Builds a stack from plain floats. NaN samples become invalid.
    pub fn from_values(width: usize, height: usize, planes: usize, values: Vec<f32>) -> Result<Self> {
        let data = values
            .into_iter()
            .map(|v| if v.is_nan() { None } else { Some(v) })
            .collect();
        Self::new(width, height, planes, data)
    }

    pub fn filled(width: usize, height: usize, planes: usize, value: f32) -> Result<Self> {
        let len = width.saturating_mul(height).saturating_mul(planes);
        Self::new(width, height, planes, vec![Some(value); len])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn planes(&self) -> usize {
        self.planes
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.planes)
    }

    pub fn plane_len(&self) -> usize {
        self.width * self.height
    }

    pub fn samples(&self) -> &[Sample] {
        &self.data
    }

    pub fn plane(&self, index: usize) -> &[Sample] {
        let len = self.plane_len();
        &self.data[index * len..(index + 1) * len]
    }

    pub fn get(&self, x: usize, y: usize, plane: usize) -> Sample {
        self.data[plane * self.plane_len() + y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, plane: usize, value: Sample) {
        let idx = plane * self.plane_len() + y * self.width + x;
        self.data[idx] = value;
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn display_range(&self) -> Option<DisplayRange> {
        self.display_range
    }

    pub fn set_display_range(&mut self, min: f64, max: f64) {
        self.display_range = Some(DisplayRange { min, max });
    }

    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    pub fn with_bit_depth(mut self, bit_depth: u32) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn same_shape(&self, other: &ImageStack) -> bool {
        self.dims() == other.dims()
    }

    /// Copies metadata onto a freshly computed buffer of the same shape.
    pub fn derive(&self, data: Vec<Sample>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            width: self.width,
            height: self.height,
            planes: self.planes,
            data,
            calibration: self.calibration.clone(),
            display_range: None,
            bit_depth: 32,
        }
    }

    /// Applies `f` to every valid sample. Invalid samples stay invalid.
    pub fn map(&self, f: impl Fn(f32) -> Sample) -> Self {
        self.derive(self.data.iter().map(|s| s.and_then(&f)).collect())
    }

    /// Combines two stacks of identical shape sample by sample. The result is
    /// invalid wherever either input is.
    pub fn zip_with(&self, other: &ImageStack, f: impl Fn(f32, f32) -> Sample) -> Result<Self> {
        ensure_same_shape(self, other)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => f(*a, *b),
                _ => None,
            })
            .collect();
        Ok(self.derive(data))
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|s| s.is_some()).count()
    }

    /// Statistics over every valid sample. `label` names the image in the
    /// error raised when nothing is left to measure.
    pub fn statistics(&self, label: &str) -> Result<Statistics> {
        Statistics::from_samples(self.data.iter())
            .ok_or_else(|| FretError::DegenerateStatistics(label.to_string()))
    }

    pub fn plane_statistics(&self, plane: usize) -> Option<Statistics> {
        Statistics::from_samples(self.plane(plane).iter())
    }

    /// Copy of a single plane as a one-plane stack.
    pub fn extract_plane(&self, plane: usize) -> Self {
        Self {
            width: self.width,
            height: self.height,
            planes: 1,
            data: self.plane(plane).to_vec(),
            calibration: self.calibration.clone(),
            display_range: self.display_range,
            bit_depth: self.bit_depth,
        }
    }
}

/// Donor and Acceptor must agree on width, height and plane count.
pub fn ensure_same_shape(donor: &ImageStack, acceptor: &ImageStack) -> Result<()> {
    if donor.same_shape(acceptor) {
        Ok(())
    } else {
        Err(FretError::DimensionMismatch {
            donor: donor.dims(),
            acceptor: acceptor.dims(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_length() {
        let result = ImageStack::new(2, 2, 1, vec![Some(1.0); 3]);
        assert!(matches!(result, Err(FretError::UnsupportedFormat(_))));
    }

    #[test]
    fn rejects_empty_dimensions() {
        let result = ImageStack::new(0, 4, 1, Vec::new());
        assert!(matches!(result, Err(FretError::InvalidDimensions(0, 4))));
    }

    #[test]
    fn nan_values_load_as_invalid() {
        let stack = ImageStack::from_values(2, 1, 1, vec![f32::NAN, 3.0]).unwrap();
        assert_eq!(stack.samples(), &[None, Some(3.0)]);
        assert_eq!(stack.valid_count(), 1);
    }

    #[test]
    fn statistics_skip_invalid_samples() {
        let stack = ImageStack::new(3, 1, 1, vec![Some(2.0), None, Some(6.0)]).unwrap();
        let stats = stack.statistics("test").unwrap();
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.count, 2);
    }

    #[test]
    fn statistics_of_fully_masked_stack_is_an_error() {
        let stack = ImageStack::new(2, 1, 1, vec![None, None]).unwrap();
        assert!(matches!(
            stack.statistics("ratio"),
            Err(FretError::DegenerateStatistics(label)) if label == "ratio"
        ));
    }

    #[test]
    fn zip_with_propagates_invalid_samples() {
        let a = ImageStack::new(2, 1, 1, vec![Some(1.0), None]).unwrap();
        let b = ImageStack::new(2, 1, 1, vec![Some(2.0), Some(5.0)]).unwrap();
        let sum = a.zip_with(&b, |x, y| Some(x + y)).unwrap();
        assert_eq!(sum.samples(), &[Some(3.0), None]);
    }

    #[test]
    fn zip_with_rejects_shape_mismatch() {
        let a = ImageStack::filled(2, 2, 1, 1.0).unwrap();
        let b = ImageStack::filled(2, 2, 2, 1.0).unwrap();
        assert!(matches!(
            a.zip_with(&b, |x, _| Some(x)),
            Err(FretError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn extract_plane_copies_one_plane() {
        let stack = ImageStack::from_values(1, 1, 3, vec![1.0, 2.0, 3.0]).unwrap();
        let plane = stack.extract_plane(1);
        assert_eq!(plane.dims(), (1, 1, 1));
        assert_eq!(plane.samples(), &[Some(2.0)]);
    }

    #[test]
    fn micron_unit_is_shortened() {
        let cal = Calibration {
            unit: "micron".to_string(),
            ..Calibration::default()
        };
        assert_eq!(cal.normalized_unit(), "um");
    }
}
