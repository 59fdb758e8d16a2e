use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::stack::types::ImageStack;

/// Rectangular region of interest in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    /// The ROI must be non-empty and lie entirely inside `image`.
    pub fn validate_for(&self, image: &ImageStack) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FretError::InvalidRoi(format!("{self} is empty")));
        }
        let inside = match (self.x.checked_add(self.width), self.y.checked_add(self.height)) {
            (Some(right), Some(bottom)) => right <= image.width() && bottom <= image.height(),
            _ => false,
        };
        if !inside {
            return Err(FretError::InvalidRoi(format!(
                "{self} exceeds image bounds {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(())
    }

    /// Mean of the valid samples inside the ROI on one plane, `None` when the
    /// ROI holds no valid sample.
    pub fn plane_mean(&self, image: &ImageStack, plane: usize) -> Option<f64> {
        let data = image.plane(plane);
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for row in self.y..self.y + self.height {
            let start = row * image.width() + self.x;
            for v in data[start..start + self.width].iter().flatten() {
                sum += *v as f64;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f64)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for Rect {
    type Err = FretError;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FretError::InvalidRoi(format!("{s}: {e}")))?;
        match parts.as_slice() {
            [x, y, w, h] => Ok(Rect::new(*x, *y, *w, *h)),
            _ => Err(FretError::InvalidRoi(format!(
                "{s}: expected x,y,width,height"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ImageStack {
        ImageStack::from_values(4, 2, 1, (0..8).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn parses_comma_separated_bounds() {
        assert_eq!("1, 2,3,4".parse::<Rect>().unwrap(), Rect::new(1, 2, 3, 4));
        assert!("1,2,3".parse::<Rect>().is_err());
        assert!("a,2,3,4".parse::<Rect>().is_err());
    }

    #[test]
    fn rejects_out_of_bounds_roi() {
        let image = ramp();
        assert!(Rect::new(0, 0, 4, 2).validate_for(&image).is_ok());
        assert!(Rect::new(1, 0, 4, 2).validate_for(&image).is_err());
        assert!(Rect::new(0, 0, 0, 1).validate_for(&image).is_err());
    }

    #[test]
    fn huge_origin_is_out_of_bounds() {
        let image = ramp();
        let roi: Rect = format!("{},0,2,1", usize::MAX).parse().unwrap();
        assert!(matches!(roi.validate_for(&image), Err(FretError::InvalidRoi(_))));
        assert!(Rect::new(0, usize::MAX, 1, 1).validate_for(&image).is_err());
    }

    #[test]
    fn plane_mean_covers_roi_only() {
        let image = ramp();
        // second row, last two columns: 6 and 7
        let roi = Rect::new(2, 1, 2, 1);
        assert_eq!(roi.plane_mean(&image, 0), Some(6.5));
    }

    #[test]
    fn plane_mean_of_masked_roi_is_none() {
        let image = ramp().map(|_| None);
        assert_eq!(Rect::new(0, 0, 2, 2).plane_mean(&image, 0), None);
    }
}
