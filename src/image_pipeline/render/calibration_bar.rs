use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::render::font;
use crate::image_pipeline::stack::ImageStack;

pub const BAR_WIDTH: usize = 276;
pub const BAR_HEIGHT: usize = 50;
pub const GRADIENT_STEPS: usize = 256;
const GRADIENT_LEFT: usize = 11;
const GRADIENT_ROWS: usize = 30;
const LABEL_BASELINE: usize = 48;
const MAX_LABEL_LEFT: usize = 246;

/// Linear gradient image with its bounds printed underneath.
#[derive(Debug, Clone)]
pub struct CalibrationBar {
    pub image: ImageStack,
    pub min_label: String,
    pub max_label: String,
}

impl CalibrationBar {
    pub fn render(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(FretError::InvalidThreshold(min, max));
        }

        let mut image = ImageStack::filled(BAR_WIDTH, BAR_HEIGHT, 1, 0.0)?;
        for i in 0..GRADIENT_STEPS {
            let t = i as f64 / (GRADIENT_STEPS - 1) as f64;
            let value = (min * (1.0 - t) + max * t) as f32;
            for y in 0..GRADIENT_ROWS {
                image.set(GRADIENT_LEFT + i, y, 0, Some(value));
            }
        }

        let min_label = format!("{min:.1}");
        let max_label = format!("{max:.1}");
        let ink = Some(max as f32);
        for (label, left) in [(&min_label, 0), (&max_label, MAX_LABEL_LEFT)] {
            font::draw_text(label, left, LABEL_BASELINE, |x, y| {
                if x < BAR_WIDTH && y < BAR_HEIGHT {
                    image.set(x, y, 0, ink);
                }
            });
        }

        image.set_display_range(min, max);
        Ok(Self {
            image,
            min_label,
            max_label,
        })
    }

    /// Gradient value of step `i`, `0..GRADIENT_STEPS`.
    pub fn step(&self, i: usize) -> Option<f32> {
        self.image.get(GRADIENT_LEFT + i, 0, 0)
    }
}
