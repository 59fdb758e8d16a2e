//! False-color lookup tables and RGB preview rendering.
//!
//! Rendering is display-only: it reads the float samples through a display
//! range and never writes them back.

use clap::ValueEnum;

use crate::image_pipeline::stack::{DisplayRange, ImageStack};

const FIRE_R: [u8; 32] = [
    0, 0, 1, 25, 49, 73, 98, 122, 146, 162, 173, 184, 195, 207, 217, 229, 240, 252, 255, 255, 255,
    255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
];
const FIRE_G: [u8; 32] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 14, 35, 57, 79, 101, 117, 133, 147, 161, 175, 190, 205,
    219, 234, 248, 255, 255, 255, 255,
];
const FIRE_B: [u8; 32] = [
    0, 61, 96, 130, 165, 192, 220, 227, 210, 181, 151, 122, 93, 64, 35, 5, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 35, 98, 160, 223, 255, 255, 255,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LutName {
    Fire,
    Grays,
}

/// Interleaved 8-bit RGB planes produced for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub planes: usize,
    pub data: Vec<u8>,
}

/// 256-entry RGB palette.
#[derive(Debug, Clone)]
pub struct Lut {
    table: [[u8; 3]; 256],
}

impl Lut {
    pub fn named(name: LutName) -> Self {
        match name {
            LutName::Fire => Self::fire(),
            LutName::Grays => Self::grays(),
        }
    }

    /// 32 control points linearly interpolated to 256 entries.
    pub fn fire() -> Self {
        let scale = FIRE_R.len() as f64 / 256.0;
        let mut table = [[0u8; 3]; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let pos = i as f64 * scale;
            let i1 = pos as usize;
            let i2 = (i1 + 1).min(FIRE_R.len() - 1);
            let fraction = pos - i1 as f64;
            let lerp = |c: &[u8; 32]| ((1.0 - fraction) * c[i1] as f64 + fraction * c[i2] as f64) as u8;
            *entry = [lerp(&FIRE_R), lerp(&FIRE_G), lerp(&FIRE_B)];
        }
        Self { table }
    }

    pub fn grays() -> Self {
        let mut table = [[0u8; 3]; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = [i as u8; 3];
        }
        Self { table }
    }

    pub fn color(&self, index: u8) -> [u8; 3] {
        self.table[index as usize]
    }

    /// Maps every plane to interleaved RGB through `range`. Invalid samples
    /// take the first palette entry.
    pub fn render_rgb(&self, image: &ImageStack, range: DisplayRange) -> RgbImage {
        let span = range.max - range.min;
        let mut out = Vec::with_capacity(image.samples().len() * 3);
        for sample in image.samples() {
            let index = match sample {
                Some(v) if span > 0.0 => {
                    (((*v as f64 - range.min) / span) * 256.0).clamp(0.0, 255.0) as u8
                }
                Some(v) if (*v as f64) >= range.max => 255,
                _ => 0,
            };
            out.extend_from_slice(&self.color(index));
        }
        RgbImage {
            width: image.width(),
            height: image.height(),
            planes: image.planes(),
            data: out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_runs_from_black_to_white() {
        let lut = Lut::fire();
        assert_eq!(lut.color(0), [0, 0, 0]);
        assert_eq!(lut.color(255), [255, 255, 255]);
        // control point 8 lands on entry 64
        assert_eq!(lut.color(64), [146, 0, 210]);
    }

    #[test]
    fn render_does_not_touch_samples() {
        let image = ImageStack::new(3, 1, 1, vec![Some(0.0), Some(50.0), None]).unwrap();
        let before = image.clone();
        let rgb = Lut::grays().render_rgb(&image, DisplayRange { min: 0.0, max: 100.0 });
        assert_eq!(image, before);
        assert_eq!(rgb.data, vec![0, 0, 0, 128, 128, 128, 0, 0, 0]);
        assert_eq!((rgb.width, rgb.height, rgb.planes), (3, 1, 1));
    }

    #[test]
    fn values_beyond_range_saturate() {
        let image = ImageStack::from_values(2, 1, 1, vec![-5.0, 500.0]).unwrap();
        let rgb = Lut::grays().render_rgb(&image, DisplayRange { min: 0.0, max: 100.0 });
        assert_eq!(rgb.data, vec![0, 0, 0, 255, 255, 255]);
    }
}
