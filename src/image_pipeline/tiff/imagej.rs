//! ImageJ hyperstack description (`ImageDescription` tag) encoding.
//!
//! `key=value` lines; pages are ordered channel fastest, then slice, then frame.

use crate::image_pipeline::stack::{Calibration, ImageStack};

const IMAGEJ_VERSION: &str = "1.54f";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageJDescription {
    pub images: usize,
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
    pub unit: Option<String>,
    pub spacing: Option<f64>,
    pub frame_interval: Option<f64>,
    pub time_unit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Default for ImageJDescription {
    fn default() -> Self {
        Self {
            images: 1,
            channels: 1,
            slices: 1,
            frames: 1,
            unit: None,
            spacing: None,
            frame_interval: None,
            time_unit: None,
            min: None,
            max: None,
        }
    }
}

impl ImageJDescription {
    /// Describes a single-channel stack whose planes are timepoints.
    pub fn for_stack(image: &ImageStack) -> Self {
        let cal = image.calibration();
        let range = image.display_range();
        Self {
            images: image.planes(),
            channels: 1,
            slices: 1,
            frames: image.planes(),
            unit: Some(cal.normalized_unit().to_string()),
            spacing: Some(cal.pixel_depth),
            frame_interval: cal.frame_interval,
            time_unit: cal.frame_interval.map(|_| cal.time_unit.clone()),
            min: range.map(|r| r.min),
            max: range.map(|r| r.max),
        }
    }

    /// Returns `None` when the text is not an ImageJ description.
    pub fn parse(text: &str) -> Option<Self> {
        if !text.starts_with("ImageJ=") {
            return None;
        }
        let mut desc = Self::default();
        let mut images = None;
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "images" => images = value.parse().ok(),
                "channels" => desc.channels = value.parse().unwrap_or(1),
                "slices" => desc.slices = value.parse().unwrap_or(1),
                "frames" => desc.frames = value.parse().unwrap_or(1),
                "unit" => desc.unit = Some(value.to_string()),
                "spacing" => desc.spacing = value.parse().ok(),
                "finterval" => desc.frame_interval = value.parse().ok(),
                "tunit" => desc.time_unit = Some(value.to_string()),
                "min" => desc.min = value.parse().ok(),
                "max" => desc.max = value.parse().ok(),
                _ => {}
            }
        }
        desc.images = images.or(desc.hyperstack_planes()).unwrap_or(1);
        Some(desc)
    }

    /// `channels * slices * frames`, `None` on overflow.
    pub fn hyperstack_planes(&self) -> Option<usize> {
        self.channels
            .checked_mul(self.slices)?
            .checked_mul(self.frames)
    }

    pub fn format(&self) -> String {
        let mut out = format!("ImageJ={IMAGEJ_VERSION}\nimages={}\n", self.images);
        if self.channels > 1 {
            out.push_str(&format!("channels={}\n", self.channels));
        }
        if self.slices > 1 {
            out.push_str(&format!("slices={}\n", self.slices));
        }
        if self.frames > 1 {
            out.push_str(&format!("frames={}\n", self.frames));
        }
        if self.channels > 1 || self.slices > 1 || self.frames > 1 {
            out.push_str("hyperstack=true\n");
        }
        if let Some(unit) = &self.unit {
            out.push_str(&format!("unit={unit}\n"));
        }
        if let Some(spacing) = self.spacing {
            out.push_str(&format!("spacing={spacing}\n"));
        }
        if let Some(interval) = self.frame_interval {
            out.push_str(&format!("finterval={interval}\n"));
        }
        if let Some(tunit) = &self.time_unit {
            out.push_str(&format!("tunit={tunit}\n"));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            out.push_str(&format!("min={min}\nmax={max}\n"));
        }
        out
    }

    /// Merges the description into a calibration read from the resolution tags.
    pub fn apply_to(&self, calibration: &mut Calibration) {
        if let Some(unit) = &self.unit {
            calibration.unit = unit.clone();
        }
        if let Some(spacing) = self.spacing {
            calibration.pixel_depth = spacing;
        }
        calibration.frame_interval = self.frame_interval;
        if let Some(tunit) = &self.time_unit {
            calibration.time_unit = tunit.clone();
        }
    }
}
