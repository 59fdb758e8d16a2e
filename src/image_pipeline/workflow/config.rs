//! Run configuration for the FRET workflow

use std::path::PathBuf;

use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::metric::FretMetric;
use crate::image_pipeline::preprocess::{BackgroundMode, BleachMethod};
use crate::image_pipeline::render::LutName;
use crate::image_pipeline::tiff::{OutputConfig, TiffCompression};

/// Where the Donor and Acceptor stacks come from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// One multi-channel acquisition; channels are picked from it
    Spectral { path: PathBuf },
    /// Two single-channel timelapse files
    Separate { donor: PathBuf, acceptor: PathBuf },
}

impl InputSource {
    /// File whose name and folder decide the output layout
    pub fn primary_path(&self) -> &PathBuf {
        match self {
            InputSource::Spectral { path } => path,
            InputSource::Separate { donor, .. } => donor,
        }
    }
}

/// Configuration for one FRET analysis run
#[derive(Debug, Clone)]
pub struct FretConfig {
    pub input: InputSource,
    /// Photobleaching correction; `None` skips it
    pub bleach: Option<BleachMethod>,
    pub background: BackgroundMode,
    /// Minutes between timepoints, written into the result's calibration
    pub frame_interval: Option<f64>,
    pub metric: FretMetric,
    /// Write `FRET_CalibrationBar.tif` next to the result
    pub calibration_bar: bool,
    /// Write an 8-bit RGB rendering of the result through `lut`
    pub preview: bool,
    pub lut: LutName,
    /// Ask the operator for the Donor/Acceptor channels instead of using 3 and 7
    pub select_channels: bool,
    pub output: OutputConfig,
}

impl FretConfig {
    pub fn builder() -> FretConfigBuilder {
        FretConfigBuilder::default()
    }

    /// True when the operator must draw a background ROI.
    pub fn needs_roi(&self) -> bool {
        self.bleach.is_some() || matches!(self.background, BackgroundMode::Manual)
    }
}

/// Builder for FretConfig
#[derive(Default)]
pub struct FretConfigBuilder {
    input: Option<InputSource>,
    bleach: Option<Option<BleachMethod>>,
    background: Option<BackgroundMode>,
    frame_interval: Option<f64>,
    metric: Option<FretMetric>,
    calibration_bar: Option<bool>,
    preview: Option<bool>,
    lut: Option<LutName>,
    select_channels: Option<bool>,
    compression: Option<TiffCompression>,
    imagej_metadata: Option<bool>,
}

impl FretConfigBuilder {
    pub fn spectral(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(InputSource::Spectral { path: path.into() });
        self
    }

    pub fn separate(mut self, donor: impl Into<PathBuf>, acceptor: impl Into<PathBuf>) -> Self {
        self.input = Some(InputSource::Separate {
            donor: donor.into(),
            acceptor: acceptor.into(),
        });
        self
    }

    pub fn bleach(mut self, method: Option<BleachMethod>) -> Self {
        self.bleach = Some(method);
        self
    }

    pub fn background(mut self, mode: BackgroundMode) -> Self {
        self.background = Some(mode);
        self
    }

    pub fn frame_interval(mut self, minutes: f64) -> Self {
        self.frame_interval = Some(minutes);
        self
    }

    pub fn metric(mut self, metric: FretMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn calibration_bar(mut self, enable: bool) -> Self {
        self.calibration_bar = Some(enable);
        self
    }

    pub fn preview(mut self, enable: bool) -> Self {
        self.preview = Some(enable);
        self
    }

    pub fn lut(mut self, lut: LutName) -> Self {
        self.lut = Some(lut);
        self
    }

    pub fn select_channels(mut self, enable: bool) -> Self {
        self.select_channels = Some(enable);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn imagej_metadata(mut self, enable: bool) -> Self {
        self.imagej_metadata = Some(enable);
        self
    }

    pub fn build(self) -> Result<FretConfig> {
        let input = self
            .input
            .ok_or_else(|| FretError::InvalidConfig("no input file given".to_string()))?;
        if let Some(minutes) = self.frame_interval
            && !(minutes.is_finite() && minutes > 0.0)
        {
            return Err(FretError::InvalidConfig(format!(
                "frame interval must be a positive number of minutes, got {minutes}"
            )));
        }
        if let Some(BackgroundMode::RollingBall { radius: 0 }) = self.background {
            return Err(FretError::InvalidConfig(
                "rolling ball radius must be positive".to_string(),
            ));
        }

        let output = OutputConfig::default();
        Ok(FretConfig {
            input,
            bleach: self.bleach.unwrap_or(None),
            background: self.background.unwrap_or_default(),
            frame_interval: self.frame_interval,
            metric: self.metric.unwrap_or(FretMetric::Index),
            calibration_bar: self.calibration_bar.unwrap_or(true),
            preview: self.preview.unwrap_or(false),
            lut: self.lut.unwrap_or(LutName::Fire),
            select_channels: self.select_channels.unwrap_or(true),
            output: OutputConfig {
                compression: self.compression.unwrap_or(output.compression),
                imagej_metadata: self.imagej_metadata.unwrap_or(output.imagej_metadata),
            },
        })
    }
}
