use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::image_pipeline::acquisition::{
    AcquisitionReader, ChannelPair, ChannelSelection, TiffHyperstackReader, spectral_profile,
    spectral_stack,
};
use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::common::timing::PipelineTimings;
use crate::image_pipeline::interaction::Operator;
use crate::image_pipeline::preprocess::{
    BackgroundMode, BackgroundSubtractor, RoiMeanSubtractor, RollingBall, corrector_for,
    detect_bit_depth, mask_saturated, max_value,
};
use crate::image_pipeline::render::{CalibrationBar, Lut};
use crate::image_pipeline::stack::{DisplayRange, ImageStack, Rect, Statistics, ensure_same_shape};
use crate::image_pipeline::threshold::{ThresholdRange, apply_threshold, default_dark};
use crate::image_pipeline::tiff::{StandardTiffWriter, TiffWriter};
use crate::image_pipeline::workflow::config::{FretConfig, InputSource};
use crate::image_pipeline::workflow::layout::OutputLayout;

/// Lowest threshold ever applied; removes zero-valued background.
const THRESHOLD_FLOOR: f64 = 1.0;

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct FretReport {
    pub output_dir: PathBuf,
    pub fret_path: PathBuf,
    /// Raw Donor and Acceptor channels (spectral input only)
    pub raw_paths: Option<(PathBuf, PathBuf)>,
    pub preview_path: Option<PathBuf>,
    pub calibration_bar_path: Option<PathBuf>,
    pub channels: Option<ChannelPair>,
    pub series: Option<usize>,
    pub bit_depth: u32,
    pub threshold: ThresholdRange,
    pub statistics: Statistics,
    pub display_range: DisplayRange,
    pub timings: PipelineTimings,
}

/// Donor/Acceptor pair as loaded from disk.
struct Loaded {
    donor: ImageStack,
    acceptor: ImageStack,
    layout: OutputLayout,
    channels: Option<ChannelPair>,
    series: Option<usize>,
}

pub struct FretPipeline<R: AcquisitionReader, W: TiffWriter, O: Operator> {
    reader: R,
    writer: W,
    operator: O,
    config: FretConfig,
}

impl<O: Operator> FretPipeline<TiffHyperstackReader, StandardTiffWriter, O> {
    pub fn new(config: FretConfig, operator: O) -> Self {
        Self {
            reader: TiffHyperstackReader,
            writer: StandardTiffWriter,
            operator,
            config,
        }
    }
}

fn stage<T>(timings: &mut PipelineTimings, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    timings.measure(name, || {
        let _span = tracing::info_span!("stage", step = name).entered();
        f()
    })
}

impl<R: AcquisitionReader, W: TiffWriter, O: Operator> FretPipeline<R, W, O> {
    pub fn with_custom(reader: R, writer: W, operator: O, config: FretConfig) -> Self {
        Self {
            reader,
            writer,
            operator,
            config,
        }
    }

    pub fn config(&self) -> &FretConfig {
        &self.config
    }

    /// Runs the whole analysis. The output folder and every file in it are
    /// only written once the FRET image has been computed, so a failed run
    /// leaves nothing behind.
    #[instrument(skip(self), fields(
        input = %self.config.input.primary_path().display(),
        metric = self.config.metric.file_tag()
    ))]
    pub fn run(&self) -> Result<FretReport> {
        info!("Starting FRET analysis");
        let mut timings = PipelineTimings::new();
        let output = &self.config.output;

        let Loaded {
            donor: raw_donor,
            acceptor: raw_acceptor,
            layout,
            channels,
            series,
        } = stage(&mut timings, "load", || self.load())?;
        ensure_same_shape(&raw_donor, &raw_acceptor)?;
        let (width, height, planes) = raw_donor.dims();
        info!(width, height, planes, "Donor and Acceptor loaded");

        let roi = if self.config.needs_roi() {
            let roi = self.operator.pick_roi(&raw_acceptor)?;
            roi.validate_for(&raw_acceptor)?;
            Some(roi)
        } else {
            None
        };

        // depth and threshold seed come from the untouched first Acceptor plane
        let first_plane = raw_acceptor.extract_plane(0);
        let depth = detect_bit_depth(raw_acceptor.bit_depth(), &first_plane);
        let seed = default_dark(&first_plane)?;
        debug!(min = seed.min(), max = seed.max(), "Automatic threshold");

        let (donor, acceptor) = stage(&mut timings, "mask_saturated", || {
            Ok((mask_saturated(&raw_donor, depth)?, mask_saturated(&raw_acceptor, depth)?))
        })?;

        let (donor, acceptor) = match self.config.bleach {
            Some(method) => stage(&mut timings, "bleach_correction", || {
                info!(%method, "Correcting photobleaching");
                let donor = corrector_for(method, &donor, roi)?.correct(&donor)?;
                let acceptor = corrector_for(method, &acceptor, roi)?.correct(&acceptor)?;
                Ok((donor, acceptor))
            })?,
            None => (donor, acceptor),
        };

        let (donor, acceptor) = stage(&mut timings, "background", || {
            let subtractor = self.background_subtractor(roi)?;
            Ok((subtractor.subtract(&donor)?, subtractor.subtract(&acceptor)?))
        })?;

        let chosen = self.operator.pick_threshold(&first_plane, seed)?;
        let threshold = chosen.clamp_to(THRESHOLD_FLOOR, max_value(depth) - 1.0)?;
        info!(min = threshold.min(), max = threshold.max(), "Threshold");
        let (donor, acceptor) = stage(&mut timings, "threshold", || {
            Ok((apply_threshold(&donor, threshold), apply_threshold(&acceptor, threshold)))
        })?;

        let metric = self.config.metric;
        let (fret, statistics, display_range) = stage(&mut timings, "metric", || {
            let mut fret = metric.compute(&donor, &acceptor)?;
            let statistics = fret.statistics(&layout.fret_title(metric))?;
            let (min, max) = metric.display_range(&statistics);
            fret.set_display_range(min, max);
            let mut calibration = donor.calibration().clone();
            if let Some(minutes) = self.config.frame_interval {
                calibration.frame_interval = Some(minutes);
                calibration.time_unit = "min".to_string();
            }
            fret.set_calibration(calibration);
            Ok((fret, statistics, DisplayRange { min, max }))
        })?;
        info!(
            min = statistics.min,
            max = statistics.max,
            mean = statistics.mean,
            valid = statistics.count,
            "{}",
            metric.label()
        );

        layout.create_dir()?;
        let raw_paths = if channels.is_some() {
            let paths = (layout.donor_raw(), layout.acceptor_raw());
            stage(&mut timings, "save_raw", || {
                self.writer.save_stack(&raw_donor, &paths.0, output)?;
                self.writer.save_stack(&raw_acceptor, &paths.1, output)
            })?;
            Some(paths)
        } else {
            None
        };

        let fret_path = layout.fret(metric);
        stage(&mut timings, "save_fret", || {
            self.writer.save_stack(&fret, &fret_path, output)
        })?;

        let preview_path = if self.config.preview {
            let path = layout.fret_preview(metric);
            stage(&mut timings, "save_preview", || {
                let rgb = Lut::named(self.config.lut).render_rgb(&fret, display_range);
                self.writer.save_rgb(&rgb, &path, output)
            })?;
            Some(path)
        } else {
            None
        };

        let calibration_bar_path = if self.config.calibration_bar {
            let path = layout.calibration_bar();
            stage(&mut timings, "calibration_bar", || {
                let bar = CalibrationBar::render(display_range.min, display_range.max)?;
                debug!(min = %bar.min_label, max = %bar.max_label, "Calibration bar labels");
                self.writer.save_stack(&bar.image, &path, output)
            })?;
            Some(path)
        } else {
            None
        };

        timings.log_summary();
        info!(output = %layout.dir().display(), "FRET analysis complete");

        Ok(FretReport {
            output_dir: layout.dir().to_path_buf(),
            fret_path,
            raw_paths,
            preview_path,
            calibration_bar_path,
            channels,
            series,
            bit_depth: depth,
            threshold,
            statistics,
            display_range,
            timings,
        })
    }

    fn load(&self) -> Result<Loaded> {
        match &self.config.input {
            InputSource::Spectral { path } => self.load_spectral(path),
            InputSource::Separate { donor, acceptor } => {
                info!(donor = %donor.display(), acceptor = %acceptor.display(), "Reading separate files");
                Ok(Loaded {
                    donor: self.reader.read_stack(donor)?,
                    acceptor: self.reader.read_stack(acceptor)?,
                    layout: OutputLayout::new(donor, None)?,
                    channels: None,
                    series: None,
                })
            }
        }
    }

    fn load_spectral(&self, path: &Path) -> Result<Loaded> {
        let info = self.reader.probe(path)?;
        info!(
            channels = info.channels,
            slices = info.slices,
            frames = info.frames,
            series = info.series,
            "Spectral acquisition"
        );

        let series = if info.series > 1 {
            self.operator.pick_series(info.series)?
        } else {
            0
        };
        if series >= info.series {
            return Err(FretError::InvalidSeries {
                index: series,
                count: info.series,
            });
        }

        let channels = if self.config.select_channels {
            let spectral = spectral_stack(&self.reader, path, &info, series)?;
            let region = match self.operator.pick_roi(&spectral) {
                Ok(roi) => Some(roi).filter(|r| r.validate_for(&spectral).is_ok()),
                Err(FretError::MissingRoi) => None,
                Err(e) => return Err(e),
            };
            if region.is_none() {
                debug!("Spectral profile over the whole field");
            }
            let profile = spectral_profile(&spectral, region);
            self.operator.pick_channels(info.channels, &profile)?
        } else {
            ChannelPair::default()
        };
        channels.validate(info.channels)?;
        info!(donor = channels.donor, acceptor = channels.acceptor, "Channels");

        let read = |channel| {
            self.reader.read_channel(
                path,
                ChannelSelection {
                    channel,
                    series,
                    frame: None,
                },
            )
        };
        Ok(Loaded {
            donor: read(channels.donor)?,
            acceptor: read(channels.acceptor)?,
            layout: OutputLayout::new(path, Some(series))?,
            channels: Some(channels),
            series: Some(series),
        })
    }

    fn background_subtractor(&self, roi: Option<Rect>) -> Result<Box<dyn BackgroundSubtractor>> {
        Ok(match self.config.background {
            BackgroundMode::Manual => {
                Box::new(RoiMeanSubtractor::new(roi.ok_or(FretError::MissingRoi)?))
            }
            BackgroundMode::RollingBall { radius } => Box::new(RollingBall::new(radius)?),
        })
    }
}
