//! Command-line interface.
//!
//! Flags map onto [`FretConfig`] and onto the answers of a [`ScriptedOperator`],
//! which stands in for the interactive dialogs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::image_pipeline::{
    BackgroundMode, BleachMethod, ChannelPair, FretConfig, FretMetric, LutName, Rect, Result,
    ScriptedOperator, ThresholdRange, TiffCompression,
};

#[derive(Debug, Parser)]
#[command(name = "fret_lsm")]
#[command(about = "FRET index/ratio analysis of Donor/Acceptor timelapse acquisitions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub input: InputCommand,
}

#[derive(Debug, Subcommand)]
pub enum InputCommand {
    /// Analyse one multi-channel (spectral) acquisition.
    Spectral {
        /// Multi-page TIFF hyperstack.
        path: PathBuf,

        /// Donor and Acceptor channels, 1-based (`d,a`). Defaults to 3,7.
        #[arg(long, value_parser = parse_channels)]
        channels: Option<ChannelPair>,

        /// Skip channel selection and use channels 3 and 7.
        #[arg(long)]
        no_channel_selection: bool,

        /// Series to analyse, 1-based.
        #[arg(long, value_parser = parse_series)]
        series: Option<usize>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Analyse separate Donor and Acceptor timelapse files.
    Separate {
        donor: PathBuf,
        acceptor: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AnalysisArgs {
    /// FRET metric to compute.
    #[arg(long, value_enum, default_value_t = FretMetric::Index)]
    pub metric: FretMetric,

    /// Photobleaching correction method (off when omitted).
    #[arg(long, value_enum)]
    pub bleach: Option<BleachMethod>,

    /// Subtract the mean of the background ROI instead of rolling a ball.
    #[arg(long)]
    pub manual_background: bool,

    /// Rolling-ball radius in pixels.
    #[arg(long, default_value_t = 50)]
    pub rolling_ball: u32,

    /// Background ROI as `x,y,width,height`.
    #[arg(long)]
    pub roi: Option<Rect>,

    /// Threshold as `min,max`. Defaults to the automatic "Default dark" range.
    #[arg(long)]
    pub threshold: Option<ThresholdRange>,

    /// Minutes between two timepoints.
    #[arg(long)]
    pub frame_interval: Option<f64>,

    /// Do not write FRET_CalibrationBar.tif.
    #[arg(long)]
    pub no_calibration_bar: bool,

    /// Also write an 8-bit RGB rendering of the result.
    #[arg(long)]
    pub preview: bool,

    /// Lookup table for the preview.
    #[arg(long, value_enum, default_value_t = LutName::Fire)]
    pub lut: LutName,

    /// TIFF compression for every written file.
    #[arg(long, value_enum, default_value_t = TiffCompression::None)]
    pub compression: TiffCompression,

    /// Leave out the ImageJ description tag.
    #[arg(long)]
    pub no_imagej_metadata: bool,
}

fn parse_channels(s: &str) -> std::result::Result<ChannelPair, String> {
    let (donor, acceptor) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `donor,acceptor`, got `{s}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid channel `{v}`: {e}"))
    };
    Ok(ChannelPair {
        donor: parse(donor)?,
        acceptor: parse(acceptor)?,
    })
}

fn parse_series(s: &str) -> std::result::Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("series must be a number from 1, got `{s}`")),
    }
}

impl Cli {
    pub fn analysis(&self) -> &AnalysisArgs {
        match &self.input {
            InputCommand::Spectral { analysis, .. } | InputCommand::Separate { analysis, .. } => {
                analysis
            }
        }
    }

    pub fn config(&self) -> Result<FretConfig> {
        let args = self.analysis();
        let builder = match &self.input {
            InputCommand::Spectral {
                path,
                no_channel_selection,
                ..
            } => FretConfig::builder()
                .spectral(path)
                .select_channels(!no_channel_selection),
            InputCommand::Separate {
                donor, acceptor, ..
            } => FretConfig::builder().separate(donor, acceptor),
        };
        let background = if args.manual_background {
            BackgroundMode::Manual
        } else {
            BackgroundMode::RollingBall {
                radius: args.rolling_ball,
            }
        };

        let mut builder = builder
            .metric(args.metric)
            .bleach(args.bleach)
            .background(background)
            .calibration_bar(!args.no_calibration_bar)
            .preview(args.preview)
            .lut(args.lut)
            .compression(args.compression)
            .imagej_metadata(!args.no_imagej_metadata);
        if let Some(minutes) = args.frame_interval {
            builder = builder.frame_interval(minutes);
        }
        builder.build()
    }

    /// Operator answering from the command line flags.
    pub fn operator(&self) -> ScriptedOperator {
        let args = self.analysis();
        let mut operator = ScriptedOperator::new();
        if let Some(roi) = args.roi {
            operator = operator.with_roi(roi);
        }
        if let Some(threshold) = args.threshold {
            operator = operator.with_threshold(threshold);
        }
        if let InputCommand::Spectral {
            channels, series, ..
        } = &self.input
        {
            if let Some(channels) = channels {
                operator = operator.with_channels(*channels);
            }
            if let Some(series) = series {
                operator = operator.with_series(*series);
            }
        }
        operator
    }
}
