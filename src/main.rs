use anyhow::Context;
use clap::Parser;
use fret_lsm_rs::cli::Cli;
use fret_lsm_rs::image_pipeline::FretPipeline;
use fret_lsm_rs::logger;

use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    logger::init();
    let cli = Cli::parse();

    info!("Starting fret_lsm...");

    let config = cli.config().context("invalid configuration")?;
    let pipeline = FretPipeline::new(config, cli.operator());

    info!("Metric: {}", pipeline.config().metric);
    info!(
        "Bleach correction: {}",
        match pipeline.config().bleach {
            Some(method) => method.to_string(),
            None => "disabled".to_string(),
        }
    );
    info!("Background: {:?}", pipeline.config().background);

    match pipeline.run() {
        Ok(report) => {
            info!(
                fret = %report.fret_path.display(),
                min = report.display_range.min,
                max = report.display_range.max,
                threshold_min = report.threshold.min(),
                threshold_max = report.threshold.max(),
                "Analysis successful!"
            );
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            Err(e).context("FRET analysis failed")
        }
    }
}
