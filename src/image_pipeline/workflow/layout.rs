use std::path::{Path, PathBuf};

use tracing::debug;

use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::metric::FretMetric;

const CALIBRATION_BAR_FILE: &str = "FRET_CalibrationBar.tif";

/// Result folder and file names for one analysed acquisition.
///
/// Everything lands in `<input folder>/<basename>/`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    basename: String,
    dir: PathBuf,
}

impl OutputLayout {
    /// `series` is set for spectral acquisitions and appended as `_Snn`.
    pub fn new(input: &Path, series: Option<usize>) -> Result<Self> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                FretError::InvalidConfig(format!("cannot derive a name from {}", input.display()))
            })?;
        let mut basename = stem.replace(' ', "_").to_lowercase();
        if let Some(series) = series {
            basename.push_str(&format!("_S{series:02}"));
        }
        let parent = input.parent().unwrap_or_else(|| Path::new(""));
        let dir = parent.join(&basename);
        Ok(Self { basename, dir })
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the result folder if it does not exist yet.
    pub fn create_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            FretError::OutputWriteError(format!("{}: {}", self.dir.display(), e))
        })?;
        debug!(dir = %self.dir.display(), "Output folder ready");
        Ok(())
    }

    pub fn donor_raw(&self) -> PathBuf {
        self.dir.join(format!("{}_c1.tif", self.basename))
    }

    pub fn acceptor_raw(&self) -> PathBuf {
        self.dir.join(format!("{}_c2.tif", self.basename))
    }

    pub fn fret_title(&self, metric: FretMetric) -> String {
        format!("FRET_{}_{}", metric.file_tag(), self.basename)
    }

    pub fn fret(&self, metric: FretMetric) -> PathBuf {
        self.dir.join(format!("{}.tif", self.fret_title(metric)))
    }

    pub fn fret_preview(&self, metric: FretMetric) -> PathBuf {
        self.dir.join(format!("{}_rgb.tif", self.fret_title(metric)))
    }

    pub fn calibration_bar(&self) -> PathBuf {
        self.dir.join(CALIBRATION_BAR_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectral_basename_has_series_suffix() {
        let layout = OutputLayout::new(Path::new("/data/My Cells 01.lsm"), Some(2)).unwrap();
        assert_eq!(layout.basename(), "my_cells_01_S02");
        assert_eq!(layout.dir(), Path::new("/data/my_cells_01_S02"));
        assert_eq!(
            layout.donor_raw(),
            PathBuf::from("/data/my_cells_01_S02/my_cells_01_S02_c1.tif")
        );
        assert_eq!(
            layout.acceptor_raw(),
            PathBuf::from("/data/my_cells_01_S02/my_cells_01_S02_c2.tif")
        );
    }

    #[test]
    fn result_file_names() {
        let layout = OutputLayout::new(Path::new("/data/Donor.tif"), None).unwrap();
        assert_eq!(layout.basename(), "donor");
        assert_eq!(
            layout.fret(FretMetric::RatioAcceptorDonor),
            PathBuf::from("/data/donor/FRET_ratioA_D_donor.tif")
        );
        assert_eq!(
            layout.fret_preview(FretMetric::Index),
            PathBuf::from("/data/donor/FRET_index_donor_rgb.tif")
        );
        assert_eq!(
            layout.calibration_bar(),
            PathBuf::from("/data/donor/FRET_CalibrationBar.tif")
        );
    }

    #[test]
    fn create_dir_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(&temp.path().join("run.tif"), Some(0)).unwrap();
        layout.create_dir().unwrap();
        layout.create_dir().unwrap();
        assert!(temp.path().join("run_S00").is_dir());
    }

    #[test]
    fn nameless_input_is_rejected() {
        assert!(OutputLayout::new(Path::new("/"), None).is_err());
    }
}
