use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::image_pipeline::acquisition::{AcquisitionInfo, AcquisitionReader, ChannelPair, ChannelSelection};
use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::interaction::{Operator, ScriptedOperator};
use crate::image_pipeline::metric::FretMetric;
use crate::image_pipeline::preprocess::BackgroundMode;
use crate::image_pipeline::render::RgbImage;
use crate::image_pipeline::stack::{ImageStack, Rect};
use crate::image_pipeline::threshold::ThresholdRange;
use crate::image_pipeline::tiff::{OutputConfig, TiffWriter};
use crate::image_pipeline::workflow::{FretConfig, FretPipeline};

const SIZE: usize = 16;
const FRAMES: usize = 3;

/// Flat background of 10 with a square cell of `10 + signal` in the middle.
fn cell_stack(signal: f32) -> ImageStack {
    let mut values = Vec::with_capacity(SIZE * SIZE * FRAMES);
    for _ in 0..FRAMES {
        for y in 0..SIZE {
            for x in 0..SIZE {
                let inside = (4..12).contains(&x) && (4..12).contains(&y);
                values.push(if inside { 10.0 + signal } else { 10.0 });
            }
        }
    }
    ImageStack::from_values(SIZE, SIZE, FRAMES, values)
        .unwrap()
        .with_bit_depth(16)
}

struct MockReader {
    info: AcquisitionInfo,
    /// Keyed by 1-based channel in spectral mode and by file name otherwise.
    channels: HashMap<usize, ImageStack>,
    files: HashMap<String, ImageStack>,
}

impl MockReader {
    fn separate(donor: ImageStack, acceptor: ImageStack) -> Self {
        let files = HashMap::from([
            ("Donor Cells.tif".to_string(), donor),
            ("acceptor.tif".to_string(), acceptor),
        ]);
        Self {
            info: AcquisitionInfo {
                width: SIZE,
                height: SIZE,
                channels: 1,
                slices: 1,
                frames: FRAMES,
                series: 1,
                bit_depth: 16,
            },
            channels: HashMap::new(),
            files,
        }
    }

    fn spectral(channels: usize, series: usize) -> Self {
        let mut stacks = HashMap::new();
        for c in 1..=channels {
            stacks.insert(c, cell_stack(c as f32 * 100.0));
        }
        Self {
            info: AcquisitionInfo {
                width: SIZE,
                height: SIZE,
                channels,
                slices: 1,
                frames: FRAMES,
                series,
                bit_depth: 16,
            },
            channels: stacks,
            files: HashMap::new(),
        }
    }
}

impl AcquisitionReader for MockReader {
    fn probe(&self, _path: &Path) -> Result<AcquisitionInfo> {
        Ok(self.info)
    }

    fn read_channel(&self, _path: &Path, selection: ChannelSelection) -> Result<ImageStack> {
        let stack = self
            .channels
            .get(&selection.channel)
            .ok_or_else(|| FretError::InvalidChannel(format!("no channel {}", selection.channel)))?;
        Ok(match selection.frame {
            Some(t) => stack.extract_plane(t),
            None => stack.clone(),
        })
    }

    fn read_stack(&self, path: &Path) -> Result<ImageStack> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| FretError::InputReadError(format!("Mock file not found: {name}")))
    }
}

#[derive(Clone, Default)]
struct MockWriter {
    stacks: Arc<Mutex<Vec<(PathBuf, ImageStack)>>>,
    rgb: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockWriter {
    fn written(&self) -> Vec<PathBuf> {
        self.stacks.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    fn stack_at(&self, path: &Path) -> Option<ImageStack> {
        self.stacks
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, s)| s.clone())
    }
}

impl TiffWriter for MockWriter {
    fn write_stack(&self, _image: &ImageStack, _output: &mut dyn Write, _config: &OutputConfig) -> Result<()> {
        Ok(())
    }

    fn write_rgb(&self, _image: &RgbImage, _output: &mut dyn Write, _config: &OutputConfig) -> Result<()> {
        Ok(())
    }

    fn save_stack(&self, image: &ImageStack, path: &Path, _config: &OutputConfig) -> Result<()> {
        self.stacks.lock().unwrap().push((path.to_path_buf(), image.clone()));
        Ok(())
    }

    fn save_rgb(&self, _image: &RgbImage, path: &Path, _config: &OutputConfig) -> Result<()> {
        self.rgb.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

struct CancellingOperator;

impl Operator for CancellingOperator {
    fn pick_roi(&self, _image: &ImageStack) -> Result<Rect> {
        Ok(Rect::new(0, 0, 3, 3))
    }

    fn pick_channels(&self, _channels: usize, _profile: &[Option<f64>]) -> Result<ChannelPair> {
        Ok(ChannelPair::default())
    }

    fn pick_threshold(&self, _image: &ImageStack, _seed: ThresholdRange) -> Result<ThresholdRange> {
        Err(FretError::Cancelled("threshold dialog closed".to_string()))
    }

    fn pick_series(&self, _count: usize) -> Result<usize> {
        Ok(0)
    }
}

fn operator() -> ScriptedOperator {
    ScriptedOperator::new()
        .with_roi(Rect::new(0, 0, 3, 3))
        .with_threshold(ThresholdRange::new(0.0, 60000.0).unwrap())
}

fn separate_config(dir: &Path) -> FretConfig {
    FretConfig::builder()
        .separate(dir.join("Donor Cells.tif"), dir.join("acceptor.tif"))
        .background(BackgroundMode::Manual)
        .build()
        .unwrap()
}

#[test]
fn test_separate_files_index() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let reader = MockReader::separate(cell_stack(100.0), cell_stack(300.0));
    let pipeline = FretPipeline::with_custom(reader, writer.clone(), operator(), separate_config(temp.path()));

    let report = pipeline.run().unwrap();

    let dir = temp.path().join("donor_cells");
    assert!(dir.is_dir());
    assert_eq!(report.output_dir, dir);
    assert_eq!(report.fret_path, dir.join("FRET_index_donor_cells.tif"));
    assert_eq!(report.calibration_bar_path, Some(dir.join("FRET_CalibrationBar.tif")));
    assert_eq!(report.raw_paths, None);
    assert_eq!(writer.written(), vec![report.fret_path.clone(), dir.join("FRET_CalibrationBar.tif")]);

    // 100 x 300 / (300 + 100)
    assert_eq!(report.statistics.min, 75.0);
    assert_eq!(report.statistics.max, 75.0);
    assert_eq!((report.display_range.min, report.display_range.max), (75.0, 75.0));
    assert_eq!(report.bit_depth, 12);
    assert_eq!((report.threshold.min(), report.threshold.max()), (1.0, 4094.0));

    let fret = writer.stack_at(&report.fret_path).unwrap();
    assert_eq!(fret.dims(), (SIZE, SIZE, FRAMES));
    assert_eq!(fret.get(0, 0, 0), None);
    assert_eq!(fret.get(8, 8, 2), Some(75.0));
    assert!(report.timings.get_step("metric").is_some());
}

#[test]
fn test_dimension_mismatch_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let small = ImageStack::filled(8, 8, FRAMES, 50.0).unwrap();
    let reader = MockReader::separate(cell_stack(100.0), small);
    let pipeline = FretPipeline::with_custom(reader, writer.clone(), operator(), separate_config(temp.path()));

    let result = pipeline.run();

    assert!(matches!(result, Err(FretError::DimensionMismatch { .. })));
    assert!(writer.written().is_empty());
    assert!(!temp.path().join("donor_cells").exists());
}

#[test]
fn test_missing_roi_aborts_before_result() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let reader = MockReader::separate(cell_stack(100.0), cell_stack(300.0));
    let pipeline = FretPipeline::with_custom(
        reader,
        writer.clone(),
        ScriptedOperator::new(),
        separate_config(temp.path()),
    );

    assert!(matches!(pipeline.run(), Err(FretError::MissingRoi)));
    assert!(writer.written().is_empty());
    assert!(!temp.path().join("donor_cells").exists());
}

fn spectral_manual_config(dir: &Path) -> FretConfig {
    FretConfig::builder()
        .spectral(dir.join("cells.lsm"))
        .background(BackgroundMode::Manual)
        .build()
        .unwrap()
}

fn spectral_channels() -> ChannelPair {
    ChannelPair {
        donor: 1,
        acceptor: 2,
    }
}

#[test]
fn test_spectral_missing_roi_leaves_no_output() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let operator = ScriptedOperator::new().with_channels(spectral_channels());
    let pipeline = FretPipeline::with_custom(
        MockReader::spectral(4, 1),
        writer.clone(),
        operator,
        spectral_manual_config(temp.path()),
    );

    assert!(matches!(pipeline.run(), Err(FretError::MissingRoi)));
    assert!(writer.written().is_empty());
    assert!(!temp.path().join("cells_S00").exists());
}

#[test]
fn test_spectral_empty_threshold_leaves_no_output() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    // above the 12-bit ceiling, so nothing survives the clamp
    let operator = operator()
        .with_channels(spectral_channels())
        .with_threshold(ThresholdRange::new(5000.0, 6000.0).unwrap());
    let pipeline = FretPipeline::with_custom(
        MockReader::spectral(4, 1),
        writer.clone(),
        operator,
        spectral_manual_config(temp.path()),
    );

    assert!(matches!(
        pipeline.run(),
        Err(FretError::InvalidThreshold(_, _))
    ));
    assert!(writer.written().is_empty());
    assert!(!temp.path().join("cells_S00").exists());
}

#[test]
fn test_empty_mask_is_degenerate() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let reader = MockReader::separate(cell_stack(100.0), cell_stack(300.0));
    // excludes both the Donor (100) and the Acceptor (300) cell
    let operator = operator().with_threshold(ThresholdRange::new(150.0, 250.0).unwrap());
    let pipeline = FretPipeline::with_custom(reader, writer.clone(), operator, separate_config(temp.path()));

    assert!(matches!(pipeline.run(), Err(FretError::DegenerateStatistics(_))));
    assert!(writer.written().is_empty());
    assert!(!temp.path().join("donor_cells").exists());
}

#[test]
fn test_cancelled_operator_aborts() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let reader = MockReader::separate(cell_stack(100.0), cell_stack(300.0));
    let pipeline = FretPipeline::with_custom(
        reader,
        writer.clone(),
        CancellingOperator,
        separate_config(temp.path()),
    );

    assert!(matches!(pipeline.run(), Err(FretError::Cancelled(_))));
    assert!(writer.written().is_empty());
    assert!(!temp.path().join("donor_cells").exists());
}

#[test]
fn test_spectral_acquisition() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let reader = MockReader::spectral(4, 2);
    let config = FretConfig::builder()
        .spectral(temp.path().join("Cells.lsm"))
        .background(BackgroundMode::Manual)
        .metric(FretMetric::RatioAcceptorDonor)
        .frame_interval(5.0)
        .preview(true)
        .build()
        .unwrap();
    let operator = operator()
        .with_channels(ChannelPair {
            donor: 1,
            acceptor: 2,
        })
        .with_series(1);
    let pipeline = FretPipeline::with_custom(reader, writer.clone(), operator, config);

    let report = pipeline.run().unwrap();

    let dir = temp.path().join("cells_S01");
    assert_eq!(report.series, Some(1));
    assert_eq!(report.channels, Some(ChannelPair { donor: 1, acceptor: 2 }));
    assert_eq!(
        report.raw_paths,
        Some((dir.join("cells_S01_c1.tif"), dir.join("cells_S01_c2.tif")))
    );
    assert_eq!(
        writer.written(),
        vec![
            dir.join("cells_S01_c1.tif"),
            dir.join("cells_S01_c2.tif"),
            dir.join("FRET_ratioA_D_cells_S01.tif"),
            dir.join("FRET_CalibrationBar.tif"),
        ]
    );
    assert_eq!(
        *writer.rgb.lock().unwrap(),
        vec![dir.join("FRET_ratioA_D_cells_S01_rgb.tif")]
    );

    // channel 2 holds 200 over background, channel 1 holds 100
    assert_eq!(report.statistics.min, 2.0);
    assert_eq!(report.statistics.max, 2.0);

    let fret = writer.stack_at(&report.fret_path).unwrap();
    assert_eq!(fret.calibration().frame_interval, Some(5.0));
    assert_eq!(fret.calibration().time_unit, "min");
}

#[test]
fn test_default_channels_must_exist() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let reader = MockReader::spectral(4, 1);
    let config = FretConfig::builder()
        .spectral(temp.path().join("cells.lsm"))
        .select_channels(false)
        .build()
        .unwrap();
    let pipeline = FretPipeline::with_custom(reader, writer.clone(), operator(), config);

    assert!(matches!(pipeline.run(), Err(FretError::InvalidChannel(_))));
    assert!(writer.written().is_empty());
}

#[test]
fn test_series_out_of_range() {
    let temp = tempfile::tempdir().unwrap();
    let reader = MockReader::spectral(4, 2);
    let config = FretConfig::builder()
        .spectral(temp.path().join("cells.lsm"))
        .build()
        .unwrap();
    let operator = operator().with_series(5);
    let pipeline = FretPipeline::with_custom(reader, MockWriter::default(), operator, config);

    assert!(matches!(
        pipeline.run(),
        Err(FretError::InvalidSeries { index: 5, count: 2 })
    ));
}

#[test]
fn test_bleach_correction_keeps_flat_ratio() {
    let temp = tempfile::tempdir().unwrap();
    let writer = MockWriter::default();
    let reader = MockReader::separate(cell_stack(100.0), cell_stack(300.0));
    let config = FretConfig::builder()
        .separate(temp.path().join("Donor Cells.tif"), temp.path().join("acceptor.tif"))
        .bleach(Some(crate::image_pipeline::preprocess::BleachMethod::SimpleRatio))
        .background(BackgroundMode::Manual)
        .calibration_bar(false)
        .build()
        .unwrap();
    let pipeline = FretPipeline::with_custom(reader, writer.clone(), operator(), config);

    let report = pipeline.run().unwrap();

    assert_eq!(report.calibration_bar_path, None);
    assert_eq!(writer.written(), vec![report.fret_path.clone()]);
    assert!((report.statistics.mean - 75.0).abs() < 1e-3);
}
