use thiserror::Error;

#[derive(Error, Debug)]
pub enum FretError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode TIFF image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Donor/Acceptor dimension mismatch: donor={donor:?}, acceptor={acceptor:?}")]
    DimensionMismatch {
        donor: (usize, usize, usize),
        acceptor: (usize, usize, usize),
    },

    #[error("Invalid threshold range: [{0}, {1}]")]
    InvalidThreshold(f64, f64),

    #[error("Invalid ROI: {0}")]
    InvalidRoi(String),

    #[error("A background ROI is required but none was selected")]
    MissingRoi,

    #[error("Invalid channel selection: {0}")]
    InvalidChannel(String),

    #[error("Invalid series index {index} (acquisition has {count} series)")]
    InvalidSeries { index: usize, count: usize },

    #[error("Statistics undefined: every pixel of {0} is masked")]
    DegenerateStatistics(String),

    #[error("Bleach correction failed: {0}")]
    BleachCorrection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Operator cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FretError>;
