//! TIFF output configuration types

use clap::ValueEnum;

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TiffCompression {
    /// No compression (default, readable everywhere)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

impl TiffCompression {
    pub(crate) fn to_tiff(self) -> tiff::encoder::Compression {
        use tiff::encoder::Compression;
        use tiff::encoder::compression::DeflateLevel;
        match self {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        }
    }
}

/// Configuration for writing result files
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Compression method to use
    pub compression: TiffCompression,
    /// Embed ImageJ hyperstack metadata (display range, calibration) in the description tag
    pub imagej_metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            imagej_metadata: true,
        }
    }
}
