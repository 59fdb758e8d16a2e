use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::render::RgbImage;
use crate::image_pipeline::stack::ImageStack;
use crate::image_pipeline::tiff::types::OutputConfig;

pub trait TiffWriter {
    /// Writes a 32-bit float stack, invalid samples stored as NaN.
    fn write_stack(&self, image: &ImageStack, output: &mut dyn Write, config: &OutputConfig) -> Result<()>;

    fn write_rgb(&self, image: &RgbImage, output: &mut dyn Write, config: &OutputConfig) -> Result<()>;

    fn save_stack(&self, image: &ImageStack, path: &Path, config: &OutputConfig) -> Result<()> {
        let mut file = create_output(path)?;
        self.write_stack(image, &mut file, config)?;
        info!(path = %path.display(), planes = image.planes(), "Saved stack");
        Ok(())
    }

    fn save_rgb(&self, image: &RgbImage, path: &Path, config: &OutputConfig) -> Result<()> {
        let mut file = create_output(path)?;
        self.write_rgb(image, &mut file, config)?;
        info!(path = %path.display(), "Saved RGB preview");
        Ok(())
    }
}

fn create_output(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path)
        .map_err(|e| FretError::OutputWriteError(format!("{}: {}", path.display(), e)))
}
