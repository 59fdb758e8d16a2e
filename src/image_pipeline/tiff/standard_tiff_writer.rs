use std::io::{Cursor, Write};

use tiff::encoder::{Rational, TiffEncoder, colortype};
use tiff::tags::{ResolutionUnit, Tag};
use tracing::debug;

use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::render::RgbImage;
use crate::image_pipeline::stack::ImageStack;
use crate::image_pipeline::tiff::imagej::ImageJDescription;
use crate::image_pipeline::tiff::types::OutputConfig;
use crate::image_pipeline::tiff::writer::TiffWriter;

/// Resolution tags are stored as pixels per unit with this denominator.
const RESOLUTION_SCALE: f64 = 1_000_000.0;

pub struct StandardTiffWriter;

fn encode_err(e: tiff::TiffError) -> FretError {
    FretError::EncodeError(e.to_string())
}

fn pixels_per_unit(pixel_size: f64) -> Rational {
    let size = if pixel_size > 0.0 { pixel_size } else { 1.0 };
    Rational {
        n: RESOLUTION_SCALE as u32,
        d: ((size * RESOLUTION_SCALE).round() as u32).max(1),
    }
}

impl TiffWriter for StandardTiffWriter {
    fn write_stack(&self, image: &ImageStack, output: &mut dyn Write, config: &OutputConfig) -> Result<()> {
        let (width, height, planes) = image.dims();
        debug!("Encoding float TIFF stack: {}x{}x{}", width, height, planes);

        let mut buffer = Vec::new();
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(encode_err)?
            .with_compression(config.compression.to_tiff());

        let description = config
            .imagej_metadata
            .then(|| ImageJDescription::for_stack(image).format());
        let cal = image.calibration();

        for p in 0..planes {
            let data: Vec<f32> = image.plane(p).iter().map(|s| s.unwrap_or(f32::NAN)).collect();
            let mut page = encoder
                .new_image::<colortype::Gray32Float>(width as u32, height as u32)
                .map_err(encode_err)?;
            if p == 0 {
                if let Some(text) = &description {
                    page.encoder()
                        .write_tag(Tag::ImageDescription, text.as_str())
                        .map_err(encode_err)?;
                }
                page.resolution_unit(ResolutionUnit::None);
                page.x_resolution(pixels_per_unit(cal.pixel_width));
                page.y_resolution(pixels_per_unit(cal.pixel_height));
            }
            page.write_data(&data).map_err(encode_err)?;
        }

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }

    fn write_rgb(&self, image: &RgbImage, output: &mut dyn Write, config: &OutputConfig) -> Result<()> {
        debug!("Encoding RGB TIFF: {}x{}x{}", image.width, image.height, image.planes);

        let mut buffer = Vec::new();
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(encode_err)?
            .with_compression(config.compression.to_tiff());

        let plane_len = image.width * image.height * 3;
        for plane in image.data.chunks_exact(plane_len) {
            encoder
                .write_image::<colortype::RGB8>(image.width as u32, image.height as u32, plane)
                .map_err(encode_err)?;
        }

        output.write_all(&buffer)?;
        Ok(())
    }
}
