//! Multi-page TIFF reader with ImageJ hyperstack metadata.
//!
//! Plain TIFFs are read as one channel, one slice, one frame per page. When an
//! ImageJ description is present its channel/slice/frame counts define the page
//! order (channel fastest, then slice, then frame).

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::ColorType;
use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, instrument};

use crate::image_pipeline::acquisition::reader::{AcquisitionInfo, AcquisitionReader, ChannelSelection};
use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::stack::{Calibration, ImageStack};
use crate::image_pipeline::tiff::ImageJDescription;

pub struct TiffHyperstackReader;

fn decode_err(e: tiff::TiffError) -> FretError {
    FretError::DecodeError(e.to_string())
}

fn open(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)
        .map_err(|e| FretError::InputReadError(format!("{}: {}", path.display(), e)))?;
    Ok(Decoder::new(BufReader::new(file))
        .map_err(decode_err)?
        .with_limits(Limits::unlimited()))
}

fn resolution<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Option<f64> {
    match decoder.find_tag(tag).ok().flatten()? {
        Value::Rational(n, d) if n > 0 => Some(d as f64 / n as f64),
        _ => None,
    }
}

/// Shape and calibration of a TIFF file.
struct Header {
    info: AcquisitionInfo,
    calibration: Calibration,
}

fn read_header<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Header> {
    let (width, height) = decoder.dimensions().map_err(decode_err)?;
    let bit_depth = match decoder.colortype().map_err(decode_err)? {
        ColorType::Gray(bits) => bits as u32,
        other => {
            return Err(FretError::UnsupportedFormat(format!(
                "only single-sample grayscale TIFFs are supported, found {other:?}"
            )));
        }
    };

    let mut calibration = Calibration::default();
    if let Some(w) = resolution(decoder, Tag::XResolution) {
        calibration.pixel_width = w;
        calibration.pixel_height = resolution(decoder, Tag::YResolution).unwrap_or(w);
    }
    let description = decoder
        .get_tag_ascii_string(Tag::ImageDescription)
        .ok()
        .and_then(|text| ImageJDescription::parse(&text));
    if let Some(desc) = &description {
        desc.apply_to(&mut calibration);
    }

    let mut pages = 1;
    while decoder.more_images() {
        decoder.next_image().map_err(decode_err)?;
        pages += 1;
    }

    let (channels, slices, frames) = match &description {
        Some(d) if d.hyperstack_planes() == Some(pages) => (d.channels, d.slices, d.frames),
        Some(d) => {
            debug!(
                pages,
                described = ?d.hyperstack_planes(),
                "ImageJ dimensions disagree with page count, reading pages as frames"
            );
            (1, 1, pages)
        }
        None => (1, 1, pages),
    };

    Ok(Header {
        info: AcquisitionInfo {
            width: width as usize,
            height: height as usize,
            channels,
            slices,
            frames,
            series: 1,
            bit_depth,
        },
        calibration,
    })
}

fn page_values(result: DecodingResult) -> Result<Vec<f32>> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        _ => {
            return Err(FretError::UnsupportedFormat(
                "TIFF sample format not supported".to_string(),
            ));
        }
    })
}

/// Decodes the pages whose index satisfies `keep`, in file order.
fn read_pages(path: &Path, keep: impl Fn(usize) -> bool) -> Result<(Header, Vec<f32>, usize)> {
    let header = read_header(&mut open(path)?)?;
    let mut decoder = open(path)?;
    let mut values = Vec::new();
    let mut kept = 0;
    let mut index = 0;
    loop {
        if keep(index) {
            values.extend(page_values(decoder.read_image().map_err(decode_err)?)?);
            kept += 1;
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(decode_err)?;
        index += 1;
    }
    Ok((header, values, kept))
}

fn into_stack(header: &Header, values: Vec<f32>, planes: usize) -> Result<ImageStack> {
    let stack = ImageStack::from_values(header.info.width, header.info.height, planes, values)?
        .with_calibration(header.calibration.clone())
        .with_bit_depth(header.info.bit_depth);
    Ok(stack)
}

impl AcquisitionReader for TiffHyperstackReader {
    #[instrument(skip(self, path), fields(path = %path.display()))]
    fn probe(&self, path: &Path) -> Result<AcquisitionInfo> {
        let header = read_header(&mut open(path)?)?;
        debug!(info = ?header.info, "Probed acquisition");
        Ok(header.info)
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    fn read_channel(&self, path: &Path, selection: ChannelSelection) -> Result<ImageStack> {
        let info = self.probe(path)?;
        if selection.series >= info.series {
            return Err(FretError::InvalidSeries {
                index: selection.series,
                count: info.series,
            });
        }
        if selection.channel == 0 || selection.channel > info.channels {
            return Err(FretError::InvalidChannel(format!(
                "channel {} outside 1..={}",
                selection.channel, info.channels
            )));
        }
        if let Some(frame) = selection.frame {
            if frame >= info.frames {
                return Err(FretError::InvalidChannel(format!(
                    "frame {} outside 0..{}",
                    frame, info.frames
                )));
            }
        }

        let channel = selection.channel - 1;
        let per_frame = info.channels * info.slices;
        let (header, values, planes) = read_pages(path, |page| {
            page % info.channels == channel
                && selection.frame.is_none_or(|t| page / per_frame == t)
        })?;
        debug!(planes, "Extracted channel");
        into_stack(&header, values, planes)
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    fn read_stack(&self, path: &Path) -> Result<ImageStack> {
        let (header, values, planes) = read_pages(path, |_| true)?;
        into_stack(&header, values, planes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tiff::encoder::{TiffEncoder, colortype};

    /// Writes `pages` 2x1 u16 pages; page `i` holds `[i, i + 100]`.
    fn write_hyperstack(path: &Path, pages: u16, description: Option<&str>) {
        let mut buffer = Vec::new();
        {
            let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer)).unwrap();
            for i in 0..pages {
                let mut image = encoder.new_image::<colortype::Gray16>(2, 1).unwrap();
                if i == 0 {
                    if let Some(text) = description {
                        image.encoder().write_tag(Tag::ImageDescription, text).unwrap();
                    }
                }
                image.write_data(&[i, i + 100]).unwrap();
            }
        }
        File::create(path).unwrap().write_all(&buffer).unwrap();
    }

    #[test]
    fn probes_imagej_hyperstack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectral.tif");
        write_hyperstack(&path, 12, Some("ImageJ=1.54f\nimages=12\nchannels=4\nframes=3\n"));

        let info = TiffHyperstackReader.probe(&path).unwrap();
        assert_eq!((info.channels, info.slices, info.frames), (4, 1, 3));
        assert_eq!((info.width, info.height, info.bit_depth), (2, 1, 16));
    }

    #[test]
    fn extracts_one_channel_across_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectral.tif");
        write_hyperstack(&path, 12, Some("ImageJ=1.54f\nimages=12\nchannels=4\nframes=3\n"));

        let selection = ChannelSelection {
            channel: 2,
            series: 0,
            frame: None,
        };
        let stack = TiffHyperstackReader.read_channel(&path, selection).unwrap();
        assert_eq!(stack.dims(), (2, 1, 3));
        // pages 1, 5, 9
        assert_eq!(stack.plane(0), &[Some(1.0), Some(101.0)]);
        assert_eq!(stack.plane(2), &[Some(9.0), Some(109.0)]);
        assert_eq!(stack.bit_depth(), 16);

        let single = TiffHyperstackReader
            .read_channel(&path, ChannelSelection { frame: Some(1), ..selection })
            .unwrap();
        assert_eq!(single.dims(), (2, 1, 1));
        assert_eq!(single.plane(0), &[Some(5.0), Some(105.0)]);
    }

    #[test]
    fn rejects_out_of_range_channel_and_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectral.tif");
        write_hyperstack(&path, 4, Some("ImageJ=1.54f\nimages=4\nchannels=4\n"));

        let bad_channel = ChannelSelection {
            channel: 5,
            series: 0,
            frame: None,
        };
        assert!(matches!(
            TiffHyperstackReader.read_channel(&path, bad_channel),
            Err(FretError::InvalidChannel(_))
        ));
        let bad_series = ChannelSelection {
            channel: 1,
            series: 1,
            frame: None,
        };
        assert!(matches!(
            TiffHyperstackReader.read_channel(&path, bad_series),
            Err(FretError::InvalidSeries { index: 1, count: 1 })
        ));
    }

    #[test]
    fn plain_tiff_pages_are_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("donor.tif");
        write_hyperstack(&path, 3, None);

        let stack = TiffHyperstackReader.read_stack(&path).unwrap();
        assert_eq!(stack.dims(), (2, 1, 3));
        let info = TiffHyperstackReader.probe(&path).unwrap();
        assert_eq!((info.channels, info.frames), (1, 3));
    }

    #[test]
    fn overflowing_description_reads_pages_as_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crafted.tif");
        let text = format!("ImageJ=1.54f\nchannels={}\nframes=2\n", usize::MAX);
        write_hyperstack(&path, 3, Some(&text));

        let info = TiffHyperstackReader.probe(&path).unwrap();
        assert_eq!((info.channels, info.slices, info.frames), (1, 1, 3));
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let result = TiffHyperstackReader.read_stack(Path::new("/nonexistent/donor.tif"));
        assert!(matches!(result, Err(FretError::InputReadError(_))));
    }
}
