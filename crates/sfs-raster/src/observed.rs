//! Observed image loading.

use crate::{RasterError, Result};
use image::{DynamicImage, ImageReader};
use sfs_core::{Grid, ObservedImage};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::ColorType;
use tracing::debug;

/// Rec. 601 luma weights for collapsing RGB to brightness.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Classic and BigTIFF signatures, little and big endian.
const TIFF_SIGNATURES: [[u8; 4]; 4] = [
    *b"II*\0",
    *b"MM\0*",
    *b"II+\0",
    *b"MM\0+",
];

/// Load an image as normalized brightness in `[0, 1]`.
///
/// TIFF files (including float and 16-bit mission frames) are decoded with
/// `tiff`; other formats (PNG, JPEG) go through `image`, detected from the
/// file contents rather than the extension.
///
/// Integer samples are divided by the largest value of their type; float
/// samples are used as stored. Color images are reduced to luma and alpha
/// channels are ignored. Every value is finally clamped to `[0, 1]`.
pub fn load_observed_image<P: AsRef<Path>>(path: P) -> Result<ObservedImage> {
    let path = path.as_ref();
    if is_tiff(path)? {
        load_tiff(path)
    } else {
        load_with_image(path)
    }
}

fn is_tiff(path: &Path) -> Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    let mut read = 0;
    while read < magic.len() {
        match file.read(&mut magic[read..])? {
            0 => return Ok(false),
            n => read += n,
        }
    }
    Ok(TIFF_SIGNATURES.contains(&magic))
}

fn load_tiff(path: &Path) -> Result<ObservedImage> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(file)?;

    // Mission frames can exceed the default decoder limits
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    let (width, height) = decoder.dimensions()?;
    let color_type = decoder.colortype()?;
    let channels = channel_count(color_type)?;

    let samples = decode_normalized(&mut decoder)?;
    if samples.len() != width as usize * height as usize * channels {
        return Err(RasterError::InvalidDimensions {
            width,
            height,
            channels,
            samples: samples.len(),
        });
    }

    let data: Vec<f64> = samples
        .chunks_exact(channels)
        .map(|pixel| brightness(pixel).clamp(0.0, 1.0))
        .collect();

    debug!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        width,
        height,
        color_type
    );

    Ok(Grid::new(width as usize, height as usize, data)?)
}

fn load_with_image(path: &Path) -> Result<ObservedImage> {
    let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let (width, height) = (decoded.width(), decoded.height());
    let color = decoded.color();

    let data: Vec<f64> = match decoded {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLumaA8(_) => decoded
            .to_luma8()
            .into_raw()
            .into_iter()
            .map(|v| v as f64 / u8::MAX as f64)
            .collect(),
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => decoded
            .to_luma16()
            .into_raw()
            .into_iter()
            .map(|v| v as f64 / u16::MAX as f64)
            .collect(),
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            rgb_brightness(decoded.to_rgb8().into_raw(), u8::MAX as f64)
        }
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgba16(_) => {
            rgb_brightness(decoded.to_rgb16().into_raw(), u16::MAX as f64)
        }
        _ => rgb_brightness(decoded.to_rgb32f().into_raw(), 1.0),
    };
    let data = data.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();

    debug!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        width,
        height,
        color
    );

    Ok(Grid::new(width as usize, height as usize, data)?)
}

/// Luma of interleaved RGB samples scaled by `max`.
fn rgb_brightness<T: Into<f64> + Copy>(samples: Vec<T>, max: f64) -> Vec<f64> {
    samples
        .chunks_exact(3)
        .map(|px| brightness(&[px[0].into() / max, px[1].into() / max, px[2].into() / max]))
        .collect()
}

/// Write a brightness grid as a 16-bit grayscale TIFF.
///
/// Values are clamped to `[0, 1]` and quantized to the full `u16` range,
/// the inverse of [`load_observed_image`] up to quantization.
pub fn write_image_u16<P: AsRef<Path>>(path: P, image: &Grid) -> Result<()> {
    let (width, height) = image.dimensions();
    let data: Vec<u16> = image
        .as_slice()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * u16::MAX as f64).round() as u16)
        .collect();

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(file)?;
    encoder.write_image::<colortype::Gray16>(width as u32, height as u32, &data)?;
    Ok(())
}

/// Samples per pixel for the color types that can be reduced to brightness.
fn channel_count(color_type: ColorType) -> Result<usize> {
    match color_type {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) => Ok(4),
        other => Err(RasterError::UnsupportedColorType(format!("{:?}", other))),
    }
}

/// Brightness of one pixel's samples.
fn brightness(pixel: &[f64]) -> f64 {
    match pixel.len() {
        1 | 2 => pixel[0],
        _ => {
            LUMA_WEIGHTS[0] * pixel[0] + LUMA_WEIGHTS[1] * pixel[1] + LUMA_WEIGHTS[2] * pixel[2]
        }
    }
}

/// Decode all samples, scaling integer types to `[0, 1]`.
fn decode_normalized<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Vec<f64>> {
    let result = decoder.read_image()?;

    let data = match result {
        DecodingResult::F32(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F64(data) => data,
        DecodingResult::U8(data) => normalize(data, u8::MAX as f64),
        DecodingResult::U16(data) => normalize(data, u16::MAX as f64),
        DecodingResult::U32(data) => normalize(data, u32::MAX as f64),
        DecodingResult::U64(data) => data
            .into_iter()
            .map(|v| v as f64 / u64::MAX as f64)
            .collect(),
        DecodingResult::I8(data) => normalize(data, i8::MAX as f64),
        DecodingResult::I16(data) => normalize(data, i16::MAX as f64),
        DecodingResult::I32(data) => normalize(data, i32::MAX as f64),
        DecodingResult::I64(data) => data
            .into_iter()
            .map(|v| v as f64 / i64::MAX as f64)
            .collect(),
    };
    Ok(data)
}

fn normalize<T: Into<f64>>(data: Vec<T>, max: f64) -> Vec<f64> {
    data.into_iter().map(|v| v.into() / max).collect()
}
