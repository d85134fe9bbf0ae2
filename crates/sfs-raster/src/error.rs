//! Error types for the raster crate.

use thiserror::Error;

/// Errors that can occur when reading images or writing DEM artifacts.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF encoding or decoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// PNG/JPEG decoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The image's color layout cannot be reduced to a single brightness.
    #[error("Unsupported TIFF color type: {0}")]
    UnsupportedColorType(String),

    /// Decoded sample count does not match the image dimensions.
    #[error("Image is {width}x{height} with {channels} channel(s) but decoded {samples} samples")]
    InvalidDimensions {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Samples per pixel.
        channels: usize,
        /// Samples actually decoded.
        samples: usize,
    },

    /// Georeference corners are degenerate (zero pixel size).
    #[error("Invalid georeference: {0}")]
    InvalidGeoreference(String),

    /// Grid construction failed.
    #[error(transparent)]
    Grid(#[from] sfs_core::SfsError),
}
