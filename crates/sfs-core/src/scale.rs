//! Conversion of the dimensionless height field to meters.

use crate::{Grid, HeightField, SfsConfig};
use statrs::statistics::Statistics;

/// Ground sample distance in meters per pixel (pinhole camera model).
///
/// `pixel pitch * altitude / focal length`, with each input converted to
/// meters.
pub fn pixel_scale_m(config: &SfsConfig) -> f64 {
    (config.detector_pixel_width_um * 1e-6) * (config.spacecraft_altitude_km * 1000.0)
        / (config.focal_length_mm * 1e-3)
}

/// Scale a relative height field to meters and center it on zero.
///
/// Shape-from-shading only recovers relative shape, so the absolute height
/// is fixed by making the mean elevation zero.
pub fn scale_to_meters(dem: &HeightField, config: &SfsConfig) -> HeightField {
    let scale = pixel_scale_m(config);
    let scaled = dem.map(|v| v * scale);
    let mean = scaled.mean();
    scaled.map(|v| v - mean)
}

/// Summary statistics of a DEM, as reported alongside exported artifacts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DemSummary {
    /// Lowest elevation.
    pub min: f64,
    /// Highest elevation.
    pub max: f64,
    /// Mean elevation.
    pub mean: f64,
    /// Population standard deviation of elevation.
    pub std_dev: f64,
}

impl DemSummary {
    /// Compute statistics over every sample of `dem`.
    pub fn from_grid(dem: &Grid) -> Self {
        let data = dem.as_slice();
        Self {
            min: Statistics::min(data),
            max: Statistics::max(data),
            mean: Statistics::mean(data),
            std_dev: Statistics::population_std_dev(data),
        }
    }

    /// Height range, `max - min`.
    pub fn relief(&self) -> f64 {
        self.max - self.min
    }
}
