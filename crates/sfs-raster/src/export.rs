//! DEM export as GeoTIFF and Wavefront OBJ.

use crate::{RasterError, Result};
use sfs_core::Grid;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// Image corner coordinates used to georeference an exported DEM.
///
/// Corners refer to the outer edges of the corner pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Georeference {
    /// Top-left corner.
    pub upper_left: GeoPoint,
    /// Top-right corner.
    pub upper_right: GeoPoint,
    /// Bottom-left corner.
    pub lower_left: GeoPoint,
    /// Bottom-right corner.
    pub lower_right: GeoPoint,
}

impl Georeference {
    /// Degrees per pixel `(lon, lat)` as a north-up affine approximation.
    ///
    /// Edge lengths are averaged over opposite sides, so a slightly skewed
    /// footprint maps to its mean pixel size. The latitude scale follows the
    /// GeoTIFF sign convention: positive when latitude decreases down the image.
    pub fn pixel_scale(&self, width: usize, height: usize) -> Result<(f64, f64)> {
        let lon_span = ((self.upper_right.lon - self.upper_left.lon)
            + (self.lower_right.lon - self.lower_left.lon))
            / 2.0;
        let lat_span = ((self.upper_left.lat - self.lower_left.lat)
            + (self.upper_right.lat - self.lower_right.lat))
            / 2.0;
        let scale_x = lon_span / width as f64;
        let scale_y = lat_span / height as f64;
        if scale_x == 0.0 || scale_y == 0.0 || !scale_x.is_finite() || !scale_y.is_finite() {
            return Err(RasterError::InvalidGeoreference(format!(
                "pixel scale ({}, {}) from corners {:?}",
                scale_x, scale_y, self
            )));
        }
        Ok((scale_x, scale_y))
    }
}

/// Write a DEM as a single-band 32-bit float TIFF.
///
/// With a georeference, ModelTiepoint (pixel (0,0) at the upper-left corner),
/// ModelPixelScale and a geographic GeoKeyDirectory are added so GIS tools
/// can place the raster. `projection` is stored as the image description.
pub fn write_dem_geotiff<P: AsRef<Path>>(
    path: P,
    dem: &Grid,
    georeference: Option<&Georeference>,
    projection: Option<&str>,
) -> Result<()> {
    let path = path.as_ref();
    let (width, height) = dem.dimensions();
    let data: Vec<f32> = dem.as_slice().iter().map(|&v| v as f32).collect();

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(file)?;
    let mut image = encoder.new_image::<colortype::Gray32Float>(width as u32, height as u32)?;

    if let Some(georeference) = georeference {
        let (scale_x, scale_y) = georeference.pixel_scale(width, height)?;
        let origin = georeference.upper_left;
        let pixel_scale = [scale_x, scale_y, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, origin.lon, origin.lat, 0.0];
        // Version 1.1.0, two keys: GTModelType = Geographic, GTRasterType = PixelIsArea
        let geo_keys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 2, 1025, 0, 1, 1];

        let dir = image.encoder();
        dir.write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;
        dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
        dir.write_tag(Tag::GeoKeyDirectoryTag, &geo_keys[..])?;
    }
    if let Some(projection) = projection {
        image.encoder().write_tag(Tag::ImageDescription, projection)?;
    }

    image.write_data(&data)?;
    debug!("Wrote {}x{} DEM to {}", width, height, path.display());
    Ok(())
}

/// Write a DEM as a triangulated Wavefront OBJ surface.
///
/// One vertex per pixel at `(x * pixel_scale_m, y * pixel_scale_m, z)`, so the
/// mesh shares the East/North/Up frame of the reconstruction, and two
/// triangles per grid cell.
pub fn write_dem_obj<P: AsRef<Path>>(path: P, dem: &Grid, pixel_scale_m: f64) -> Result<()> {
    let path = path.as_ref();
    let (width, height) = dem.dimensions();
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "# Reconstructed DEM, {}x{} pixels", width, height)?;
    for y in 0..height {
        for x in 0..width {
            writeln!(
                out,
                "v {:.6} {:.6} {:.6}",
                x as f64 * pixel_scale_m,
                y as f64 * pixel_scale_m,
                dem.get(x, y)
            )?;
        }
    }

    // OBJ indices are 1-based
    for y in 0..height.saturating_sub(1) {
        for x in 0..width.saturating_sub(1) {
            let i = y * width + x + 1;
            writeln!(out, "f {} {} {}", i, i + 1, i + width + 1)?;
            writeln!(out, "f {} {} {}", i, i + width + 1, i + width)?;
        }
    }

    out.flush()?;
    debug!("Wrote OBJ mesh to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners() -> Georeference {
        Georeference {
            upper_left: GeoPoint { lat: 10.0, lon: 100.0 },
            upper_right: GeoPoint { lat: 10.0, lon: 102.0 },
            lower_left: GeoPoint { lat: 9.0, lon: 100.0 },
            lower_right: GeoPoint { lat: 9.0, lon: 102.0 },
        }
    }

    #[test]
    fn test_pixel_scale_north_up() {
        let (sx, sy) = corners().pixel_scale(200, 50).unwrap();
        assert!((sx - 0.01).abs() < 1e-12);
        assert!((sy - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_pixel_scale_rejects_degenerate_corners() {
        let mut georeference = corners();
        georeference.upper_right.lon = 100.0;
        georeference.lower_right.lon = 100.0;
        assert!(matches!(
            georeference.pixel_scale(10, 10),
            Err(RasterError::InvalidGeoreference(_))
        ));
    }
}
