//! # sfs-raster
//!
//! Raster I/O around the shape-from-shading engine:
//! - Load an observed image (TIFF, PNG or JPEG) as normalized brightness
//! - Export a reconstructed DEM as a georeferenced float GeoTIFF
//! - Export a reconstructed DEM as a triangulated OBJ mesh
//!
//! ## Example
//!
//! ```no_run
//! use sfs_core::{optimize, pixel_scale_m, scale_to_meters, SfsConfig};
//! use sfs_raster::{load_observed_image, write_dem_geotiff, write_dem_obj};
//!
//! let config = SfsConfig::default();
//! let image = load_observed_image("data/moon1.png")?;
//! let solution = optimize(&image, &config)?;
//! let dem = scale_to_meters(&solution.height_field, &config);
//!
//! write_dem_geotiff("output/reconstructed_dem.tif", &dem, None, None)?;
//! write_dem_obj("output/reconstructed_dem.obj", &dem, pixel_scale_m(&config))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod export;
mod observed;

pub use error::RasterError;
pub use export::{write_dem_geotiff, write_dem_obj, GeoPoint, Georeference};
pub use observed::{load_observed_image, write_image_u16};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
