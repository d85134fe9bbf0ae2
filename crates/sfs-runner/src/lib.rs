//! # sfs-runner
//!
//! Batch entry point for shape-from-shading reconstructions. A run is
//! described by a YAML file naming the input image, the output directory
//! and the [`SfsConfig`](sfs_core::SfsConfig) parameters; the pipeline
//! loads the image, optimizes a height field, scales it to meters and
//! writes a GeoTIFF, an OBJ mesh and a JSON summary.
//!
//! ## Example configuration
//!
//! ```yaml
//! image_path: data/moon1.png
//! output_dir: output
//! sun_azimuth_deg: 101.55451
//! sun_elevation_deg: 34.802249
//! spacecraft_altitude_km: 95.85
//! focal_length_mm: 140.0
//! regularization_lambda: 0.005
//! max_iterations: 150
//! ```

mod config;
mod pipeline;

pub use config::{default_config_yaml, load_config, RunConfig, DEFAULT_OUTPUT_DIR};
pub use pipeline::{
    render_gaussian_bump, run_pipeline, RunOutputs, RunSummary, DEM_OBJ_NAME, DEM_TIFF_NAME,
    SUMMARY_NAME,
};

use thiserror::Error;

/// Errors that can occur while running a reconstruction.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// I/O error reading the config or writing outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid YAML for a run.
    #[error("Invalid run config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Summary serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reconstruction failed.
    #[error(transparent)]
    Sfs(#[from] sfs_core::SfsError),

    /// Image loading or DEM export failed.
    #[error(transparent)]
    Raster(#[from] sfs_raster::RasterError),
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
