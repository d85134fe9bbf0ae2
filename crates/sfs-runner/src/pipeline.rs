//! End-to-end reconstruction: load, optimize, scale, export.

use crate::{Result, RunConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfs_core::{
    optimize, pixel_scale_m, predicted_image, scale_to_meters, DemSummary, Grid, LightVector,
    SfsConfig,
};
use sfs_raster::{load_observed_image, write_dem_geotiff, write_dem_obj};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// File name of the exported GeoTIFF DEM.
pub const DEM_TIFF_NAME: &str = "reconstructed_dem.tif";
/// File name of the exported OBJ mesh.
pub const DEM_OBJ_NAME: &str = "reconstructed_dem.obj";
/// File name of the JSON run summary.
pub const SUMMARY_NAME: &str = "summary.json";

/// Paths of the artifacts written by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutputs {
    /// Float GeoTIFF of the DEM in meters.
    pub dem_tiff: PathBuf,
    /// Triangulated OBJ mesh of the DEM.
    pub dem_obj: PathBuf,
    /// This summary as JSON.
    pub summary: PathBuf,
}

/// Report of a completed run, also written as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Input image.
    pub image_path: PathBuf,
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Accepted optimizer steps.
    pub iterations: u64,
    /// Whether the optimizer converged.
    pub converged: bool,
    /// Why the optimizer stopped, when it did not converge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence_warning: Option<String>,
    /// Final energy.
    pub final_cost: f64,
    /// Ground sample distance in meters per pixel.
    pub pixel_scale_m: f64,
    /// Statistics of the scaled DEM in meters.
    pub dem: DemSummary,
    /// Seconds spent loading the image.
    pub load_seconds: f64,
    /// Seconds spent in the optimizer.
    pub optimize_seconds: f64,
    /// Seconds spent writing artifacts.
    pub export_seconds: f64,
    /// Wall-clock time of the whole run.
    pub total_seconds: f64,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
    /// Written artifacts.
    pub outputs: RunOutputs,
}

/// Run one reconstruction and write its artifacts to `config.output_dir`.
///
/// The parameters are validated before anything is read or written. A run
/// that stops without converging still exports its best height field; the
/// summary records the warning.
pub fn run_pipeline(config: &RunConfig) -> Result<RunSummary> {
    config.sfs.validate()?;
    let start = Instant::now();

    info!("Loading image {}", config.image_path.display());
    let image = load_observed_image(&config.image_path)?;
    let (width, height) = image.dimensions();
    let load_seconds = start.elapsed().as_secs_f64();
    info!("Loaded {}x{} image in {:.2}s", width, height, load_seconds);

    let optimize_start = Instant::now();
    let solution = optimize(&image, &config.sfs)?;
    let optimize_seconds = optimize_start.elapsed().as_secs_f64();
    if let Some(warning) = solution.status.warning() {
        warn!("{}", warning);
    }

    let scale = pixel_scale_m(&config.sfs);
    let dem = scale_to_meters(&solution.height_field, &config.sfs);
    let stats = DemSummary::from_grid(&dem);
    info!(
        "DEM at {:.4} m/pixel: min {:.2} m, max {:.2} m, relief {:.2} m",
        scale,
        stats.min,
        stats.max,
        stats.relief()
    );

    let export_start = Instant::now();
    std::fs::create_dir_all(&config.output_dir)?;
    let outputs = RunOutputs {
        dem_tiff: config.output_dir.join(DEM_TIFF_NAME),
        dem_obj: config.output_dir.join(DEM_OBJ_NAME),
        summary: config.output_dir.join(SUMMARY_NAME),
    };
    write_dem_geotiff(
        &outputs.dem_tiff,
        &dem,
        config.georeference.as_ref(),
        config.projection.as_deref(),
    )?;
    write_dem_obj(&outputs.dem_obj, &dem, scale)?;
    let export_seconds = export_start.elapsed().as_secs_f64();

    let summary = RunSummary {
        image_path: config.image_path.clone(),
        width,
        height,
        iterations: solution.iterations,
        converged: solution.status.is_converged(),
        convergence_warning: solution.status.warning().map(|w| w.to_string()),
        final_cost: solution.cost,
        pixel_scale_m: scale,
        dem: stats,
        load_seconds,
        optimize_seconds,
        export_seconds,
        total_seconds: start.elapsed().as_secs_f64(),
        completed_at: Utc::now(),
        outputs,
    };

    let writer = BufWriter::new(File::create(&summary.outputs.summary)?);
    serde_json::to_writer_pretty(writer, &summary)?;
    info!(
        "Wrote DEM, mesh and summary to {} ({:.2}s total)",
        config.output_dir.display(),
        summary.total_seconds
    );

    Ok(summary)
}

/// Render a centered Gaussian bump as seen under the configured sun.
///
/// `amplitude` and `sigma` are in pixels. The result is a brightness image
/// in `[0, 1]` suitable for [`sfs_raster::write_image_u16`].
pub fn render_gaussian_bump(size: usize, amplitude: f64, sigma: f64, config: &SfsConfig) -> Grid {
    let center = (size as f64 - 1.0) / 2.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let surface = Grid::from_fn(size, size, |x, y| {
        let r2 = (x as f64 - center).powi(2) + (y as f64 - center).powi(2);
        amplitude * (-r2 / two_sigma_sq).exp()
    });
    let light = LightVector::from_sun_angles(config.sun_azimuth_deg, config.sun_elevation_deg);
    predicted_image(&surface, &light)
}
