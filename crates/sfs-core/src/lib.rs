//! # sfs-core
//!
//! Shape-from-shading (photoclinometry) engine: recovers a height field from
//! a single image of an illuminated surface by minimizing the mismatch between
//! the observed brightness and a Lambertian rendering of the height field,
//! plus a curvature penalty.
//!
//! ## Features
//!
//! - **Illumination Geometry**: Sun azimuth/elevation to a unit light vector
//! - **Image Formation**: Finite-difference surface normals and Lambertian shading
//! - **Energy**: Brightness + smoothness cost with its exact analytic gradient
//! - **Optimization**: L-BFGS (via `argmin`) with iteration observers and
//!   non-fatal convergence reporting
//! - **Physical Scaling**: Pinhole ground-sample distance, meters, zero-mean DEM
//!
//! ## Example
//!
//! ```
//! use sfs_core::{optimize, predicted_image, scale_to_meters, DemSummary, Grid, LightVector, SfsConfig};
//!
//! let config = SfsConfig {
//!     sun_azimuth_deg: 0.0,
//!     sun_elevation_deg: 45.0,
//!     max_iterations: 30,
//!     ..SfsConfig::default()
//! };
//!
//! // Render a synthetic scene to stand in for a real image
//! let light = LightVector::from_sun_angles(config.sun_azimuth_deg, config.sun_elevation_deg);
//! let truth = Grid::from_fn(8, 8, |x, y| {
//!     let r2 = (x as f64 - 3.5).powi(2) + (y as f64 - 3.5).powi(2);
//!     (-r2 / 4.5).exp()
//! });
//! let observed = predicted_image(&truth, &light);
//!
//! let solution = optimize(&observed, &config)?;
//! if let Some(warning) = solution.status.warning() {
//!     println!("{}", warning);
//! }
//!
//! let dem = scale_to_meters(&solution.height_field, &config);
//! let summary = DemSummary::from_grid(&dem);
//! println!("Height range: {:.2} m to {:.2} m", summary.min, summary.max);
//! # Ok::<(), sfs_core::SfsError>(())
//! ```

mod config;
mod energy;
mod error;
mod grid;
mod illumination;
pub mod metric_defs;
mod normals;
mod optimize;
mod reflectance;
mod scale;
mod stencil;

pub use config::{
    InitialSurface, SfsConfig, DEFAULT_DETECTOR_PIXEL_WIDTH_UM, DEFAULT_INITIAL_SURFACE,
    DEFAULT_MAX_ITERATIONS, DEFAULT_REGULARIZATION_LAMBDA,
};
pub use energy::{cost_and_gradient, Energy, DENOM_EPSILON};
pub use error::SfsError;
pub use grid::{Grid, HeightField, ObservedImage};
pub use illumination::{light_vector, LightVector};
pub use metric_defs::describe_metrics;
pub use normals::{slopes, surface_normals, NormalField, Slopes, NORMAL_EPSILON};
pub use optimize::{
    initial_height_field, optimize, optimize_with_observer, ConvergenceStatus,
    ConvergenceWarning, IterationCounter, IterationObserver, ProgressLogger, SfsSolution,
    COST_TOLERANCE, GRADIENT_TOLERANCE, LBFGS_MEMORY,
};
pub use reflectance::predicted_image;
pub use scale::{pixel_scale_m, scale_to_meters, DemSummary};

/// Result type for shape-from-shading operations.
pub type Result<T> = std::result::Result<T, SfsError>;
