//! Error types for the shape-from-shading engine.

use thiserror::Error;

/// Errors that can occur while setting up or running a reconstruction.
///
/// Non-convergence of the optimizer is deliberately absent: it is reported
/// through [`crate::ConvergenceStatus`] on the solution instead.
#[derive(Debug, Error)]
pub enum SfsError {
    /// The configured initial surface is not implemented.
    ///
    /// Only `"flat"` is supported; seeding from a coarse DEM is not.
    #[error("Initial surface '{0}' is not supported (only \"flat\" is implemented)")]
    UnsupportedInitialSurface(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A grid could not be constructed from the given dimensions and data.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Two grids that must share a shape do not.
    #[error("Shape mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    ShapeMismatch {
        /// Expected width in pixels.
        expected_width: usize,
        /// Expected height in pixels.
        expected_height: usize,
        /// Actual width in pixels.
        actual_width: usize,
        /// Actual height in pixels.
        actual_height: usize,
    },
}
