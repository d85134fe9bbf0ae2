//! Reconstruction parameters.

use crate::{Result, SfsError};
use std::fmt;
use std::str::FromStr;

/// Default smoothness weight.
pub const DEFAULT_REGULARIZATION_LAMBDA: f64 = 5e-3;
/// Default optimizer iteration cap.
pub const DEFAULT_MAX_ITERATIONS: u64 = 150;
/// Default detector pixel pitch in micrometers.
pub const DEFAULT_DETECTOR_PIXEL_WIDTH_UM: f64 = 7.0;
/// Default initial surface.
pub const DEFAULT_INITIAL_SURFACE: &str = "flat";

// ============================================================================
// Initial Surface
// ============================================================================

/// Starting height field for the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialSurface {
    /// Zero height everywhere.
    Flat,
}

impl FromStr for InitialSurface {
    type Err = SfsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flat" => Ok(InitialSurface::Flat),
            other => Err(SfsError::UnsupportedInitialSurface(other.to_string())),
        }
    }
}

impl fmt::Display for InitialSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialSurface::Flat => write!(f, "flat"),
        }
    }
}

// ============================================================================
// SFS Configuration
// ============================================================================

/// Parameters for one shape-from-shading run.
///
/// Illumination and camera geometry have no sensible defaults and are
/// required when deserializing; the algorithm parameters fall back to the
/// reference values.
///
/// # Example
///
/// ```
/// use sfs_core::SfsConfig;
///
/// let config = SfsConfig {
///     sun_azimuth_deg: 0.0,
///     sun_elevation_deg: 45.0,
///     ..SfsConfig::default()
/// };
/// assert_eq!(config.max_iterations, 150);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SfsConfig {
    /// Sun azimuth, degrees clockwise from North.
    pub sun_azimuth_deg: f64,
    /// Sun elevation above the horizon in degrees.
    pub sun_elevation_deg: f64,
    /// Initial surface name. Only `"flat"` is implemented.
    #[cfg_attr(feature = "serde", serde(default = "default_initial_surface"))]
    pub initial_surface: String,
    /// Weight of the smoothness (Laplacian) term.
    #[cfg_attr(feature = "serde", serde(default = "default_regularization_lambda"))]
    pub regularization_lambda: f64,
    /// Maximum number of optimizer iterations.
    #[cfg_attr(feature = "serde", serde(default = "default_max_iterations"))]
    pub max_iterations: u64,
    /// Spacecraft altitude above the surface in kilometers.
    pub spacecraft_altitude_km: f64,
    /// Camera focal length in millimeters.
    pub focal_length_mm: f64,
    /// Detector pixel pitch in micrometers.
    #[cfg_attr(feature = "serde", serde(default = "default_detector_pixel_width_um"))]
    pub detector_pixel_width_um: f64,
}

#[cfg(feature = "serde")]
fn default_initial_surface() -> String {
    DEFAULT_INITIAL_SURFACE.to_string()
}

#[cfg(feature = "serde")]
fn default_regularization_lambda() -> f64 {
    DEFAULT_REGULARIZATION_LAMBDA
}

#[cfg(feature = "serde")]
fn default_max_iterations() -> u64 {
    DEFAULT_MAX_ITERATIONS
}

#[cfg(feature = "serde")]
fn default_detector_pixel_width_um() -> f64 {
    DEFAULT_DETECTOR_PIXEL_WIDTH_UM
}

impl Default for SfsConfig {
    fn default() -> Self {
        Self {
            // Reference lunar scene
            sun_azimuth_deg: 101.554510,
            sun_elevation_deg: 34.802249,

            initial_surface: DEFAULT_INITIAL_SURFACE.to_string(),
            regularization_lambda: DEFAULT_REGULARIZATION_LAMBDA,
            max_iterations: DEFAULT_MAX_ITERATIONS,

            spacecraft_altitude_km: 95.85,
            focal_length_mm: 140.0,
            detector_pixel_width_um: DEFAULT_DETECTOR_PIXEL_WIDTH_UM,
        }
    }
}

impl SfsConfig {
    /// Parse the configured initial surface.
    pub fn initial_surface(&self) -> Result<InitialSurface> {
        self.initial_surface.parse()
    }

    /// Check that every parameter is usable.
    ///
    /// The initial surface is checked first so that an unsupported surface
    /// is always reported as such.
    pub fn validate(&self) -> Result<()> {
        self.initial_surface()?;

        if !self.sun_azimuth_deg.is_finite() || !self.sun_elevation_deg.is_finite() {
            return Err(SfsError::InvalidConfig(format!(
                "sun angles must be finite (azimuth={}, elevation={})",
                self.sun_azimuth_deg, self.sun_elevation_deg
            )));
        }
        if !(self.regularization_lambda >= 0.0 && self.regularization_lambda.is_finite()) {
            return Err(SfsError::InvalidConfig(format!(
                "regularization_lambda must be a finite non-negative number, got {}",
                self.regularization_lambda
            )));
        }
        for (name, value) in [
            ("spacecraft_altitude_km", self.spacecraft_altitude_km),
            ("focal_length_mm", self.focal_length_mm),
            ("detector_pixel_width_um", self.detector_pixel_width_um),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SfsError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SfsConfig::default();
        assert_eq!(config.initial_surface, "flat");
        assert_eq!(config.regularization_lambda, 5e-3);
        assert_eq!(config.max_iterations, 150);
        assert_eq!(config.detector_pixel_width_um, 7.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_initial_surface_parse() {
        assert_eq!("flat".parse::<InitialSurface>().unwrap(), InitialSurface::Flat);
        assert!(matches!(
            "bumpy".parse::<InitialSurface>(),
            Err(SfsError::UnsupportedInitialSurface(s)) if s == "bumpy"
        ));
        assert_eq!(InitialSurface::Flat.to_string(), "flat");
    }

    #[test]
    fn test_validate_reports_unsupported_surface_first() {
        let config = SfsConfig {
            initial_surface: "coarse_dem".to_string(),
            focal_length_mm: 0.0,
            ..SfsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SfsError::UnsupportedInitialSurface(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_geometry() {
        let config = SfsConfig {
            focal_length_mm: 0.0,
            ..SfsConfig::default()
        };
        assert!(matches!(config.validate(), Err(SfsError::InvalidConfig(_))));

        let config = SfsConfig {
            regularization_lambda: -1.0,
            ..SfsConfig::default()
        };
        assert!(matches!(config.validate(), Err(SfsError::InvalidConfig(_))));

        let config = SfsConfig {
            sun_elevation_deg: f64::NAN,
            ..SfsConfig::default()
        };
        assert!(matches!(config.validate(), Err(SfsError::InvalidConfig(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_yaml_applies_defaults() {
        let yaml = "
sun_azimuth_deg: 0.0
sun_elevation_deg: 45.0
spacecraft_altitude_km: 95.85
focal_length_mm: 140.0
";
        let config: SfsConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.initial_surface, "flat");
        assert_eq!(config.regularization_lambda, 5e-3);
        assert_eq!(config.max_iterations, 150);
        assert_eq!(config.detector_pixel_width_um, 7.0);
        assert_eq!(config.sun_elevation_deg, 45.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_yaml_requires_geometry() {
        let yaml = "sun_azimuth_deg: 0.0\nsun_elevation_deg: 45.0\n";
        assert!(serde_yaml::from_str::<SfsConfig>(yaml).is_err());
    }
}
