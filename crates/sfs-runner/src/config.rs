//! Run configuration files.

use crate::Result;
use serde::{Deserialize, Serialize};
use sfs_core::SfsConfig;
use sfs_raster::Georeference;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output directory used when a config omits one.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// One reconstruction job.
///
/// The reconstruction parameters sit at the top level of the YAML document
/// next to the paths. Relative paths are resolved against the working
/// directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Input image (TIFF, PNG or JPEG).
    pub image_path: PathBuf,

    /// Directory receiving the DEM, mesh and summary.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Reconstruction parameters.
    #[serde(flatten)]
    pub sfs: SfsConfig,

    /// Image corner coordinates for georeferencing the DEM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub georeference: Option<Georeference>,

    /// Projection label stored with the DEM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl RunConfig {
    /// Config for `image_path` with reference parameters and the default
    /// output directory.
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            output_dir: default_output_dir(),
            sfs: SfsConfig::default(),
            georeference: None,
            projection: None,
        }
    }
}

/// Load a run config from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let config: RunConfig = serde_yaml::from_str(&contents)?;
    debug!("Loaded run config from {}", path.display());
    Ok(config)
}

/// YAML template with every field at its reference value.
pub fn default_config_yaml() -> Result<String> {
    let template = RunConfig::new("data/moon1.png");
    Ok(serde_yaml::to_string(&template)?)
}
