//! `sfs` - shape-from-shading DEM reconstruction from a single image.

use clap::{Parser, Subcommand};
use sfs_core::{describe_metrics, SfsConfig};
use sfs_raster::write_image_u16;
use sfs_runner::{default_config_yaml, load_config, render_gaussian_bump, run_pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sfs")]
#[command(author, version, about = "Shape-from-shading DEM reconstruction", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a DEM from the image named in a run config
    Run {
        /// YAML run config
        #[arg(short, long)]
        config: PathBuf,
        /// Override the output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Override the optimizer iteration cap
        #[arg(long)]
        max_iterations: Option<u64>,
        /// Override the smoothness weight
        #[arg(long)]
        lambda: Option<f64>,
    },
    /// Print a run config template with reference values
    DefaultConfig,
    /// Render a synthetic Gaussian bump as a 16-bit TIFF
    Render {
        /// Output TIFF file
        #[arg(short, long)]
        output: PathBuf,
        /// Image width and height in pixels
        #[arg(long, default_value_t = 64)]
        size: usize,
        /// Bump height in pixels
        #[arg(long, default_value_t = 4.0)]
        amplitude: f64,
        /// Bump width (standard deviation) in pixels
        #[arg(long, default_value_t = 8.0)]
        sigma: f64,
        /// Sun azimuth in degrees clockwise from North
        #[arg(long)]
        azimuth: Option<f64>,
        /// Sun elevation in degrees above the horizon
        #[arg(long)]
        elevation: Option<f64>,
    },
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            config,
            output_dir,
            max_iterations,
            lambda,
        } => {
            let mut run = load_config(&config)?;
            if let Some(dir) = output_dir {
                run.output_dir = dir;
            }
            if let Some(max_iterations) = max_iterations {
                run.sfs.max_iterations = max_iterations;
            }
            if let Some(lambda) = lambda {
                run.sfs.regularization_lambda = lambda;
            }

            let summary = run_pipeline(&run)?;
            println!("Reconstructed {}x{} DEM", summary.width, summary.height);
            println!(
                "  Iterations: {} ({})",
                summary.iterations,
                if summary.converged { "converged" } else { "not converged" }
            );
            println!("  Pixel scale: {:.4} m", summary.pixel_scale_m);
            println!(
                "  Height range: {:.2} m to {:.2} m",
                summary.dem.min, summary.dem.max
            );
            println!("  DEM: {}", summary.outputs.dem_tiff.display());
            println!("  Mesh: {}", summary.outputs.dem_obj.display());
            println!("  Summary: {}", summary.outputs.summary.display());
        }
        Commands::DefaultConfig => {
            print!("{}", default_config_yaml()?);
        }
        Commands::Render {
            output,
            size,
            amplitude,
            sigma,
            azimuth,
            elevation,
        } => {
            let defaults = SfsConfig::default();
            let config = SfsConfig {
                sun_azimuth_deg: azimuth.unwrap_or(defaults.sun_azimuth_deg),
                sun_elevation_deg: elevation.unwrap_or(defaults.sun_elevation_deg),
                ..defaults
            };
            config.validate()?;
            if size == 0 {
                return Err("render size must be at least 1 pixel".into());
            }

            let image = render_gaussian_bump(size, amplitude, sigma, &config);
            write_image_u16(&output, &image)?;
            info!(
                "Rendered {}x{} bump (sun az {:.1}, el {:.1}) to {}",
                size,
                size,
                config.sun_azimuth_deg,
                config.sun_elevation_deg,
                output.display()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    describe_metrics();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
