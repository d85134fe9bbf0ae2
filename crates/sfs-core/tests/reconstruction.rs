//! End-to-end reconstruction of synthetic scenes.
//!
//! Each test renders a known height field, reconstructs it from the rendered
//! image alone and compares the result with the original.

use approx::assert_abs_diff_eq;
use sfs_core::{
    cost_and_gradient, optimize, optimize_with_observer, pixel_scale_m, predicted_image,
    scale_to_meters, DemSummary, Grid, IterationCounter, LightVector, SfsConfig,
};

fn centered_bump(size: usize, amplitude: f64, sigma: f64) -> Grid {
    let c = (size as f64 - 1.0) / 2.0;
    Grid::from_fn(size, size, |x, y| {
        let r2 = (x as f64 - c).powi(2) + (y as f64 - c).powi(2);
        amplitude * (-r2 / (2.0 * sigma * sigma)).exp()
    })
}

fn correlation(a: &Grid, b: &Grid) -> f64 {
    let (ma, mb) = (a.mean(), b.mean());
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    cov / (va * vb).sqrt()
}

fn reference_config() -> SfsConfig {
    SfsConfig {
        sun_azimuth_deg: 0.0,
        sun_elevation_deg: 45.0,
        initial_surface: "flat".to_string(),
        regularization_lambda: 5e-3,
        max_iterations: 150,
        spacecraft_altitude_km: 95.85,
        focal_length_mm: 140.0,
        detector_pixel_width_um: 7.0,
    }
}

#[test]
fn test_recovers_centered_bump() {
    let config = reference_config();
    let light = LightVector::from_sun_angles(config.sun_azimuth_deg, config.sun_elevation_deg);
    let truth = centered_bump(8, 1.0, 1.5);
    let observed = predicted_image(&truth, &light);

    let counter = IterationCounter::new();
    let solution = optimize_with_observer(&observed, &config, counter.clone()).unwrap();
    println!(
        "iterations={} cost={:.3e} status={:?}",
        solution.iterations, solution.cost, solution.status
    );

    assert_eq!(solution.height_field.dimensions(), (8, 8));
    assert!(solution.iterations <= config.max_iterations);
    assert_eq!(counter.count(), solution.iterations);

    let flat_cost = cost_and_gradient(&Grid::zeros(8, 8), &observed, &light, 5e-3)
        .unwrap()
        .cost;
    assert!(solution.cost < 0.1 * flat_cost);

    let r = correlation(&solution.height_field, &truth);
    println!("correlation with truth: {:.4}", r);
    assert!(r > 0.9, "correlation {} too low", r);
}

#[test]
fn test_scaled_reconstruction_uses_reference_pixel_scale() {
    let config = reference_config();
    let light = LightVector::from_sun_angles(config.sun_azimuth_deg, config.sun_elevation_deg);
    let observed = predicted_image(&centered_bump(8, 1.0, 1.5), &light);

    let solution = optimize(&observed, &config).unwrap();
    let dem = scale_to_meters(&solution.height_field, &config);

    let scale = pixel_scale_m(&config);
    assert_abs_diff_eq!(scale, 7e-6 * 95850.0 / 0.14, epsilon = 1e-12);
    assert_abs_diff_eq!(scale, 4.7925, epsilon = 1e-9);

    let z = &solution.height_field;
    let mean = z.mean();
    for (scaled, relative) in dem.as_slice().iter().zip(z.as_slice()) {
        assert_abs_diff_eq!(*scaled, (relative - mean) * scale, epsilon = 1e-9);
    }

    let summary = DemSummary::from_grid(&dem);
    assert_abs_diff_eq!(summary.mean, 0.0, epsilon = 1e-9);
    assert!(summary.min < 0.0 && summary.max > 0.0);
}

#[test]
fn test_stronger_regularization_gives_smoother_surface() {
    let light = LightVector::from_sun_angles(0.0, 45.0);
    let observed = predicted_image(&centered_bump(8, 1.0, 1.5), &light);

    let roughness = |lambda: f64| {
        let config = SfsConfig {
            regularization_lambda: lambda,
            ..reference_config()
        };
        let solution = optimize(&observed, &config).unwrap();
        cost_and_gradient(&solution.height_field, &observed, &light, 1.0)
            .unwrap()
            .smoothness_cost
    };

    assert!(roughness(5.0) < roughness(5e-3));
}
