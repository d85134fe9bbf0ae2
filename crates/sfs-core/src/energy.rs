//! Shape-from-shading energy and its analytic gradient.
//!
//! The energy of a height field `Z` against an observed image `I` is
//!
//! ```text
//! C(Z) = 0.5 * sum (I - R(Z))^2  +  lambda * 0.5 * sum (lap Z)^2
//! ```
//!
//! where `R` is the clamped Lambertian rendering of [`crate::predicted_image`]
//! and `lap` the zero-padded 5-point Laplacian. The gradient is exact for the
//! discrete operators used, so it can be checked against finite differences.
//!
//! The brightness sensitivities are the full derivative of `L . n(p, q)`,
//!
//! ```text
//! dR/dp = (-Lx (1 + q^2) + p q Ly - p Lz) / (1 + p^2 + q^2)^1.5
//! ```
//!
//! and symmetrically for `q`, not the first-order `(Lx - Lz p)` numerator.

use crate::normals::{normal_from_slopes, slopes, Slopes};
use crate::stencil::{diff_x_transpose, diff_y_transpose, laplacian};
use crate::{Grid, LightVector, Result};
use argmin::core::{CostFunction, Error, Gradient};
use std::cell::RefCell;

/// Floor for the `(1 + p^2 + q^2)^1.5` slope denominator.
pub const DENOM_EPSILON: f64 = 1e-9;

/// Cost of a height field and its gradient.
#[derive(Debug, Clone)]
pub struct Energy {
    /// Total cost, `brightness_cost + lambda * smoothness_cost`.
    pub cost: f64,
    /// `0.5 * sum(error^2)` of observed minus predicted brightness.
    pub brightness_cost: f64,
    /// `0.5 * sum(laplacian^2)`, before weighting.
    pub smoothness_cost: f64,
    /// `dC/dZ`, flattened in row-major grid order.
    pub gradient: Vec<f64>,
}

/// Evaluate the energy of `z` and its gradient.
///
/// # Arguments
///
/// * `z` - Height field (dimensionless, in pixel units)
/// * `observed` - Observed brightness, same shape as `z`
/// * `light` - Unit light direction
/// * `lambda` - Smoothness weight
///
/// # Errors
///
/// Returns [`crate::SfsError::ShapeMismatch`] if the grids differ in shape.
pub fn cost_and_gradient(
    z: &Grid,
    observed: &Grid,
    light: &LightVector,
    lambda: f64,
) -> Result<Energy> {
    z.ensure_same_shape(observed)?;
    let (width, height) = z.dimensions();
    let [lx, ly, lz] = light.as_array();

    let Slopes { p, q } = slopes(z);

    // Brightness term and its sensitivity to each pixel's slopes
    let mut brightness_cost = 0.0;
    let mut dc_dp = Grid::zeros(width, height);
    let mut dc_dq = Grid::zeros(width, height);
    for y in 0..height {
        for x in 0..width {
            let (pv, qv) = (p.get(x, y), q.get(x, y));
            let reflectance = light.dot(&normal_from_slopes(pv, qv));
            let error = observed.get(x, y) - reflectance.max(0.0);
            brightness_cost += 0.5 * error * error;

            // Shadowed pixels are clamped to zero and carry no gradient
            if reflectance > 0.0 {
                let denom = (1.0 + pv * pv + qv * qv).powf(1.5).max(DENOM_EPSILON);
                let dr_dp = (-lx * (1.0 + qv * qv) + pv * qv * ly - pv * lz) / denom;
                let dr_dq = (-ly * (1.0 + pv * pv) + pv * qv * lx - qv * lz) / denom;
                *dc_dp.get_mut(x, y) = -error * dr_dp;
                *dc_dq.get_mut(x, y) = -error * dr_dq;
            }
        }
    }

    let lap = laplacian(z);
    let smoothness_cost = 0.5 * lap.as_slice().iter().map(|v| v * v).sum::<f64>();
    let bilaplacian = laplacian(&lap);

    let div_p = diff_x_transpose(&dc_dp);
    let div_q = diff_y_transpose(&dc_dq);
    let gradient = div_p
        .as_slice()
        .iter()
        .zip(div_q.as_slice())
        .zip(bilaplacian.as_slice())
        .map(|((gp, gq), bl)| gp + gq + lambda * bl)
        .collect();

    Ok(Energy {
        cost: brightness_cost + lambda * smoothness_cost,
        brightness_cost,
        smoothness_cost,
        gradient,
    })
}

/// Lowest-cost point evaluated so far.
pub(crate) type BestIterate = RefCell<Option<(Vec<f64>, f64)>>;

/// The energy as an `argmin` problem over the flattened height field.
///
/// `argmin` asks for cost and gradient separately, usually at the same
/// point, so the last evaluation is cached. Every evaluation also updates a
/// caller-owned best iterate, which survives a solver error.
pub(crate) struct SfsProblem<'a> {
    observed: &'a Grid,
    light: LightVector,
    lambda: f64,
    last: RefCell<Option<(Vec<f64>, Energy)>>,
    best: &'a BestIterate,
}

impl<'a> SfsProblem<'a> {
    pub(crate) fn new(
        observed: &'a Grid,
        light: LightVector,
        lambda: f64,
        best: &'a BestIterate,
    ) -> Self {
        Self {
            observed,
            light,
            lambda,
            last: RefCell::new(None),
            best,
        }
    }

    pub(crate) fn evaluate(&self, param: &[f64]) -> Result<Energy> {
        if let Some((point, energy)) = self.last.borrow().as_ref() {
            if point.as_slice() == param {
                return Ok(energy.clone());
            }
        }

        let z = Grid::new(self.observed.width(), self.observed.height(), param.to_vec())?;
        let energy = cost_and_gradient(&z, self.observed, &self.light, self.lambda)?;

        {
            let mut best = self.best.borrow_mut();
            let improved = match best.as_ref() {
                Some((_, cost)) => energy.cost < *cost,
                None => energy.cost.is_finite(),
            };
            if improved {
                *best = Some((param.to_vec(), energy.cost));
            }
        }

        *self.last.borrow_mut() = Some((param.to_vec(), energy.clone()));
        Ok(energy)
    }
}

impl CostFunction for SfsProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, Error> {
        Ok(self.evaluate(param)?.cost)
    }
}

impl Gradient for SfsProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> std::result::Result<Self::Gradient, Error> {
        Ok(self.evaluate(param)?.gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{light_vector, predicted_image};
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_grid(rng: &mut ChaCha8Rng, width: usize, height: usize, lo: f64, hi: f64) -> Grid {
        Grid::from_fn(width, height, |_, _| rng.gen_range(lo..hi))
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let light = light_vector(30.0, 40.0);
        let lambda = 0.01;
        let z = random_grid(&mut rng, 6, 5, -0.3, 0.3);
        let observed = random_grid(&mut rng, 6, 5, 0.2, 0.9);

        let energy = cost_and_gradient(&z, &observed, &light, lambda).unwrap();
        assert_eq!(energy.gradient.len(), z.len());

        let h = 1e-6;
        for i in 0..z.len() {
            let mut plus = z.clone().into_vec();
            plus[i] += h;
            let mut minus = z.clone().into_vec();
            minus[i] -= h;
            let cost_plus = cost_and_gradient(
                &Grid::new(6, 5, plus).unwrap(),
                &observed,
                &light,
                lambda,
            )
            .unwrap()
            .cost;
            let cost_minus = cost_and_gradient(
                &Grid::new(6, 5, minus).unwrap(),
                &observed,
                &light,
                lambda,
            )
            .unwrap()
            .cost;

            let numeric = (cost_plus - cost_minus) / (2.0 * h);
            let analytic = energy.gradient[i];
            let scale = numeric.abs().max(analytic.abs()).max(1e-6);
            assert!(
                (numeric - analytic).abs() / scale < 1e-3,
                "sample {}: numeric {} vs analytic {}",
                i,
                numeric,
                analytic
            );
        }
    }

    #[test]
    fn test_gradient_check_on_narrow_grids() {
        // Thin strips exercise the one-sided border stencils
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let light = light_vector(200.0, 60.0);
        for (width, height) in [(2, 5), (5, 2), (3, 3)] {
            let z = random_grid(&mut rng, width, height, -0.2, 0.2);
            let observed = random_grid(&mut rng, width, height, 0.0, 1.0);
            let energy = cost_and_gradient(&z, &observed, &light, 0.1).unwrap();

            let h = 1e-6;
            for i in 0..z.len() {
                let mut plus = z.clone().into_vec();
                plus[i] += h;
                let mut minus = z.clone().into_vec();
                minus[i] -= h;
                let cp = cost_and_gradient(&Grid::new(width, height, plus).unwrap(), &observed, &light, 0.1)
                    .unwrap()
                    .cost;
                let cm = cost_and_gradient(&Grid::new(width, height, minus).unwrap(), &observed, &light, 0.1)
                    .unwrap()
                    .cost;
                let numeric = (cp - cm) / (2.0 * h);
                let scale = numeric.abs().max(energy.gradient[i].abs()).max(1e-6);
                assert!((numeric - energy.gradient[i]).abs() / scale < 1e-3);
            }
        }
    }

    #[test]
    fn test_cost_is_non_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for seed_scale in [0.01, 1.0, 50.0] {
            let light = light_vector(rng.gen_range(0.0..360.0), rng.gen_range(5.0..85.0));
            let z = random_grid(&mut rng, 7, 7, -seed_scale, seed_scale);
            let observed = random_grid(&mut rng, 7, 7, 0.0, 1.0);
            let energy = cost_and_gradient(&z, &observed, &light, 5e-3).unwrap();
            assert!(energy.cost >= 0.0);
            assert!(energy.brightness_cost >= 0.0);
            assert!(energy.smoothness_cost >= 0.0);
            assert!(energy.cost.is_finite());
            assert!(energy.gradient.iter().all(|g| g.is_finite()));
        }
    }

    #[test]
    fn test_flat_surface_against_own_rendering_has_zero_cost() {
        let light = light_vector(101.55, 34.8);
        let z = Grid::zeros(8, 6);
        let observed = predicted_image(&z, &light);
        let energy = cost_and_gradient(&z, &observed, &light, 5e-3).unwrap();
        assert_eq!(energy.brightness_cost, 0.0);
        assert_eq!(energy.smoothness_cost, 0.0);
        assert_eq!(energy.cost, 0.0);
        assert!(energy.gradient.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_lambda_weights_smoothness() {
        let light = light_vector(0.0, 45.0);
        let z = Grid::from_fn(5, 5, |x, y| ((x * y) % 3) as f64 * 0.1);
        let observed = predicted_image(&z, &light);

        let e0 = cost_and_gradient(&z, &observed, &light, 0.0).unwrap();
        let e1 = cost_and_gradient(&z, &observed, &light, 2.0).unwrap();
        assert_eq!(e0.brightness_cost, 0.0);
        assert_eq!(e0.cost, 0.0);
        assert_abs_diff_eq!(e1.cost, 2.0 * e1.smoothness_cost, epsilon = 1e-12);
        assert!(e1.smoothness_cost > 0.0);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let light = light_vector(0.0, 45.0);
        let result = cost_and_gradient(&Grid::zeros(3, 3), &Grid::zeros(3, 4), &light, 0.0);
        assert!(matches!(result, Err(crate::SfsError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_problem_tracks_best_iterate() {
        let light = light_vector(0.0, 45.0);
        let observed = predicted_image(&Grid::zeros(3, 3), &light);
        let best = BestIterate::default();
        let problem = SfsProblem::new(&observed, light, 0.0, &best);

        let bumpy = vec![0.0, 0.5, 0.0, 0.5, 1.0, 0.5, 0.0, 0.5, 0.0];
        let flat = vec![0.0; 9];
        let bumpy_cost = problem.cost(&bumpy).unwrap();
        assert!(bumpy_cost > 0.0);
        assert_eq!(problem.cost(&flat).unwrap(), 0.0);
        assert!(problem.cost(&bumpy).unwrap() > 0.0);

        let (point, cost) = best.borrow().clone().unwrap();
        assert_eq!(point, flat);
        assert_eq!(cost, 0.0);

        // Gradient at a cached point agrees with a fresh evaluation
        let gradient = problem.gradient(&bumpy).unwrap();
        let fresh = cost_and_gradient(&Grid::new(3, 3, bumpy).unwrap(), &observed, &light, 0.0).unwrap();
        assert_eq!(gradient, fresh.gradient);
    }
}
