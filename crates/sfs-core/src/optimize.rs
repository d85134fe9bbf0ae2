//! L-BFGS driver for the shape-from-shading energy.

use crate::energy::{BestIterate, SfsProblem};
use crate::metric_defs::{OPTIMIZER_FINAL_COST, OPTIMIZER_ITERATIONS, OPTIMIZER_RUNS};
use crate::{Grid, HeightField, InitialSurface, LightVector, Result, SfsConfig, SfsError};
use argmin::core::observers::{Observe, ObserverMode};
use argmin::core::{Error, Executor, State, TerminationReason, KV};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of correction pairs kept by L-BFGS.
pub const LBFGS_MEMORY: usize = 10;

/// Stop when the gradient norm falls below this.
pub const GRADIENT_TOLERANCE: f64 = 1e-5;

/// Stop when the cost changes by less than this between iterations.
pub const COST_TOLERANCE: f64 = 2.220446049250313e-9;

// ============================================================================
// Iteration Observers
// ============================================================================

/// Receives a callback after every accepted optimizer step.
///
/// Observers only see the 1-based iteration index and cannot influence the
/// result.
pub trait IterationObserver {
    /// Called once per accepted step.
    fn on_iteration(&mut self, iteration: u64);
}

impl<F: FnMut(u64)> IterationObserver for F {
    fn on_iteration(&mut self, iteration: u64) {
        self(iteration)
    }
}

/// Shared counter of accepted steps.
///
/// Clones share the same count, so one clone can be handed to the optimizer
/// while another is read afterwards.
#[derive(Debug, Clone, Default)]
pub struct IterationCounter {
    count: Arc<AtomicU64>,
}

impl IterationCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps observed so far.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl IterationObserver for IterationCounter {
    fn on_iteration(&mut self, iteration: u64) {
        self.count.store(iteration, Ordering::Relaxed);
    }
}

/// Logs optimizer progress at `info` level every `every` iterations.
#[derive(Debug, Clone)]
pub struct ProgressLogger {
    max_iterations: u64,
    every: u64,
}

impl ProgressLogger {
    /// Log every `every` steps out of `max_iterations`.
    pub fn new(max_iterations: u64, every: u64) -> Self {
        Self {
            max_iterations,
            every: every.max(1),
        }
    }
}

impl IterationObserver for ProgressLogger {
    fn on_iteration(&mut self, iteration: u64) {
        if iteration % self.every == 0 || iteration == self.max_iterations {
            info!(
                "L-BFGS optimization: iteration {}/{}",
                iteration, self.max_iterations
            );
        }
    }
}

/// Adapts an [`IterationObserver`] to `argmin`'s observer interface.
struct ObserverBridge<O> {
    observer: O,
    steps: Arc<AtomicU64>,
}

impl<O, I> Observe<I> for ObserverBridge<O>
where
    O: IterationObserver,
    I: State,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> std::result::Result<(), Error> {
        let iteration = state.get_iter() + 1;
        self.steps.store(iteration, Ordering::Relaxed);
        metrics::counter!(OPTIMIZER_ITERATIONS).increment(1);
        self.observer.on_iteration(iteration);
        Ok(())
    }
}

// ============================================================================
// Solution
// ============================================================================

/// Why an optimization run ended without converging.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceWarning {
    /// Human-readable termination reason.
    pub reason: String,
    /// Accepted steps before stopping.
    pub iterations: u64,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "optimizer did not converge after {} iterations: {}",
            self.iterations, self.reason
        )
    }
}

/// Outcome of the optimizer's convergence test.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvergenceStatus {
    /// The solver's convergence criterion was met.
    Converged,
    /// The run stopped for another reason; the best iterate is still returned.
    NotConverged(ConvergenceWarning),
}

impl ConvergenceStatus {
    /// Whether the solver converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::Converged)
    }

    /// The warning, if the run did not converge.
    pub fn warning(&self) -> Option<&ConvergenceWarning> {
        match self {
            ConvergenceStatus::Converged => None,
            ConvergenceStatus::NotConverged(warning) => Some(warning),
        }
    }
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct SfsSolution {
    /// Dimensionless height field, same shape as the observed image.
    pub height_field: HeightField,
    /// Energy of `height_field`.
    pub cost: f64,
    /// Accepted optimizer steps.
    pub iterations: u64,
    /// Convergence outcome.
    pub status: ConvergenceStatus,
}

// ============================================================================
// Driver
// ============================================================================

type Solver = LBFGS<MoreThuenteLineSearch<Vec<f64>, Vec<f64>, f64>, Vec<f64>, Vec<f64>, f64>;

/// L-BFGS with a More-Thuente line search and the crate's tolerances.
fn lbfgs_solver() -> Result<Solver> {
    LBFGS::new(MoreThuenteLineSearch::new(), LBFGS_MEMORY)
        .with_tolerance_grad(GRADIENT_TOLERANCE)
        .map_err(|e| SfsError::InvalidConfig(e.to_string()))?
        .with_tolerance_cost(COST_TOLERANCE)
        .map_err(|e| SfsError::InvalidConfig(e.to_string()))
}

/// Build the starting height field named by `config.initial_surface`.
///
/// # Errors
///
/// [`SfsError::UnsupportedInitialSurface`] for anything other than `"flat"`.
pub fn initial_height_field(config: &SfsConfig, width: usize, height: usize) -> Result<HeightField> {
    match config.initial_surface()? {
        InitialSurface::Flat => Ok(Grid::zeros(width, height)),
    }
}

/// Reconstruct a height field from `observed`, logging progress.
///
/// See [`optimize_with_observer`].
pub fn optimize(observed: &Grid, config: &SfsConfig) -> Result<SfsSolution> {
    let every = (config.max_iterations / 10).max(1);
    optimize_with_observer(
        observed,
        config,
        ProgressLogger::new(config.max_iterations, every),
    )
}

/// Reconstruct a height field from `observed` with L-BFGS.
///
/// Configuration problems (including an unsupported initial surface) are
/// returned as errors before the optimizer takes any step. Running out of
/// iterations, or the solver giving up, is not an error: the lowest-cost
/// height field found is returned with [`ConvergenceStatus::NotConverged`].
///
/// # Example
///
/// ```
/// use sfs_core::{optimize, predicted_image, Grid, LightVector, SfsConfig};
///
/// let config = SfsConfig {
///     sun_azimuth_deg: 0.0,
///     sun_elevation_deg: 45.0,
///     max_iterations: 20,
///     ..SfsConfig::default()
/// };
/// let light = LightVector::from_sun_angles(0.0, 45.0);
/// let truth = Grid::from_fn(6, 6, |x, y| 0.1 * (x as f64 - 2.5) * (y as f64 - 2.5));
/// let observed = predicted_image(&truth, &light);
///
/// let solution = optimize(&observed, &config).unwrap();
/// assert_eq!(solution.height_field.dimensions(), (6, 6));
/// ```
pub fn optimize_with_observer<O>(
    observed: &Grid,
    config: &SfsConfig,
    observer: O,
) -> Result<SfsSolution>
where
    O: IterationObserver + Send + 'static,
{
    config.validate()?;
    let (width, height) = observed.dimensions();
    let initial = initial_height_field(config, width, height)?;

    let light = LightVector::from_sun_angles(config.sun_azimuth_deg, config.sun_elevation_deg);
    info!(
        "Light vector (E,N,U): ({:.3}, {:.3}, {:.3})",
        light.east, light.north, light.up
    );

    let best = BestIterate::default();
    let problem = SfsProblem::new(observed, light, config.regularization_lambda, &best);
    let initial_cost = problem.evaluate(initial.as_slice())?.cost;
    debug!(
        "Starting L-BFGS on {}x{} grid, initial cost {:.6e}, lambda {}",
        width, height, initial_cost, config.regularization_lambda
    );

    let solver = lbfgs_solver()?;

    let steps = Arc::new(AtomicU64::new(0));
    let bridge = ObserverBridge {
        observer,
        steps: Arc::clone(&steps),
    };

    let result = Executor::new(problem, solver)
        .configure(|state| {
            state
                .param(initial.as_slice().to_vec())
                .max_iters(config.max_iterations)
        })
        .add_observer(bridge, ObserverMode::Always)
        .run();

    let (param, cost, iterations, status) = match result {
        Ok(res) => {
            let state = res.state();
            let iterations = state.get_iter();
            let status = match state.get_termination_reason() {
                Some(TerminationReason::SolverConverged)
                | Some(TerminationReason::TargetCostReached) => ConvergenceStatus::Converged,
                Some(TerminationReason::MaxItersReached) => {
                    ConvergenceStatus::NotConverged(ConvergenceWarning {
                        reason: format!("reached max_iterations ({})", config.max_iterations),
                        iterations,
                    })
                }
                other => ConvergenceStatus::NotConverged(ConvergenceWarning {
                    reason: match other {
                        Some(reason) => format!("{:?}", reason),
                        None => "terminated without a reason".to_string(),
                    },
                    iterations,
                }),
            };
            match state.get_best_param() {
                Some(param) => (param.clone(), state.get_best_cost(), iterations, status),
                None => {
                    let (param, cost) = best
                        .borrow()
                        .clone()
                        .unwrap_or_else(|| (initial.as_slice().to_vec(), initial_cost));
                    (param, cost, iterations, status)
                }
            }
        }
        Err(err) => {
            // Solver failure (typically a line-search breakdown); fall back
            // to the lowest-cost point it evaluated.
            let iterations = steps.load(Ordering::Relaxed);
            let (param, cost) = best
                .borrow()
                .clone()
                .unwrap_or_else(|| (initial.as_slice().to_vec(), initial_cost));
            let status = ConvergenceStatus::NotConverged(ConvergenceWarning {
                reason: format!("solver stopped early: {}", err),
                iterations,
            });
            (param, cost, iterations, status)
        }
    };

    match &status {
        ConvergenceStatus::Converged => {
            info!(
                "L-BFGS converged after {} iterations, cost {:.6e}",
                iterations, cost
            );
            metrics::counter!(OPTIMIZER_RUNS, "outcome" => "converged").increment(1);
        }
        ConvergenceStatus::NotConverged(warning) => {
            warn!("{} (cost {:.6e})", warning, cost);
            metrics::counter!(OPTIMIZER_RUNS, "outcome" => "not_converged").increment(1);
        }
    }
    metrics::gauge!(OPTIMIZER_FINAL_COST).set(cost);

    Ok(SfsSolution {
        height_field: Grid::new(width, height, param)?,
        cost,
        iterations,
        status,
    })
}
