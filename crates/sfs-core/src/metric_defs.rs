//! Metric names emitted by the optimizer.
//!
//! Recording goes through the `metrics` facade and is a no-op unless the
//! embedding application installs a recorder.

use metrics::{describe_counter, describe_gauge, Unit};

/// Accepted optimizer steps, across all runs.
pub const OPTIMIZER_ITERATIONS: &str = "sfs.optimizer.iterations";

/// Completed optimizer runs, labelled with `outcome`.
pub const OPTIMIZER_RUNS: &str = "sfs.optimizer.runs";

/// Cost of the returned height field of the most recent run.
pub const OPTIMIZER_FINAL_COST: &str = "sfs.optimizer.final_cost";

/// Register descriptions for every metric above.
pub fn describe_metrics() {
    describe_counter!(
        OPTIMIZER_ITERATIONS,
        Unit::Count,
        "Accepted L-BFGS steps"
    );
    describe_counter!(
        OPTIMIZER_RUNS,
        Unit::Count,
        "Optimizer runs by outcome (converged, not_converged)"
    );
    describe_gauge!(
        OPTIMIZER_FINAL_COST,
        "Energy of the height field returned by the latest run"
    );
}
