//! Dispatch formulations built on the shared battery physics.

pub mod deterministic;
pub mod smoothing;
pub mod stochastic;

use std::time::Duration;

use ndarray::{Array1, Array2};

use crate::core::{
    cycles::CycleBudget,
    physics::StateOfChargePath,
    probability::SocScenarios,
    schedule::StateOfCharge,
    solver::{Solution, Status},
};

/// Where the state-of-charge paths start.
#[derive(Copy, Clone, Debug)]
pub enum InitialCondition<'a> {
    /// Single path ending where it started.
    Periodic,

    /// One path per initial level, weighted by its probability.
    Scenarios(&'a SocScenarios),
}

/// Solver outcome and cycle usage common to all formulations.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Report {
    pub status: Status,

    /// Objective value as reported by the solver.
    pub objective: f64,

    /// Full cycles over the horizon.
    pub cycles: f64,

    pub annualized_cycles: f64,
    pub iterations: u32,
    pub solve_time: Duration,
}

impl Report {
    pub fn new(solution: &Solution, budget: &CycleBudget, discharge: &Array1<f64>) -> Self {
        let cycles = budget.count(discharge);
        Self {
            status: solution.status,
            objective: solution.objective,
            cycles,
            annualized_cycles: budget.annualize(cycles),
            iterations: solution.iterations,
            solve_time: solution.solve_time,
        }
    }
}

/// Collect the solved paths into a `(T + 1) × K` matrix.
fn collect_state_of_charge(paths: &[StateOfChargePath], solution: &Solution) -> StateOfCharge {
    let n_rows = paths.first().map_or(0, StateOfChargePath::n_levels);
    let mut levels = Array2::zeros((n_rows, paths.len()));
    for (k, path) in paths.iter().enumerate() {
        for (t, level) in path.values(solution).into_iter().enumerate() {
            levels[[t, k]] = level;
        }
    }
    StateOfCharge(levels)
}
