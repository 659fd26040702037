use clap::Parser;

use crate::core::solver::{Clarabel, Settings};

#[derive(Copy, Clone, Parser)]
pub struct SolverArgs {
    /// Absolute convergence tolerance.
    #[clap(long, default_value = "1e-4", env = "SOLVER_EPS_ABS")]
    pub eps_abs: f64,

    /// Relative convergence tolerance.
    #[clap(long, default_value = "1e-3", env = "SOLVER_EPS_REL")]
    pub eps_rel: f64,

    #[clap(long, default_value = "5000", env = "SOLVER_MAX_ITER")]
    pub max_iter: u32,

    /// Print the solver's iteration log.
    #[clap(long)]
    pub verbose_solver: bool,
}

impl SolverArgs {
    pub fn backend(&self) -> Clarabel {
        Clarabel::new(
            Settings::builder()
                .eps_abs(self.eps_abs)
                .eps_rel(self.eps_rel)
                .max_iter(self.max_iter)
                .verbose(self.verbose_solver)
                .build(),
        )
    }
}
