use std::time::Duration;

use crate::core::solver::expression::{LinearExpression, Variable};

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum Status {
    /// Converged within the requested tolerances.
    #[display("optimal")]
    Optimal,

    /// Stopped at reduced accuracy or on an iteration/time cap: the values are usable but suboptimal.
    #[display("inaccurate")]
    Inaccurate,

    /// Did not converge: the values are only the last iterate.
    #[display("failed")]
    Failed,
}

#[must_use]
pub struct Solution {
    pub status: Status,

    /// Primal values indexed by [`Variable::index`].
    pub values: Vec<f64>,

    /// Objective value in the problem's own sense.
    pub objective: f64,

    pub iterations: u32,
    pub solve_time: Duration,
}

impl Solution {
    #[must_use]
    pub fn value(&self, variable: Variable) -> f64 {
        self.values[variable.index()]
    }

    #[must_use]
    pub fn values_of(&self, variables: &[Variable]) -> Vec<f64> {
        variables.iter().map(|variable| self.value(*variable)).collect()
    }

    #[must_use]
    pub fn evaluate(&self, expression: &LinearExpression) -> f64 {
        expression.evaluate(&self.values)
    }
}
