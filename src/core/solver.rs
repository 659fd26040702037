//! Solver-agnostic description of a convex quadratic program.
//!
//! Formulations only talk to [`Problem`] and [`Backend`], so any QP-capable backend
//! can be plugged in without touching them.

mod clarabel;
mod expression;
mod problem;
mod solution;

pub use self::{
    clarabel::{Clarabel, Settings},
    expression::{LinearExpression, QuadraticExpression, Variable},
    problem::{Problem, Relation, Sense},
    solution::{Solution, Status},
};
use crate::prelude::*;

pub trait Backend {
    /// Solve the problem.
    ///
    /// # Returns
    ///
    /// - [`Ok`] with the best found values, even if the solver did not fully converge:
    ///   check [`Solution::status`].
    /// - [`Err`], if the problem is infeasible or unbounded, or the backend could not run at all.
    fn solve(&self, problem: &Problem) -> Result<Solution>;
}
