use std::{collections::BTreeMap, time::Duration};

use bon::Builder;
use clarabel::{
    algebra::CscMatrix,
    solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT},
};

use crate::{
    core::solver::{Backend, Problem, Relation, Sense, Solution, Status},
    prelude::*,
};

/// Solver tolerances and limits.
#[derive(Copy, Clone, Debug, Builder)]
pub struct Settings {
    /// Absolute tolerance on the duality gap and the primal feasibility.
    #[builder(default = 1e-4)]
    pub eps_abs: f64,

    /// Relative tolerance on the duality gap.
    #[builder(default = 1e-3)]
    pub eps_rel: f64,

    #[builder(default = 5000)]
    pub max_iter: u32,

    /// Print the solver's own iteration log.
    #[builder(default)]
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// [Clarabel](https://clarabel.org) interior-point backend.
///
/// Clarabel solves `min ½xᵀPx + qᵀx` subject to `Ax + s = b`, `s ∈ K`.
pub struct Clarabel {
    settings: Settings,
}

impl Clarabel {
    pub const fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl Backend for Clarabel {
    #[instrument(
        skip_all,
        fields(n_variables = problem.n_variables(), n_constraints = problem.n_constraints()),
    )]
    fn solve(&self, problem: &Problem) -> Result<Solution> {
        problem.ensure_convex()?;
        let n_variables = problem.n_variables();

        // Clarabel only minimizes:
        let sign = match problem.sense() {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        let mut q = vec![0.0; n_variables];
        for (variable, coefficient) in problem.objective().linear().terms() {
            q[variable.index()] += sign * coefficient;
        }
        let mut diagonal = BTreeMap::new();
        for (variable, weight) in problem.objective().squares() {
            // The factor of 2 compensates for the ½ in front of the quadratic form:
            *diagonal.entry(variable.index()).or_insert(0.0) += 2.0 * sign * weight;
        }
        let p = Self::diagonal_matrix(n_variables, &diagonal);

        let mut columns = vec![Vec::new(); n_variables];
        let mut b = Vec::with_capacity(problem.n_constraints());
        let mut cones = Vec::new();
        for constraint in problem.constraints() {
            let row = b.len();
            let expression = constraint.expression();
            // `a·x + c ≥ 0` is stored as `-a·x + s = c`, `s ≥ 0`:
            let (sign, is_equality) = match constraint.relation() {
                Relation::Equal => (1.0, true),
                Relation::LessOrEqual => (1.0, false),
                Relation::GreaterOrEqual => (-1.0, false),
            };
            for (variable, coefficient) in expression.terms() {
                columns[variable.index()].push((row, sign * coefficient));
            }
            b.push(-sign * expression.constant_term());
            Self::push_cone(&mut cones, is_equality);
        }
        let a = Self::csc_from_columns(b.len(), columns);

        let settings = DefaultSettingsBuilder::default()
            .verbose(self.settings.verbose)
            .max_iter(self.settings.max_iter)
            .tol_gap_abs(self.settings.eps_abs)
            .tol_gap_rel(self.settings.eps_rel)
            .tol_feas(self.settings.eps_abs)
            .build()
            .map_err(|error| anyhow!("invalid solver settings: {error:?}"))?;
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings)
            .map_err(|error| anyhow!("failed to set up the solver: {error:?}"))?;

        debug!("solving…");
        solver.solve();
        let solution = solver.solution;

        let status = match solution.status {
            SolverStatus::Solved => Status::Optimal,
            SolverStatus::AlmostSolved
            | SolverStatus::MaxIterations
            | SolverStatus::MaxTime
            | SolverStatus::InsufficientProgress => Status::Inaccurate,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                bail!("the problem is infeasible ({:?})", solution.status)
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                bail!("the problem is unbounded ({:?})", solution.status)
            }
            _ => Status::Failed,
        };

        let solve_time = Duration::from_secs_f64(solution.solve_time.max(0.0));
        match status {
            Status::Optimal => {
                info!(iterations = solution.iterations, ?solve_time, "solved");
            }
            Status::Inaccurate => {
                warn!(iterations = solution.iterations, ?solve_time, raw = ?solution.status, "solved inaccurately");
            }
            Status::Failed => {
                error!(iterations = solution.iterations, ?solve_time, raw = ?solution.status, "did not converge");
            }
        }

        let objective = problem.objective().evaluate(&solution.x);
        Ok(Solution {
            status,
            values: solution.x,
            objective,
            iterations: solution.iterations,
            solve_time,
        })
    }
}

impl Clarabel {
    /// Merge consecutive rows of the same kind into one cone.
    fn push_cone(cones: &mut Vec<SupportedConeT<f64>>, is_equality: bool) {
        match (cones.last_mut(), is_equality) {
            (Some(SupportedConeT::ZeroConeT(n)), true)
            | (Some(SupportedConeT::NonnegativeConeT(n)), false) => *n += 1,
            (_, true) => cones.push(SupportedConeT::ZeroConeT(1)),
            (_, false) => cones.push(SupportedConeT::NonnegativeConeT(1)),
        }
    }

    /// Build a compressed sparse column matrix, summing up repeated entries.
    fn csc_from_columns(n_rows: usize, columns: Vec<Vec<(usize, f64)>>) -> CscMatrix<f64> {
        let n_columns = columns.len();
        let mut column_pointers = Vec::with_capacity(n_columns + 1);
        let mut row_indices = Vec::new();
        let mut values = Vec::new();
        column_pointers.push(0);
        for column in columns {
            let mut merged = BTreeMap::new();
            for (row, value) in column {
                *merged.entry(row).or_insert(0.0) += value;
            }
            for (row, value) in merged {
                row_indices.push(row);
                values.push(value);
            }
            column_pointers.push(row_indices.len());
        }
        CscMatrix::new(n_rows, n_columns, column_pointers, row_indices, values)
    }

    /// Build the upper triangle of a diagonal matrix.
    fn diagonal_matrix(n: usize, diagonal: &BTreeMap<usize, f64>) -> CscMatrix<f64> {
        let mut column_pointers = Vec::with_capacity(n + 1);
        let mut row_indices = Vec::with_capacity(diagonal.len());
        let mut values = Vec::with_capacity(diagonal.len());
        column_pointers.push(0);
        for index in 0..n {
            if let Some(value) = diagonal.get(&index) {
                row_indices.push(index);
                values.push(*value);
            }
            column_pointers.push(row_indices.len());
        }
        CscMatrix::new(n, n, column_pointers, row_indices, values)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::solver::LinearExpression;

    fn backend() -> Clarabel {
        Clarabel::new(Settings::builder().eps_abs(1e-8).eps_rel(1e-8).build())
    }

    #[test]
    fn test_linear_program() -> Result {
        // max x + 2y, x + y ≤ 4, 0 ≤ x ≤ 3, 0 ≤ y ≤ 1
        let mut problem = Problem::new();
        let x = problem.add_bounded_variable(0.0, 3.0);
        let y = problem.add_bounded_variable(0.0, 1.0);
        problem.add_constraint((x + y).leq(4.0));
        problem.set_objective(Sense::Maximize, x + y * 2.0);

        let solution = backend().solve(&problem)?;
        assert_eq!(solution.status, Status::Optimal);
        assert_abs_diff_eq!(solution.value(x), 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.value(y), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.objective, 5.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_minimize_variance() -> Result {
        // Two values `x` and `4 - x` have zero variance at `x = 2`.
        let mut problem = Problem::new();
        let x = problem.add_bounded_variable(0.0, 10.0);
        let values = [LinearExpression::from(x), LinearExpression::constant(4.0) - x];
        let variance = problem.add_variance(&values);
        problem.set_objective(Sense::Minimize, variance);

        let solution = backend().solve(&problem)?;
        assert_abs_diff_eq!(solution.value(x), 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(solution.objective, 0.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_infeasible() {
        let mut problem = Problem::new();
        let x = problem.add_bounded_variable(0.0, 1.0);
        problem.add_constraint(LinearExpression::from(x).geq(2.0));
        problem.set_objective(Sense::Maximize, LinearExpression::from(x));
        assert!(backend().solve(&problem).is_err());
    }

    #[test]
    fn test_push_cone_merges() {
        let mut cones = Vec::new();
        Clarabel::push_cone(&mut cones, true);
        Clarabel::push_cone(&mut cones, true);
        Clarabel::push_cone(&mut cones, false);
        assert!(matches!(cones.as_slice(), [
            SupportedConeT::ZeroConeT(2),
            SupportedConeT::NonnegativeConeT(1)
        ]));
    }
}
