use crate::{
    core::solver::expression::{LinearExpression, QuadraticExpression, Variable},
    prelude::*,
};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Relation {
    Equal,
    LessOrEqual,
    GreaterOrEqual,
}

/// `expression ⋚ 0`.
#[must_use]
#[derive(Clone, Debug)]
pub struct Constraint {
    pub(super) expression: LinearExpression,
    pub(super) relation: Relation,
}

impl Constraint {
    pub(super) const fn new(expression: LinearExpression, relation: Relation) -> Self {
        Self { expression, relation }
    }

    pub const fn expression(&self) -> &LinearExpression {
        &self.expression
    }

    pub const fn relation(&self) -> Relation {
        self.relation
    }
}

#[must_use]
#[derive(Default)]
pub struct Problem {
    n_variables: usize,
    constraints: Vec<Constraint>,
    sense: Sense,
    objective: QuadraticExpression,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn n_variables(&self) -> usize {
        self.n_variables
    }

    pub const fn n_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub const fn sense(&self) -> Sense {
        self.sense
    }

    pub const fn objective(&self) -> &QuadraticExpression {
        &self.objective
    }

    /// Add a free variable.
    pub const fn add_variable(&mut self) -> Variable {
        let variable = Variable(self.n_variables);
        self.n_variables += 1;
        variable
    }

    pub fn add_variables(&mut self, n: usize) -> Vec<Variable> {
        (0..n).map(|_| self.add_variable()).collect()
    }

    /// Add a variable constrained to `lower..=upper`.
    pub fn add_bounded_variable(&mut self, lower: f64, upper: f64) -> Variable {
        let variable = self.add_variable();
        self.add_constraint(LinearExpression::from(variable).geq(lower));
        self.add_constraint(LinearExpression::from(variable).leq(upper));
        variable
    }

    pub fn add_bounded_variables(&mut self, n: usize, lower: f64, upper: f64) -> Vec<Variable> {
        (0..n).map(|_| self.add_bounded_variable(lower, upper)).collect()
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn add_constraints(&mut self, constraints: impl IntoIterator<Item = Constraint>) {
        self.constraints.extend(constraints);
    }

    pub fn set_objective(&mut self, sense: Sense, objective: impl Into<QuadraticExpression>) {
        self.sense = sense;
        self.objective = objective.into();
    }

    /// Build the population variance of the values.
    ///
    /// The variance is expressed through a mean variable `m` and deviation variables `dᵢ = vᵢ - m`,
    /// so that the quadratic part stays diagonal: `Σ dᵢ² / n`.
    pub fn add_variance(&mut self, values: &[LinearExpression]) -> QuadraticExpression {
        if values.is_empty() {
            return QuadraticExpression::default();
        }
        #[expect(clippy::cast_precision_loss)]
        let n = values.len() as f64;

        let mean = self.add_variable();
        let total: LinearExpression = values.iter().cloned().sum();
        self.add_constraint((total - mean * n).equal_to(0.0));

        let squares = values
            .iter()
            .map(|value| {
                let deviation = self.add_variable();
                self.add_constraint((value.clone() - mean - deviation).equal_to(0.0));
                (deviation, 1.0 / n)
            })
            .collect();
        QuadraticExpression { linear: LinearExpression::default(), squares }
    }

    /// Make sure the objective is convex in the minimization sense.
    pub fn ensure_convex(&self) -> Result {
        for (variable, weight) in self.objective.squares() {
            match self.sense {
                Sense::Minimize => ensure!(
                    weight >= 0.0,
                    "minimizing a concave term ({weight} × x{}²) is not convex",
                    variable.index(),
                ),
                Sense::Maximize => ensure!(
                    weight <= 0.0,
                    "maximizing a convex term ({weight} × x{}²) is not convex",
                    variable.index(),
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_variance_shape() {
        let mut problem = Problem::new();
        let values = problem.add_variables(3);
        let values: Vec<LinearExpression> = values.into_iter().map(LinearExpression::from).collect();
        let variance = problem.add_variance(&values);
        assert_eq!(problem.n_variables(), 3 + 1 + 3);
        assert_eq!(problem.n_constraints(), 1 + 3);
        assert_eq!(variance.squares().count(), 3);
    }

    #[test]
    fn test_ensure_convex() {
        let mut problem = Problem::new();
        let x = problem.add_variable();
        let squared = QuadraticExpression { linear: LinearExpression::default(), squares: vec![(x, 1.0)] };

        problem.set_objective(Sense::Minimize, squared.clone());
        assert!(problem.ensure_convex().is_ok());

        problem.set_objective(Sense::Maximize, squared);
        assert!(problem.ensure_convex().is_err());
    }
}
