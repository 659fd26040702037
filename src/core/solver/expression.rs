use std::{
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use crate::core::solver::problem::{Constraint, Relation};

/// Decision variable handle, only meaningful within the problem that created it.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Variable(pub(super) usize);

impl Variable {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Affine expression: `Σ coefficient × variable + constant`.
///
/// Repeated variables are allowed, backends sum their coefficients.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct LinearExpression {
    pub(super) terms: Vec<(Variable, f64)>,
    pub(super) constant: f64,
}

impl LinearExpression {
    pub const fn constant(value: f64) -> Self {
        Self { terms: Vec::new(), constant: value }
    }

    pub fn term(variable: Variable, coefficient: f64) -> Self {
        Self { terms: vec![(variable, coefficient)], constant: 0.0 }
    }

    pub fn add_term(&mut self, variable: Variable, coefficient: f64) {
        if coefficient != 0.0 {
            self.terms.push((variable, coefficient));
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.terms.iter().copied()
    }

    pub const fn constant_term(&self) -> f64 {
        self.constant
    }

    /// `self == rhs`.
    pub fn equal_to(self, rhs: f64) -> Constraint {
        Constraint::new(self - rhs, Relation::Equal)
    }

    /// `self ≤ rhs`.
    pub fn leq(self, rhs: impl Into<Self>) -> Constraint {
        Constraint::new(self - rhs.into(), Relation::LessOrEqual)
    }

    /// `self ≥ rhs`.
    pub fn geq(self, rhs: impl Into<Self>) -> Constraint {
        Constraint::new(self - rhs.into(), Relation::GreaterOrEqual)
    }

    #[must_use]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|(variable, coefficient)| coefficient * values[variable.0]).sum::<f64>()
            + self.constant
    }
}

impl From<Variable> for LinearExpression {
    fn from(variable: Variable) -> Self {
        Self::term(variable, 1.0)
    }
}

impl From<f64> for LinearExpression {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl AddAssign for LinearExpression {
    fn add_assign(&mut self, rhs: Self) {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl SubAssign for LinearExpression {
    fn sub_assign(&mut self, rhs: Self) {
        *self += -rhs;
    }
}

impl<R: Into<Self>> Add<R> for LinearExpression {
    type Output = Self;

    fn add(mut self, rhs: R) -> Self::Output {
        self += rhs.into();
        self
    }
}

impl<R: Into<Self>> Sub<R> for LinearExpression {
    type Output = Self;

    fn sub(mut self, rhs: R) -> Self::Output {
        self -= rhs.into();
        self
    }
}

impl Mul<f64> for LinearExpression {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self::Output {
        for (_, coefficient) in &mut self.terms {
            *coefficient *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Mul<LinearExpression> for f64 {
    type Output = LinearExpression;

    fn mul(self, rhs: LinearExpression) -> Self::Output {
        rhs * self
    }
}

impl Neg for LinearExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl Sum for LinearExpression {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |sum, item| sum + item)
    }
}

impl Mul<f64> for Variable {
    type Output = LinearExpression;

    fn mul(self, rhs: f64) -> Self::Output {
        LinearExpression::term(self, rhs)
    }
}

impl Mul<Variable> for f64 {
    type Output = LinearExpression;

    fn mul(self, rhs: Variable) -> Self::Output {
        LinearExpression::term(rhs, self)
    }
}

impl<R: Into<LinearExpression>> Add<R> for Variable {
    type Output = LinearExpression;

    fn add(self, rhs: R) -> Self::Output {
        LinearExpression::from(self) + rhs
    }
}

impl<R: Into<LinearExpression>> Sub<R> for Variable {
    type Output = LinearExpression;

    fn sub(self, rhs: R) -> Self::Output {
        LinearExpression::from(self) - rhs
    }
}

/// Linear expression plus a weighted sum of squared variables.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct QuadraticExpression {
    pub(super) linear: LinearExpression,

    /// `(x, w)` stands for `w × x²`.
    pub(super) squares: Vec<(Variable, f64)>,
}

impl QuadraticExpression {
    pub fn squares(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.squares.iter().copied()
    }

    pub const fn linear(&self) -> &LinearExpression {
        &self.linear
    }

    #[must_use]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.linear.evaluate(values)
            + self
                .squares
                .iter()
                .map(|(variable, weight)| weight * values[variable.0].powi(2))
                .sum::<f64>()
    }
}

impl From<LinearExpression> for QuadraticExpression {
    fn from(linear: LinearExpression) -> Self {
        Self { linear, squares: Vec::new() }
    }
}

impl<R: Into<Self>> Add<R> for QuadraticExpression {
    type Output = Self;

    fn add(mut self, rhs: R) -> Self::Output {
        let rhs: Self = rhs.into();
        self.linear += rhs.linear;
        self.squares.extend(rhs.squares);
        self
    }
}

impl<R: Into<Self>> Sub<R> for QuadraticExpression {
    type Output = Self;

    fn sub(self, rhs: R) -> Self::Output {
        let rhs: Self = rhs.into();
        self + rhs * -1.0
    }
}

impl Mul<f64> for QuadraticExpression {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self::Output {
        self.linear = self.linear * rhs;
        for (_, weight) in &mut self.squares {
            *weight *= rhs;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_evaluate() {
        let (x, y) = (Variable(0), Variable(1));
        let expression = 2.0 * x - y * 3.0 + 1.0;
        assert_abs_diff_eq!(expression.evaluate(&[1.0, 2.0]), -3.0);
    }

    #[test]
    fn test_sum() {
        let expression: LinearExpression = (0..3).map(|index| Variable(index) * 2.0).sum();
        assert_abs_diff_eq!(expression.evaluate(&[1.0, 1.0, 1.0]), 6.0);
    }

    #[test]
    fn test_quadratic_evaluate() {
        let x = Variable(0);
        let expression = QuadraticExpression {
            linear: LinearExpression::from(x) + 1.0,
            squares: vec![(x, 0.5)],
        };
        assert_abs_diff_eq!(expression.evaluate(&[2.0]), 5.0);
        assert_abs_diff_eq!((expression * -2.0).evaluate(&[2.0]), -10.0);
    }
}
