use crate::{prelude::*, quantity::energy::MegawattHours};

/// Discrete distribution of the initial state of charge.
#[must_use]
#[derive(Clone, Debug)]
pub struct SocScenarios {
    initial: Vec<f64>,
    weights: Vec<f64>,
}

impl SocScenarios {
    /// Evenly spaced initial levels from 10% to 90% of the capacity, most likely at a half charge.
    ///
    /// Each weight is `(x₀ - ½E)² × 1.1 - (x - ½E)²` before normalization, so that even the extreme
    /// levels keep a small but positive probability.
    pub fn parabolic(capacity: MegawattHours, n_scenarios: usize) -> Result<Self> {
        ensure!(n_scenarios != 0, "there must be at least one state-of-charge scenario");
        let capacity = capacity.0;
        let initial = linspace(0.1 * capacity, 0.9 * capacity, n_scenarios);
        let half = 0.5 * capacity;
        let edge = (initial[0] - half).powi(2) * 1.1;
        let weights = initial.iter().map(|level| edge - (level - half).powi(2)).collect();
        Self::from_weights(initial, weights)
    }

    /// The initial level is known for sure.
    pub fn single(initial: f64) -> Self {
        Self { initial: vec![initial], weights: vec![1.0] }
    }

    /// Build from arbitrary non-negative weights, normalizing them.
    pub fn from_weights(initial: Vec<f64>, weights: Vec<f64>) -> Result<Self> {
        ensure!(!initial.is_empty(), "there must be at least one state-of-charge scenario");
        ensure!(
            initial.len() == weights.len(),
            "got {} levels but {} weights",
            initial.len(),
            weights.len(),
        );
        ensure!(
            weights.iter().all(|weight| *weight >= 0.0),
            "the weights must be non-negative: {weights:?}",
        );
        let total: f64 = weights.iter().sum();
        ensure!(total > 0.0, "the weights must have a positive sum");
        let weights = weights.into_iter().map(|weight| weight / total).collect();
        Ok(Self { initial, weights })
    }

    #[must_use]
    pub const fn n_scenarios(&self) -> usize {
        self.initial.len()
    }

    #[must_use]
    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    /// Normalized probabilities.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.initial.iter().copied().zip(self.weights.iter().copied())
    }
}

/// `n` evenly spaced values from `start` to `end`, both included.
#[must_use]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            #[expect(clippy::cast_precision_loss)]
            let step = (end - start) / (n - 1) as f64;

            #[expect(clippy::cast_precision_loss)]
            (0..n).map(|i| step.mul_add(i as f64, start)).collect()
        }
    }
}
