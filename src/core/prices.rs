use bon::Builder;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::prelude::*;

/// Normal distribution parameters.
#[derive(Copy, Clone, Debug)]
pub struct Normal {
    pub mean: f64,
    pub std_dev: f64,
}

impl Normal {
    pub const fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Draw a sample with the Box–Muller transform.
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        if self.std_dev <= 0.0 {
            return self.mean;
        }
        let u1 = rng.random::<f64>().clamp(1e-12, 1.0);
        let u2 = rng.random::<f64>();
        let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        self.mean + z0 * self.std_dev
    }

    /// Draw a reproducible series.
    pub fn sample_series(&self, len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| self.sample(&mut rng)).collect()
    }
}

/// Distribution of the acceptable prices, independent per step and scenario.
#[derive(Copy, Clone, Debug, Builder)]
pub struct PriceModel {
    #[builder(default = Normal::new(35.0, 10.0))]
    pub min_bid: Normal,

    #[builder(default = Normal::new(120.0, 10.0))]
    pub max_offer: Normal,
}

impl Default for PriceModel {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Bid and offer prices per step (rows) and price scenario (columns), in £/MWh.
#[must_use]
#[derive(Clone, Debug)]
pub struct PriceScenarioSet {
    min_bid: Array2<f64>,
    max_offer: Array2<f64>,
}

impl PriceScenarioSet {
    pub fn new(min_bid: Array2<f64>, max_offer: Array2<f64>) -> Result<Self> {
        ensure!(
            min_bid.dim() == max_offer.dim(),
            "bid and offer prices have different shapes: {:?} vs {:?}",
            min_bid.dim(),
            max_offer.dim(),
        );
        ensure!(!min_bid.is_empty(), "there must be at least one step and one scenario");
        Ok(Self { min_bid, max_offer })
    }

    /// Single scenario with the same prices at every step.
    pub fn constant(n_steps: usize, bid: f64, offer: f64) -> Result<Self> {
        Self::new(Array2::from_elem((n_steps, 1), bid), Array2::from_elem((n_steps, 1), offer))
    }

    /// Single scenario from the price series.
    pub fn from_series(bid: Vec<f64>, offer: Vec<f64>) -> Result<Self> {
        let n_steps = bid.len();
        ensure!(offer.len() == n_steps, "expected {n_steps} offer prices, got {}", offer.len());
        Self::new(
            Array2::from_shape_vec((n_steps, 1), bid)?,
            Array2::from_shape_vec((n_steps, 1), offer)?,
        )
    }

    /// Generate reproducible Gaussian scenarios.
    #[instrument(skip_all, fields(n_steps = n_steps, n_scenarios = n_scenarios, seed = seed))]
    pub fn sample(
        n_steps: usize,
        n_scenarios: usize,
        model: &PriceModel,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let min_bid =
            Array2::from_shape_simple_fn((n_steps, n_scenarios), || model.min_bid.sample(&mut rng));
        let max_offer = Array2::from_shape_simple_fn((n_steps, n_scenarios), || {
            model.max_offer.sample(&mut rng)
        });
        debug!("sampled");
        Self::new(min_bid, max_offer)
    }

    /// Narrow the acceptable band by the margin to obtain the actual bid and offer prices.
    pub fn with_margin(&self, margin: f64) -> Self {
        Self { min_bid: &self.min_bid + margin, max_offer: &self.max_offer - margin }
    }

    #[must_use]
    pub fn n_steps(&self) -> usize {
        self.min_bid.nrows()
    }

    #[must_use]
    pub fn n_scenarios(&self) -> usize {
        self.min_bid.ncols()
    }

    #[must_use]
    pub const fn bid(&self) -> &Array2<f64> {
        &self.min_bid
    }

    #[must_use]
    pub const fn offer(&self) -> &Array2<f64> {
        &self.max_offer
    }

    /// Per-step mean bid price across the scenarios.
    #[must_use]
    pub fn mean_bid(&self) -> Array1<f64> {
        Self::mean_across_scenarios(&self.min_bid)
    }

    /// Per-step mean offer price across the scenarios.
    #[must_use]
    pub fn mean_offer(&self) -> Array1<f64> {
        Self::mean_across_scenarios(&self.max_offer)
    }

    #[must_use]
    pub fn bid_percentile(&self, percent: f64) -> Array1<f64> {
        self.min_bid.map_axis(Axis(1), |row| percentile(row, percent))
    }

    #[must_use]
    pub fn offer_percentile(&self, percent: f64) -> Array1<f64> {
        self.max_offer.map_axis(Axis(1), |row| percentile(row, percent))
    }

    fn mean_across_scenarios(prices: &Array2<f64>) -> Array1<f64> {
        #[expect(clippy::cast_precision_loss)]
        let n_scenarios = prices.ncols() as f64;
        prices.sum_axis(Axis(1)) / n_scenarios
    }
}

/// Percentile with linear interpolation between the closest ranks.
#[must_use]
pub fn percentile(values: ArrayView1<f64>, percent: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    #[expect(clippy::cast_precision_loss)]
    let rank = (percent / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (lower, upper) = (rank.floor() as usize, rank.ceil() as usize);

    #[expect(clippy::cast_precision_loss)]
    let fraction = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_sample_is_reproducible() -> Result {
        let model = PriceModel::default();
        let lhs = PriceScenarioSet::sample(48, 10, &model, 42)?;
        let rhs = PriceScenarioSet::sample(48, 10, &model, 42)?;
        assert_eq!(lhs.bid(), rhs.bid());
        assert_eq!(lhs.offer(), rhs.offer());
        assert_eq!(lhs.n_steps(), 48);
        assert_eq!(lhs.n_scenarios(), 10);
        Ok(())
    }

    #[test]
    fn test_sample_moments() -> Result {
        let prices = PriceScenarioSet::sample(200, 200, &PriceModel::default(), 0)?;
        let mean_bid = prices.mean_bid().mean().unwrap();
        let mean_offer = prices.mean_offer().mean().unwrap();
        assert_abs_diff_eq!(mean_bid, 35.0, epsilon = 0.5);
        assert_abs_diff_eq!(mean_offer, 120.0, epsilon = 0.5);
        assert_abs_diff_eq!(prices.bid().std(0.0), 10.0, epsilon = 0.5);
        Ok(())
    }

    #[test]
    fn test_with_margin() -> Result {
        let prices = PriceScenarioSet::constant(2, 35.0, 120.0)?.with_margin(10.0);
        assert_abs_diff_eq!(prices.bid()[[1, 0]], 45.0);
        assert_abs_diff_eq!(prices.offer()[[1, 0]], 110.0);
        Ok(())
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(PriceScenarioSet::from_series(vec![1.0, 2.0], vec![3.0]).is_err());
    }

    #[test]
    fn test_percentile() {
        let values = array![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_abs_diff_eq!(percentile(values.view(), 50.0), 3.0);
        assert_abs_diff_eq!(percentile(values.view(), 25.0), 2.0);
        assert_abs_diff_eq!(percentile(values.view(), 100.0), 5.0);

        let values = array![1.0, 2.0];
        assert_abs_diff_eq!(percentile(values.view(), 75.0), 1.75);
    }

    #[test]
    fn test_mean_across_scenarios() -> Result {
        let prices = PriceScenarioSet::new(array![[1.0, 3.0], [2.0, 6.0]], array![[0.0, 0.0], [0.0, 0.0]])?;
        assert_eq!(prices.mean_bid(), array![2.0, 4.0]);
        Ok(())
    }
}
