use clap::Parser;

use crate::{
    core::{
        horizon::TimeHorizon,
        prices::{Normal, PriceModel, PriceScenarioSet},
    },
    prelude::*,
};

#[derive(Copy, Clone, Parser)]
pub struct PriceArgs {
    /// Mean minimum acceptable bid price, £/MWh.
    #[clap(long, default_value = "35", env = "MIN_BID_MEAN")]
    pub min_bid_mean: f64,

    /// Mean maximum acceptable offer price, £/MWh.
    #[clap(long, default_value = "120", env = "MAX_OFFER_MEAN")]
    pub max_offer_mean: f64,

    /// Standard deviation of both prices, £/MWh.
    #[clap(long, default_value = "10", env = "PRICE_STD_DEV")]
    pub price_std_dev: f64,

    /// Margin between the acceptable and the actually bid or offered price, £/MWh.
    #[clap(long, default_value = "10", env = "PRICE_MARGIN")]
    pub margin: f64,

    #[clap(long, default_value = "0", env = "PRICE_SEED")]
    pub price_seed: u64,
}

impl PriceArgs {
    /// Sample the acceptable prices and apply the margin.
    pub fn sample(&self, horizon: &TimeHorizon, n_scenarios: usize) -> Result<PriceScenarioSet> {
        let model = PriceModel::builder()
            .min_bid(Normal::new(self.min_bid_mean, self.price_std_dev))
            .max_offer(Normal::new(self.max_offer_mean, self.price_std_dev))
            .build();
        Ok(PriceScenarioSet::sample(horizon.len, n_scenarios, &model, self.price_seed)?
            .with_margin(self.margin))
    }
}
