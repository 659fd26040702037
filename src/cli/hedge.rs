use chrono::{DateTime, Utc};
use clap::Parser;

use crate::{
    cli::{battery::BatteryArgs, horizon::HorizonArgs, prices::PriceArgs, solver::SolverArgs},
    core::{
        formulation::stochastic::{RiskMeasure, Stochastic},
        probability::SocScenarios,
    },
    prelude::*,
    tables::{
        build_price_bands_table,
        build_scenario_table,
        build_schedule_table,
        build_summary_table,
        format_cost,
    },
};

#[derive(Parser)]
pub struct HedgeArgs {
    /// Last step, inclusive.
    #[clap(long, default_value = "2018-01-15T00:00:00Z", env = "HEDGE_END")]
    pub end: DateTime<Utc>,

    #[clap(long, default_value = "500", env = "PRICE_SCENARIOS")]
    pub price_scenarios: usize,

    /// Number of initial state-of-charge levels between 10% and 90%.
    #[clap(long, default_value = "9", env = "SOC_SCENARIOS")]
    pub soc_scenarios: usize,

    /// Weight of the profit variance in the objective.
    #[clap(long, default_value = "1e-4", env = "RISK_COEFFICIENT")]
    pub risk_coefficient: f64,

    /// Maximize the expected profit only.
    #[clap(long, env = "RISK_NEUTRAL")]
    pub risk_neutral: bool,

    #[clap(flatten)]
    pub battery: BatteryArgs,

    #[clap(flatten)]
    pub horizon: HorizonArgs,

    #[clap(flatten)]
    pub prices: PriceArgs,

    #[clap(flatten)]
    pub solver: SolverArgs,

    /// Number of schedule steps to print.
    #[clap(long, default_value = "48", env = "PRINT_STEPS")]
    pub print_steps: usize,
}

impl HedgeArgs {
    pub const fn risk(&self) -> RiskMeasure {
        if self.risk_neutral {
            RiskMeasure::None
        } else {
            RiskMeasure::Variance { coefficient: self.risk_coefficient }
        }
    }
}

/// Firm bids and offers under uncertain prices and initial state of charge.
#[instrument(skip_all)]
pub fn hedge(args: &HedgeArgs) -> Result {
    let battery = args.battery.spec()?;
    let horizon = args.horizon.until(args.end)?;
    let prices = args.prices.sample(&horizon, args.price_scenarios)?;
    let scenarios = SocScenarios::parabolic(battery.capacity, args.soc_scenarios)?;
    info!(n_steps = horizon.len, n_price_scenarios = prices.n_scenarios(), "optimizing…");

    let outcome = Stochastic::builder()
        .battery(&battery)
        .horizon(&horizon)
        .prices(&prices)
        .scenarios(&scenarios)
        .risk(args.risk())
        .build()
        .solve(&args.solver.backend())?;

    println!("{}", build_price_bands_table(horizon.timestamps(), &prices, args.print_steps));
    println!(
        "{}",
        build_schedule_table(
            horizon.timestamps(),
            &outcome.firm,
            &prices.mean_bid(),
            &prices.mean_offer(),
            &outcome.state_of_charge.expected(scenarios.weights()),
            args.print_steps,
        ),
    );
    println!("{}", build_scenario_table(&scenarios, &outcome));
    println!(
        "{}",
        build_summary_table(
            &outcome.report,
            &[
                ("Expected profit", format_cost(outcome.expected_profit)),
                ("Lost revenue", format_cost(-outcome.lost_revenue)),
                ("Saved cost (not credited)", format_cost(outcome.saved_cost)),
                ("Risk", format_cost(-outcome.risk)),
                (
                    "Worst scenario",
                    format_cost(outcome.scenario_profits.iter().copied().fold(f64::INFINITY, f64::min)),
                ),
            ],
        ),
    );
    Ok(())
}
