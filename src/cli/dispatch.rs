use chrono::{DateTime, Utc};
use clap::Parser;

use crate::{
    cli::{battery::BatteryArgs, horizon::HorizonArgs, prices::PriceArgs, solver::SolverArgs},
    core::{
        formulation::{InitialCondition, deterministic::Deterministic},
        horizon::TimeHorizon,
        prices::PriceScenarioSet,
        probability::SocScenarios,
    },
    prelude::*,
    tables::{build_schedule_table, build_summary_table, format_cost},
};

#[derive(Parser)]
pub struct DispatchArgs {
    /// Last step, inclusive.
    #[clap(long, default_value = "2019-01-01T00:00:00Z", env = "DISPATCH_END")]
    pub end: DateTime<Utc>,

    #[clap(flatten)]
    pub common: DeterministicArgs,
}

#[derive(Parser)]
pub struct BalanceArgs {
    /// Last step, inclusive.
    #[clap(long, default_value = "2018-02-01T00:00:00Z", env = "BALANCE_END")]
    pub end: DateTime<Utc>,

    #[clap(long, default_value = "100", env = "PRICE_SCENARIOS")]
    pub price_scenarios: usize,

    /// Number of initial state-of-charge levels between 10% and 90%.
    #[clap(long, default_value = "1", env = "SOC_SCENARIOS")]
    pub soc_scenarios: usize,

    #[clap(flatten)]
    pub common: DeterministicArgs,
}

#[derive(Parser)]
pub struct DeterministicArgs {
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

/// Full-year single-path dispatch with a periodic state of charge.
#[instrument(skip_all)]
pub fn dispatch(args: &DispatchArgs) -> Result {
    let horizon = args.common.horizon.until(args.end)?;
    let prices = args.common.prices.sample(&horizon, 1)?;
    solve(&args.common, &horizon, &prices, InitialCondition::Periodic)
}

/// One schedule for every initial state of charge, weighted by its probability.
#[instrument(skip_all)]
pub fn balance(args: &BalanceArgs) -> Result {
    let horizon = args.common.horizon.until(args.end)?;
    let prices = args.common.prices.sample(&horizon, args.price_scenarios)?;
    let scenarios = SocScenarios::parabolic(args.common.battery.capacity, args.soc_scenarios)?;
    solve(&args.common, &horizon, &prices, InitialCondition::Scenarios(&scenarios))
}

fn solve(
    args: &DeterministicArgs,
    horizon: &TimeHorizon,
    prices: &PriceScenarioSet,
    initial: InitialCondition<'_>,
) -> Result {
    let battery = args.battery.spec()?;
    info!(n_steps = horizon.len, n_price_scenarios = prices.n_scenarios(), "optimizing…");
    let outcome = Deterministic::builder()
        .battery(&battery)
        .horizon(horizon)
        .prices(prices)
        .initial(initial)
        .build()
        .solve(&args.solver.backend())?;

    let weights = match initial {
        InitialCondition::Periodic => vec![1.0],
        InitialCondition::Scenarios(scenarios) => scenarios.weights().to_vec(),
    };
    println!(
        "{}",
        build_schedule_table(
            horizon.timestamps(),
            &outcome.dispatch.schedule,
            &outcome.bid_prices,
            &outcome.offer_prices,
            &outcome.dispatch.state_of_charge.expected(&weights),
            args.print_steps,
        ),
    );
    println!(
        "{}",
        build_summary_table(&outcome.report, &[("Profit", format_cost(outcome.profit))]),
    );
    Ok(())
}
