use chrono::TimeDelta;
use clap::Parser;
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{
    cli::{
        battery::BatteryLifetimeArgs,
        ninja::{NinjaArgs, WindArgs},
        solver::SolverArgs,
    },
    core::{
        battery::BatterySpec,
        formulation::smoothing::Smoothing,
        horizon::TimeHorizon,
        prices::Normal,
        series::{ForwardFill, Resample},
        sweep::{DesignSweep, SweepSurface},
    },
    prelude::*,
    quantity::Quantity,
    tables::{build_revenue_table, build_summary_table, build_sweep_table, format_cost},
};

#[derive(Parser)]
pub struct SmoothArgs {
    /// Wind farm nameplate capacity in megawatts.
    #[clap(long, default_value = "200", env = "WIND_CAPACITY_MW")]
    pub wind_capacity: f64,

    /// Battery power that the sweep multipliers scale, in megawatts.
    #[clap(long, default_value = "20", env = "BASE_BATTERY_POWER_MW")]
    pub base_power: f64,

    /// Number of leading steps of the wind data to optimize over.
    #[clap(long, default_value = "168", env = "SMOOTHING_STEPS")]
    pub n_steps: usize,

    #[clap(long = "step-minutes", default_value = "60", env = "SMOOTHING_STEP_MINUTES")]
    pub step_minutes: i64,

    /// Mean spot price, £/MWh.
    #[clap(long, default_value = "55", env = "SPOT_MEAN")]
    pub spot_mean: f64,

    /// Spot price volatility, £/MWh.
    #[clap(long, default_value = "20", env = "SPOT_VOLATILITY")]
    pub spot_volatility: f64,

    #[clap(long, default_value = "0", env = "PRICE_SEED")]
    pub price_seed: u64,

    #[clap(flatten)]
    pub lifetime: BatteryLifetimeArgs,

    #[clap(flatten)]
    pub ninja: NinjaArgs,

    #[clap(flatten)]
    pub wind: WindArgs,

    #[clap(flatten)]
    pub solver: SolverArgs,

    /// Number of revenue steps to print for the best battery size.
    #[clap(long, default_value = "24", env = "PRINT_STEPS")]
    pub print_steps: usize,
}

/// Sweep battery sizes that smooth a wind farm's merchant revenue.
#[instrument(skip_all)]
pub fn smooth(args: &SmoothArgs) -> Result {
    let step = TimeDelta::minutes(args.step_minutes);
    let wind = args
        .ninja
        .new_client()
        .load_wind_data(&args.wind.query())?
        .into_iter()
        .forward_fill()
        .resample_forward(step)
        .take(args.n_steps)
        .collect_vec();
    let (start, _) = *wind.first().context("no wind data")?;
    let horizon = TimeHorizon::new(start, step, wind.len())?;
    info!(n_steps = horizon.len, %start, "loaded the wind data");

    // Capacity factor to energy per step:
    let production = wind
        .iter()
        .map(|(_, capacity_factor)| capacity_factor * args.wind_capacity * horizon.step_hours())
        .collect_vec();
    let spot_prices =
        Normal::new(args.spot_mean, args.spot_volatility).sample_series(horizon.len, args.price_seed);

    let backend = args.solver.backend();
    let points = DesignSweep::builder()
        .horizon(&horizon)
        .spot_prices(&spot_prices)
        .production(&production)
        .plant_capacity(args.wind_capacity)
        .base_power(args.base_power)
        .round_trip_efficiency(args.lifetime.round_trip_efficiency)
        .maybe_max_cycles_per_year(args.lifetime.max_cycles_per_year())
        .build()
        .run(&backend);
    println!("{}", build_sweep_table(&SweepSurface::pivot(&points)));

    let Some(best) = points
        .iter()
        .filter(|point| point.improvement.is_some())
        .max_by_key(|point| point.improvement.map(OrderedFloat))
    else {
        bail!("none of the battery sizes could be solved");
    };
    info!(best.power, best.energy, "re-solving the best battery size…");
    let battery = BatterySpec::builder()
        .power(Quantity(best.power))
        .capacity(Quantity(best.energy))
        .round_trip_efficiency(args.lifetime.round_trip_efficiency)
        .maybe_max_cycles_per_year(args.lifetime.max_cycles_per_year())
        .build()?;
    let outcome = Smoothing::builder()
        .battery(&battery)
        .horizon(&horizon)
        .spot_prices(&spot_prices)
        .production(&production)
        .build()
        .solve(&backend)?;
    println!(
        "{}",
        build_revenue_table(horizon.timestamps(), &spot_prices, &production, &outcome, args.print_steps),
    );
    println!(
        "{}",
        build_summary_table(
            &outcome.report,
            &[
                ("Battery power", battery.power.to_string()),
                ("Battery capacity", battery.capacity.to_string()),
                ("Revenue σ without battery", format_cost(outcome.std_before)),
                ("Revenue σ with battery", format_cost(outcome.std_after)),
                ("Improvement", format!("{:.1}%", outcome.improvement * 100.0)),
            ],
        ),
    );
    Ok(())
}
