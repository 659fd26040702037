use bon::Builder;
use ndarray::Array1;

use crate::{
    core::{
        battery::BatterySpec,
        cycles::CycleBudget,
        formulation::{InitialCondition, Report, collect_state_of_charge},
        horizon::TimeHorizon,
        physics::{Boundary, Physics},
        prices::PriceScenarioSet,
        schedule::{Dispatch, DispatchSchedule},
        solver::{Backend, LinearExpression, Problem, Sense},
    },
    prelude::*,
};

/// Maximize the payoff of a single bid/offer schedule shared by all state-of-charge paths.
///
/// With several price scenarios, the mean price is used, which is exact for a linear payoff.
#[derive(Builder)]
pub struct Deterministic<'a> {
    battery: &'a BatterySpec,
    horizon: &'a TimeHorizon,
    prices: &'a PriceScenarioSet,
    initial: InitialCondition<'a>,
}

#[must_use]
pub struct DeterministicOutcome {
    pub report: Report,
    pub dispatch: Dispatch,

    /// Mean bid price per step.
    pub bid_prices: Array1<f64>,

    /// Mean offer price per step.
    pub offer_prices: Array1<f64>,

    /// Payoff of the normalized schedule.
    pub profit: f64,
}

impl Deterministic<'_> {
    #[instrument(skip_all, fields(n_steps = self.horizon.len))]
    pub fn solve(&self, backend: &impl Backend) -> Result<DeterministicOutcome> {
        ensure!(
            self.prices.n_steps() == self.horizon.len,
            "got {} price steps for a horizon of {} steps",
            self.prices.n_steps(),
            self.horizon.len,
        );
        let bid_prices = self.prices.mean_bid();
        let offer_prices = self.prices.mean_offer();

        let physics = Physics::new(self.battery, self.horizon);
        let mut problem = Problem::new();
        let volumes = physics.add_volumes(&mut problem);
        physics.add_cycle_limit(&mut problem, &volumes.discharge);

        let (charge, discharge) = (volumes.charge_expressions(), volumes.discharge_expressions());
        let boundaries = match self.initial {
            InitialCondition::Periodic => vec![Boundary::Periodic],
            InitialCondition::Scenarios(scenarios) => {
                scenarios.initial().iter().copied().map(Boundary::Initial).collect()
            }
        };
        let paths = boundaries
            .into_iter()
            .map(|boundary| physics.add_state_of_charge(&mut problem, boundary, &charge, &discharge))
            .collect::<Result<Vec<_>>>()?;

        // The volumes are shared, so the probability-weighted payoff `Σₖ pₖ Σₜ …` is the plain one:
        let payoff: LinearExpression = volumes
            .charge
            .iter()
            .zip(&volumes.discharge)
            .zip(bid_prices.iter().zip(&offer_prices))
            .map(|((charge, discharge), (bid, offer))| *discharge * *offer - *charge * *bid)
            .sum();
        problem.set_objective(Sense::Maximize, payoff);

        let solution = backend.solve(&problem).context("failed to solve the deterministic dispatch")?;
        let dispatch = Dispatch {
            schedule: DispatchSchedule {
                charge: Array1::from(solution.values_of(&volumes.charge)),
                discharge: Array1::from(solution.values_of(&volumes.discharge)),
            },
            state_of_charge: collect_state_of_charge(&paths, &solution),
        }
        .normalized(self.battery, self.horizon);

        let profit = dispatch.schedule.profit(&bid_prices, &offer_prices);
        let report = Report::new(
            &solution,
            &CycleBudget::new(self.battery, self.horizon),
            &dispatch.schedule.discharge,
        );
        info!(profit, report.cycles, report.annualized_cycles, %report.status, "optimized");

        Ok(DeterministicOutcome { report, dispatch, bid_prices, offer_prices, profit })
    }
}
