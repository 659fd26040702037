//! Firm bids and offers under uncertain prices and initial state of charge.
//!
//! The firm volumes are committed before the uncertainty resolves. Every state-of-charge scenario
//! may then leave part of them unrealized: the battery buys less than bid or sells less than
//! offered. An unrealized offer loses the expected offer price, and the spread of profit across
//! the price scenarios is penalized as risk.

use bon::Builder;
use ndarray::{Array1, Array2, Axis};

use crate::{
    core::{
        battery::BatterySpec,
        cycles::CycleBudget,
        formulation::{Report, collect_state_of_charge},
        horizon::TimeHorizon,
        physics::{Boundary, Physics},
        prices::PriceScenarioSet,
        probability::SocScenarios,
        schedule::{Dispatch, DispatchSchedule, StateOfCharge},
        solver::{Backend, LinearExpression, Problem, QuadraticExpression, Sense, Variable},
    },
    prelude::*,
};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum RiskMeasure {
    #[default]
    None,

    /// `coefficient × Var(profit)` across the price scenarios.
    ///
    /// This is the population variance: squared deviations are divided by the number of scenarios `S`,
    /// not by `S − 1`.
    Variance { coefficient: f64 },
}

#[derive(Builder)]
pub struct Stochastic<'a> {
    battery: &'a BatterySpec,
    horizon: &'a TimeHorizon,
    prices: &'a PriceScenarioSet,
    scenarios: &'a SocScenarios,

    #[builder(default)]
    risk: RiskMeasure,
}

#[must_use]
pub struct StochasticOutcome {
    pub report: Report,

    /// Committed bid and offer volumes.
    pub firm: DispatchSchedule,

    /// Bid volume left unrealized, step × state-of-charge scenario.
    pub unrealized_charge: Array2<f64>,

    /// Offer volume left unrealized, step × state-of-charge scenario.
    pub unrealized_discharge: Array2<f64>,

    pub state_of_charge: StateOfCharge,

    /// Mean profit across the price scenarios minus the lost revenue.
    pub expected_profit: f64,

    pub lost_revenue: f64,

    /// Expected cost of the unrealized bids. Reported only, the objective does not credit it.
    pub saved_cost: f64,

    pub risk: f64,

    /// Firm profit per price scenario.
    pub scenario_profits: Array1<f64>,
}

impl StochasticOutcome {
    /// Schedule actually executed in the state-of-charge scenario.
    pub fn realized(&self, scenario: usize) -> DispatchSchedule {
        DispatchSchedule {
            charge: &self.firm.charge - &self.unrealized_charge.column(scenario),
            discharge: &self.firm.discharge - &self.unrealized_discharge.column(scenario),
        }
    }
}

struct Unrealized {
    charge: Vec<Variable>,
    discharge: Vec<Variable>,
}

impl Stochastic<'_> {
    #[instrument(
        skip_all,
        fields(
            n_steps = self.horizon.len,
            n_price_scenarios = self.prices.n_scenarios(),
            n_soc_scenarios = self.scenarios.n_scenarios(),
        ),
    )]
    pub fn solve(&self, backend: &impl Backend) -> Result<StochasticOutcome> {
        ensure!(
            self.prices.n_steps() == self.horizon.len,
            "got {} price steps for a horizon of {} steps",
            self.prices.n_steps(),
            self.horizon.len,
        );
        let mean_bid = self.prices.mean_bid();
        let mean_offer = self.prices.mean_offer();

        let physics = Physics::new(self.battery, self.horizon);
        let mut problem = Problem::new();
        let firm = physics.add_volumes(&mut problem);
        physics.add_cycle_limit(&mut problem, &firm.discharge);

        let mut unrealized = Vec::with_capacity(self.scenarios.n_scenarios());
        let mut paths = Vec::with_capacity(self.scenarios.n_scenarios());
        for initial in self.scenarios.initial() {
            let scenario = Unrealized {
                charge: Self::add_unrealized(&mut problem, &firm.charge),
                discharge: Self::add_unrealized(&mut problem, &firm.discharge),
            };
            let realized_charge: Vec<LinearExpression> =
                firm.charge.iter().zip(&scenario.charge).map(|(firm, lost)| *firm - *lost).collect();
            let realized_discharge: Vec<LinearExpression> = firm
                .discharge
                .iter()
                .zip(&scenario.discharge)
                .map(|(firm, lost)| *firm - *lost)
                .collect();
            paths.push(physics.add_state_of_charge(
                &mut problem,
                Boundary::Initial(*initial),
                &realized_charge,
                &realized_discharge,
            )?);
            unrealized.push(scenario);
        }

        let scenario_profits: Vec<LinearExpression> = (0..self.prices.n_scenarios())
            .map(|s| {
                Self::payoff(
                    &firm.charge,
                    &firm.discharge,
                    self.prices.bid().column(s).iter().copied(),
                    self.prices.offer().column(s).iter().copied(),
                )
            })
            .collect();
        let mean_profit =
            Self::payoff(&firm.charge, &firm.discharge, mean_bid.iter().copied(), mean_offer.iter().copied());
        let lost_revenue: LinearExpression = unrealized
            .iter()
            .zip(self.scenarios.weights())
            .flat_map(|(scenario, weight)| {
                scenario.discharge.iter().zip(&mean_offer).map(move |(lost, price)| *lost * (weight * price))
            })
            .sum();

        let mut objective = QuadraticExpression::from(mean_profit - lost_revenue);
        if let RiskMeasure::Variance { coefficient } = self.risk {
            ensure!(coefficient >= 0.0, "the risk coefficient must be non-negative, got {coefficient}");
            objective = objective - problem.add_variance(&scenario_profits) * coefficient;
        }
        problem.set_objective(Sense::Maximize, objective);

        let solution = backend.solve(&problem).context("failed to solve the stochastic dispatch")?;

        let Dispatch { schedule: firm_schedule, state_of_charge } = Dispatch {
            schedule: DispatchSchedule {
                charge: Array1::from(solution.values_of(&firm.charge)),
                discharge: Array1::from(solution.values_of(&firm.discharge)),
            },
            state_of_charge: collect_state_of_charge(&paths, &solution),
        }
        .normalized(self.battery, self.horizon);
        let unrealized_charge = Self::collect_unrealized(
            &firm_schedule.charge,
            unrealized.iter().map(|scenario| solution.values_of(&scenario.charge)),
        );
        let unrealized_discharge = Self::collect_unrealized(
            &firm_schedule.discharge,
            unrealized.iter().map(|scenario| solution.values_of(&scenario.discharge)),
        );

        let weights = Array1::from(self.scenarios.weights().to_vec());
        let lost_revenue = mean_offer.dot(&unrealized_discharge.dot(&weights));
        let saved_cost = mean_bid.dot(&unrealized_charge.dot(&weights));
        let scenario_profits = self.prices.offer().t().dot(&firm_schedule.discharge)
            - self.prices.bid().t().dot(&firm_schedule.charge);
        let expected_profit = scenario_profits.mean().unwrap_or_default() - lost_revenue;
        let risk = match self.risk {
            RiskMeasure::None => 0.0,
            RiskMeasure::Variance { coefficient } => coefficient * scenario_profits.var(0.0),
        };

        let report = Report::new(
            &solution,
            &CycleBudget::new(self.battery, self.horizon),
            &firm_schedule.discharge,
        );
        info!(expected_profit, lost_revenue, saved_cost, risk, report.cycles, %report.status, "optimized");

        Ok(StochasticOutcome {
            report,
            firm: firm_schedule,
            unrealized_charge,
            unrealized_discharge,
            state_of_charge,
            expected_profit,
            lost_revenue,
            saved_cost,
            risk,
            scenario_profits,
        })
    }

    /// Add `0 ≤ unrealized[t] ≤ firm[t]`.
    fn add_unrealized(problem: &mut Problem, firm: &[Variable]) -> Vec<Variable> {
        firm.iter()
            .map(|firm| {
                let unrealized = problem.add_variable();
                problem.add_constraint(LinearExpression::from(unrealized).geq(0.0));
                problem.add_constraint((unrealized - *firm).leq(0.0));
                unrealized
            })
            .collect()
    }

    fn payoff(
        charge: &[Variable],
        discharge: &[Variable],
        bid: impl Iterator<Item = f64>,
        offer: impl Iterator<Item = f64>,
    ) -> LinearExpression {
        charge
            .iter()
            .zip(discharge)
            .zip(bid.zip(offer))
            .map(|((charge, discharge), (bid, offer))| *discharge * offer - *charge * bid)
            .sum()
    }

    /// Collect the unrealized volumes into a step × scenario matrix, clamped into `[0, firm]`.
    fn collect_unrealized(firm: &Array1<f64>, scenarios: impl Iterator<Item = Vec<f64>>) -> Array2<f64> {
        let columns: Vec<Array1<f64>> = scenarios
            .map(|volumes| {
                volumes
                    .iter()
                    .zip(firm)
                    .map(|(volume, firm)| volume.clamp(0.0, *firm))
                    .collect()
            })
            .collect();
        let mut matrix = Array2::zeros((firm.len(), columns.len()));
        for (k, column) in columns.into_iter().enumerate() {
            matrix.index_axis_mut(Axis(1), k).assign(&column);
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::{
        core::{
            formulation::{InitialCondition, deterministic::Deterministic},
            prices::PriceModel,
            solver::{Clarabel, Settings},
        },
        quantity::Quantity,
    };

    fn backend() -> Clarabel {
        Clarabel::new(Settings::builder().eps_abs(1e-9).eps_rel(1e-9).max_iter(500).build())
    }

    fn horizon(len: usize) -> Result<TimeHorizon> {
        TimeHorizon::new(Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap(), TimeDelta::minutes(30), len)
    }

    fn battery() -> Result<BatterySpec> {
        BatterySpec::builder()
            .power(Quantity(10.0))
            .capacity(Quantity(10.0))
            .max_cycles_per_year(400.0)
            .build()
    }

    #[test]
    fn test_degenerate_matches_deterministic() -> Result {
        let battery = BatterySpec::builder().power(Quantity(10.0)).capacity(Quantity(10.0)).build()?;
        let horizon = horizon(4)?;
        let prices =
            PriceScenarioSet::from_series(vec![30.0, 30.0, 200.0, 200.0], vec![10.0, 10.0, 150.0, 140.0])?;
        let scenarios = SocScenarios::single(0.0);

        let deterministic = Deterministic::builder()
            .battery(&battery)
            .horizon(&horizon)
            .prices(&prices)
            .initial(InitialCondition::Scenarios(&scenarios))
            .build()
            .solve(&backend())?;
        let stochastic = Stochastic::builder()
            .battery(&battery)
            .horizon(&horizon)
            .prices(&prices)
            .scenarios(&scenarios)
            .build()
            .solve(&backend())?;

        assert_abs_diff_eq!(deterministic.report.objective, 940.0, epsilon = 1e-3);
        assert_abs_diff_eq!(stochastic.report.objective, deterministic.report.objective, epsilon = 1e-3);
        assert_abs_diff_eq!(stochastic.expected_profit, deterministic.profit, epsilon = 1e-3);

        let realized = stochastic.realized(0);
        for t in 0..4 {
            assert_abs_diff_eq!(realized.charge[t], deterministic.dispatch.schedule.charge[t], epsilon = 1e-3);
            assert_abs_diff_eq!(
                realized.discharge[t],
                deterministic.dispatch.schedule.discharge[t],
                epsilon = 1e-3,
            );
        }
        assert_abs_diff_eq!(realized.discharge[2], 5.0, epsilon = 1e-3);
        assert_abs_diff_eq!(realized.discharge[3], 3.5, epsilon = 1e-3);
        assert_abs_diff_eq!(stochastic.risk, 0.0);
        Ok(())
    }

    #[test]
    fn test_scenarios_stay_feasible() -> Result {
        let battery = battery()?;
        let horizon = horizon(24)?;
        let prices = PriceScenarioSet::sample(24, 30, &PriceModel::default(), 0)?.with_margin(10.0);
        let scenarios = SocScenarios::parabolic(battery.capacity, 5)?;
        let outcome = Stochastic::builder()
            .battery(&battery)
            .horizon(&horizon)
            .prices(&prices)
            .scenarios(&scenarios)
            .risk(RiskMeasure::Variance { coefficient: 1e-4 })
            .build()
            .solve(&backend())?;

        let efficiency = battery.one_way_efficiency();
        let levels = &outcome.state_of_charge.0;
        assert_eq!(levels.dim(), (25, 5));
        assert_eq!(outcome.unrealized_charge.dim(), (24, 5));
        assert_eq!(outcome.scenario_profits.len(), 30);
        for (k, initial) in scenarios.initial().iter().enumerate() {
            assert_eq!(levels[[0, k]], *initial);
            let realized = outcome.realized(k);
            assert!(realized.charge.iter().all(|volume| *volume >= 0.0));
            assert!(realized.discharge.iter().all(|volume| *volume >= 0.0));
            for t in 0..24 {
                let expected =
                    levels[[t, k]] + realized.charge[t] * efficiency - realized.discharge[t] / efficiency;
                assert_abs_diff_eq!(levels[[t + 1, k]], expected, epsilon = 1e-4);
            }
        }
        assert!(levels.iter().all(|level| (0.0..=10.0).contains(level)));
        assert!(outcome.lost_revenue >= 0.0);
        assert!(outcome.saved_cost >= 0.0);
        assert!(outcome.risk >= 0.0);
        let mean_profit = outcome.scenario_profits.mean().unwrap();
        let population_variance =
            outcome.scenario_profits.iter().map(|profit| (profit - mean_profit).powi(2)).sum::<f64>() / 30.0;
        assert_abs_diff_eq!(outcome.risk, 1e-4 * population_variance, epsilon = 1e-6);
        let limit = CycleBudget::new(&battery, &horizon).limit().unwrap();
        assert!(outcome.report.cycles <= limit + 1e-4);
        Ok(())
    }

    #[test]
    fn test_risk_aversion_reduces_variance() -> Result {
        let battery = battery()?;
        let horizon = horizon(24)?;
        let prices = PriceScenarioSet::sample(24, 30, &PriceModel::default(), 3)?.with_margin(10.0);
        let scenarios = SocScenarios::single(5.0);
        let solve = |risk| {
            Stochastic::builder()
                .battery(&battery)
                .horizon(&horizon)
                .prices(&prices)
                .scenarios(&scenarios)
                .risk(risk)
                .build()
                .solve(&backend())
        };
        let neutral = solve(RiskMeasure::None)?;
        let averse = solve(RiskMeasure::Variance { coefficient: 1.0 })?;
        let (averse_variance, neutral_variance) =
            (averse.scenario_profits.var(0.0), neutral.scenario_profits.var(0.0));
        assert!(averse_variance <= neutral_variance.mul_add(1.0 + 1e-6, 1e-3));
        assert!(averse.expected_profit <= neutral.expected_profit + 1e-3);
        Ok(())
    }
}
