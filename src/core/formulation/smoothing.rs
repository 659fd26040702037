use bon::Builder;
use ndarray::Array1;

use crate::{
    core::{
        battery::BatterySpec,
        cycles::CycleBudget,
        formulation::{Report, collect_state_of_charge},
        horizon::TimeHorizon,
        physics::{Boundary, Physics},
        schedule::{Dispatch, DispatchSchedule},
        solver::{Backend, LinearExpression, Problem, Sense},
    },
    prelude::*,
};

/// Minimize the volatility of a renewable plant's merchant revenue by shifting its output through
/// the battery.
#[derive(Builder)]
pub struct Smoothing<'a> {
    battery: &'a BatterySpec,
    horizon: &'a TimeHorizon,

    /// Spot price per step, £/MWh.
    spot_prices: &'a [f64],

    /// Plant output per step, MWh.
    production: &'a [f64],
}

#[must_use]
pub struct SmoothingOutcome {
    pub report: Report,
    pub dispatch: Dispatch,

    /// Revenue per step without the battery.
    pub revenue_before: Array1<f64>,

    /// Revenue per step with the battery.
    pub revenue_after: Array1<f64>,

    pub std_before: f64,
    pub std_after: f64,

    /// Relative reduction of the revenue standard deviation.
    pub improvement: f64,
}

impl Smoothing<'_> {
    #[instrument(
        skip_all,
        fields(
            n_steps = self.horizon.len,
            power = %self.battery.power,
            capacity = %self.battery.capacity,
        ),
    )]
    pub fn solve(&self, backend: &impl Backend) -> Result<SmoothingOutcome> {
        ensure!(
            self.spot_prices.len() == self.horizon.len,
            "got {} spot prices for a horizon of {} steps",
            self.spot_prices.len(),
            self.horizon.len,
        );
        ensure!(
            self.production.len() == self.horizon.len,
            "got {} production values for a horizon of {} steps",
            self.production.len(),
            self.horizon.len,
        );

        let physics = Physics::new(self.battery, self.horizon);
        let mut problem = Problem::new();
        let volumes = physics.add_volumes(&mut problem);
        physics.add_cycle_limit(&mut problem, &volumes.discharge);
        let path = physics.add_state_of_charge(
            &mut problem,
            Boundary::Periodic,
            &volumes.charge_expressions(),
            &volumes.discharge_expressions(),
        )?;

        let revenue: Vec<LinearExpression> = self
            .spot_prices
            .iter()
            .zip(self.production)
            .zip(volumes.charge.iter().zip(&volumes.discharge))
            .map(|((price, production), (charge, discharge))| {
                (*discharge - *charge + *production) * *price
            })
            .collect();
        let variance = problem.add_variance(&revenue);
        problem.set_objective(Sense::Minimize, variance);

        let solution = backend.solve(&problem).context("failed to solve the smoothing problem")?;
        let dispatch = Dispatch {
            schedule: DispatchSchedule {
                charge: Array1::from(solution.values_of(&volumes.charge)),
                discharge: Array1::from(solution.values_of(&volumes.discharge)),
            },
            state_of_charge: collect_state_of_charge(std::slice::from_ref(&path), &solution),
        }
        .normalized(self.battery, self.horizon);

        let spot_prices = Array1::from(self.spot_prices.to_vec());
        let production = Array1::from(self.production.to_vec());
        let revenue_before = &spot_prices * &production;
        let revenue_after = &spot_prices * &(&production + &dispatch.schedule.net_discharge());
        let std_before = revenue_before.std(0.0);
        let std_after = revenue_after.std(0.0);
        let improvement = improvement(std_before, std_after);

        let report = Report::new(
            &solution,
            &CycleBudget::new(self.battery, self.horizon),
            &dispatch.schedule.discharge,
        );
        info!(std_before, std_after, improvement, report.annualized_cycles, %report.status, "optimized");

        Ok(SmoothingOutcome {
            report,
            dispatch,
            revenue_before,
            revenue_after,
            std_before,
            std_after,
            improvement,
        })
    }
}

/// `(σ₀ - σ₁) / σ₀`, zero for an already flat revenue.
#[must_use]
pub fn improvement(std_before: f64, std_after: f64) -> f64 {
    if std_before > 0.0 { (std_before - std_after) / std_before } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::{
        core::solver::{Clarabel, Settings},
        quantity::Quantity,
    };

    #[test]
    fn test_improvement() {
        assert_abs_diff_eq!(improvement(10.0, 4.0), 0.6);
        assert_abs_diff_eq!(improvement(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_smooths_alternating_output() -> Result {
        let horizon =
            TimeHorizon::new(Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(), TimeDelta::hours(1), 8)?;
        let battery = BatterySpec::builder()
            .power(Quantity(20.0))
            .capacity(Quantity(40.0))
            .max_cycles_per_year(400.0)
            .build()?;
        let spot_prices = [50.0; 8];
        let production = [40.0, 0.0, 40.0, 0.0, 40.0, 0.0, 40.0, 0.0];
        let outcome = Smoothing::builder()
            .battery(&battery)
            .horizon(&horizon)
            .spot_prices(&spot_prices)
            .production(&production)
            .build()
            .solve(&Clarabel::new(Settings::builder().eps_abs(1e-8).eps_rel(1e-8).build()))?;

        assert_abs_diff_eq!(outcome.std_before, 1000.0, epsilon = 1e-9);
        assert!(outcome.std_after < outcome.std_before);
        assert!(outcome.improvement > 0.0);
        let levels = &outcome.dispatch.state_of_charge.0;
        assert_abs_diff_eq!(levels[[0, 0]], levels[[8, 0]]);
        let limit = CycleBudget::new(&battery, &horizon).limit().unwrap();
        assert!(outcome.report.cycles <= limit + 1e-4);
        Ok(())
    }
}
