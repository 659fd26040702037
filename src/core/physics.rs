//! Constraints every formulation shares: volume limits, state-of-charge dynamics and cycle life.

use crate::{
    core::{
        battery::BatterySpec,
        cycles::CycleBudget,
        horizon::TimeHorizon,
        solver::{LinearExpression, Problem, Solution, Variable},
    },
    prelude::*,
};

/// How the first state of charge is tied down.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Boundary {
    /// Fixed initial level, MWh.
    Initial(f64),

    /// The battery ends where it started.
    Periodic,
}

/// Per-step charge and discharge volume variables.
pub struct Volumes {
    pub charge: Vec<Variable>,
    pub discharge: Vec<Variable>,
}

impl Volumes {
    pub fn charge_expressions(&self) -> Vec<LinearExpression> {
        self.charge.iter().copied().map(LinearExpression::from).collect()
    }

    pub fn discharge_expressions(&self) -> Vec<LinearExpression> {
        self.discharge.iter().copied().map(LinearExpression::from).collect()
    }
}

/// State-of-charge levels at the `T + 1` step boundaries.
///
/// A fixed initial level is a constant rather than a variable, and the periodic boundary reuses
/// the last level's variable, so both boundaries hold exactly in the solution.
pub struct StateOfChargePath(Vec<LinearExpression>);

impl StateOfChargePath {
    #[must_use]
    pub fn n_levels(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn values(&self, solution: &Solution) -> Vec<f64> {
        self.0.iter().map(|level| solution.evaluate(level)).collect()
    }
}

pub struct Physics<'a> {
    battery: &'a BatterySpec,
    horizon: &'a TimeHorizon,
}

impl<'a> Physics<'a> {
    pub const fn new(battery: &'a BatterySpec, horizon: &'a TimeHorizon) -> Self {
        Self { battery, horizon }
    }

    /// Add the volumes bounded by the per-step limit.
    pub fn add_volumes(&self, problem: &mut Problem) -> Volumes {
        let max_volume = self.battery.max_volume(self.horizon).0;
        Volumes {
            charge: problem.add_bounded_variables(self.horizon.len, 0.0, max_volume),
            discharge: problem.add_bounded_variables(self.horizon.len, 0.0, max_volume),
        }
    }

    /// Add a state-of-charge path bounded by the capacity and evolving with the realized volumes.
    pub fn add_state_of_charge(
        &self,
        problem: &mut Problem,
        boundary: Boundary,
        charge: &[LinearExpression],
        discharge: &[LinearExpression],
    ) -> Result<StateOfChargePath> {
        ensure!(charge.len() == self.horizon.len, "expected {} charge volumes", self.horizon.len);
        ensure!(discharge.len() == self.horizon.len, "expected {} discharge volumes", self.horizon.len);

        let capacity = self.battery.capacity.0;
        let levels = problem.add_bounded_variables(self.horizon.len, 0.0, capacity);
        let first = match boundary {
            Boundary::Initial(initial) => {
                ensure!(
                    (0.0..=capacity).contains(&initial),
                    "the initial state of charge {initial} is outside [0, {capacity}]",
                );
                LinearExpression::constant(initial)
            }
            Boundary::Periodic => LinearExpression::from(*levels.last().context("empty horizon")?),
        };
        let path: Vec<LinearExpression> = std::iter::once(first)
            .chain(levels.into_iter().map(LinearExpression::from))
            .collect();

        let efficiency = self.battery.one_way_efficiency();
        for (t, (charge, discharge)) in charge.iter().zip(discharge).enumerate() {
            let change = path[t + 1].clone() - path[t].clone();
            let flow = charge.clone() * efficiency - discharge.clone() * (1.0 / efficiency);
            problem.add_constraint((change - flow).equal_to(0.0));
        }

        Ok(StateOfChargePath(path))
    }

    /// Limit the discharged volume by the prorated cycle budget, if any.
    pub fn add_cycle_limit(&self, problem: &mut Problem, discharge: &[Variable]) {
        let budget = CycleBudget::new(self.battery, self.horizon);
        if let Some(limit) = budget.limit() {
            let cycles: LinearExpression =
                discharge.iter().map(|volume| *volume * budget.per_volume()).sum();
            problem.add_constraint(cycles.leq(limit));
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::{
        core::solver::{Backend, Clarabel, Sense, Settings},
        quantity::Quantity,
    };

    #[test]
    fn test_periodic_path_is_closed() -> Result {
        let battery = BatterySpec::builder().power(Quantity(10.0)).capacity(Quantity(10.0)).build()?;
        let horizon = TimeHorizon::new(Utc::now(), TimeDelta::minutes(30), 4)?;
        let physics = Physics::new(&battery, &horizon);

        let mut problem = Problem::new();
        let volumes = physics.add_volumes(&mut problem);
        let path = physics.add_state_of_charge(
            &mut problem,
            Boundary::Periodic,
            &volumes.charge_expressions(),
            &volumes.discharge_expressions(),
        )?;
        // Charge as much as possible: with a closed path, the battery must give it all back.
        let objective: LinearExpression = volumes.charge.iter().map(|volume| *volume * 1.0).sum();
        problem.set_objective(Sense::Maximize, objective);

        let solution = Clarabel::new(Settings::builder().eps_abs(1e-8).eps_rel(1e-8).build())
            .solve(&problem)?;
        let levels = path.values(&solution);
        assert_eq!(levels.len(), 5);
        assert_abs_diff_eq!(levels[0], levels[4]);

        let charged: f64 = solution.values_of(&volumes.charge).iter().sum();
        let discharged: f64 = solution.values_of(&volumes.discharge).iter().sum();
        assert_abs_diff_eq!(charged * 0.85, discharged, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn test_initial_out_of_range() -> Result {
        let battery = BatterySpec::builder().power(Quantity(10.0)).capacity(Quantity(10.0)).build()?;
        let horizon = TimeHorizon::new(Utc::now(), TimeDelta::minutes(30), 1)?;
        let physics = Physics::new(&battery, &horizon);
        let mut problem = Problem::new();
        let volumes = physics.add_volumes(&mut problem);
        let result = physics.add_state_of_charge(
            &mut problem,
            Boundary::Initial(11.0),
            &volumes.charge_expressions(),
            &volumes.discharge_expressions(),
        );
        assert!(result.is_err());
        Ok(())
    }
}
