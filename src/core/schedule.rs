use ndarray::{Array1, Array2, Axis};

use crate::core::{battery::BatterySpec, horizon::TimeHorizon};

/// Charged (bid) and discharged (offered) volume per step, MWh.
#[must_use]
#[derive(Clone, Debug)]
pub struct DispatchSchedule {
    pub charge: Array1<f64>,
    pub discharge: Array1<f64>,
}

impl DispatchSchedule {
    /// Net volume delivered to the grid per step.
    #[must_use]
    pub fn net_discharge(&self) -> Array1<f64> {
        &self.discharge - &self.charge
    }

    /// Volume-weighted payoff: `Σ offer × discharge − bid × charge`.
    #[must_use]
    pub fn profit(&self, bid: &Array1<f64>, offer: &Array1<f64>) -> f64 {
        offer.dot(&self.discharge) - bid.dot(&self.charge)
    }

    fn clamp(&mut self, max_volume: f64) {
        self.charge.mapv_inplace(|volume| volume.clamp(0.0, max_volume));
        self.discharge.mapv_inplace(|volume| volume.clamp(0.0, max_volume));
    }
}

/// State of charge per boundary (`T + 1` rows) and scenario (columns), MWh.
#[must_use]
#[derive(Clone, Debug)]
pub struct StateOfCharge(pub Array2<f64>);

impl StateOfCharge {
    /// Expected level per boundary given the scenario weights.
    #[must_use]
    pub fn expected(&self, weights: &[f64]) -> Array1<f64> {
        self.0.map_axis(Axis(1), |row| row.iter().zip(weights).map(|(level, weight)| level * weight).sum::<f64>())
    }

    fn clamp(&mut self, capacity: f64) {
        self.0.mapv_inplace(|level| level.clamp(0.0, capacity));
    }
}

/// Solved dispatch before any metric is computed.
#[must_use]
pub struct Dispatch {
    pub schedule: DispatchSchedule,
    pub state_of_charge: StateOfCharge,
}

impl Dispatch {
    /// Clamp the solver's output into the feasible envelope.
    ///
    /// Interior-point solvers land slightly outside the bounds, this removes the numerical noise.
    pub fn normalized(mut self, battery: &BatterySpec, horizon: &TimeHorizon) -> Self {
        self.schedule.clamp(battery.max_volume(horizon).0);
        self.state_of_charge.clamp(battery.capacity.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, Utc};
    use ndarray::array;

    use super::*;
    use crate::{prelude::*, quantity::Quantity};

    #[test]
    fn test_normalized() -> Result {
        let battery = BatterySpec::builder().power(Quantity(10.0)).capacity(Quantity(10.0)).build()?;
        let horizon = TimeHorizon::new(Utc::now(), TimeDelta::minutes(30), 2)?;
        let dispatch = Dispatch {
            schedule: DispatchSchedule { charge: array![-1e-9, 5.000_001], discharge: array![2.0, 0.0] },
            state_of_charge: StateOfCharge(array![[-1e-7], [10.000_01], [3.0]]),
        }
        .normalized(&battery, &horizon);
        assert_eq!(dispatch.schedule.charge, array![0.0, 5.0]);
        assert_eq!(dispatch.schedule.discharge, array![2.0, 0.0]);
        assert_eq!(dispatch.state_of_charge.0, array![[0.0], [10.0], [3.0]]);
        Ok(())
    }

    #[test]
    fn test_profit() {
        let schedule = DispatchSchedule { charge: array![5.0, 0.0], discharge: array![0.0, 4.0] };
        assert_abs_diff_eq!(schedule.profit(&array![35.0, 35.0], &array![120.0, 120.0]), 305.0);
        assert_eq!(schedule.net_discharge(), array![-5.0, 4.0]);
    }

    #[test]
    fn test_expected() {
        let state_of_charge = StateOfCharge(array![[1.0, 3.0], [2.0, 4.0]]);
        assert_eq!(state_of_charge.expected(&[0.5, 0.5]), array![2.0, 3.0]);
    }
}
