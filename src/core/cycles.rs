use crate::core::{battery::BatterySpec, horizon::TimeHorizon};

/// Discharge-based cycle accounting: one cycle is a full capacity worth of discharged energy.
#[derive(Copy, Clone, Debug)]
pub struct CycleBudget {
    capacity: f64,
    max_cycles_per_year: Option<f64>,
    fraction_of_year: f64,
}

impl CycleBudget {
    pub fn new(battery: &BatterySpec, horizon: &TimeHorizon) -> Self {
        Self {
            capacity: battery.capacity.0,
            max_cycles_per_year: battery.max_cycles_per_year,
            fraction_of_year: horizon.fraction_of_year(),
        }
    }

    /// Maximum number of cycles over the horizon, [`None`] when unconstrained.
    #[must_use]
    pub fn limit(&self) -> Option<f64> {
        self.max_cycles_per_year.map(|max_cycles| max_cycles * self.fraction_of_year)
    }

    /// Coefficient of each discharged MWh in the cycle count.
    #[must_use]
    pub fn per_volume(&self) -> f64 {
        1.0 / self.capacity
    }

    #[must_use]
    pub fn count<'v>(&self, discharge: impl IntoIterator<Item = &'v f64>) -> f64 {
        discharge.into_iter().sum::<f64>() * self.per_volume()
    }

    /// Extrapolate the horizon's cycle count to a year.
    #[must_use]
    pub fn annualize(&self, cycles: f64) -> f64 {
        cycles / self.fraction_of_year
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::{prelude::*, quantity::Quantity};

    #[test]
    fn test_budget() -> Result {
        let battery = BatterySpec::builder()
            .power(Quantity(10.0))
            .capacity(Quantity(10.0))
            .max_cycles_per_year(365.0)
            .build()?;
        let horizon = TimeHorizon::new(Utc::now(), TimeDelta::minutes(30), 96)?;
        let budget = CycleBudget::new(&battery, &horizon);
        assert_abs_diff_eq!(budget.limit().unwrap(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(budget.count(&[5.0, 5.0, 10.0]), 2.0);
        assert_abs_diff_eq!(budget.annualize(2.0), 365.0, epsilon = 1e-9);

        let week = TimeHorizon::new(Utc::now(), TimeDelta::hours(1), 7 * 24)?;
        let budget = CycleBudget::new(&battery, &week);
        assert_abs_diff_eq!(budget.limit().unwrap(), 7.0, epsilon = 1e-9);
        assert_abs_diff_eq!(budget.annualize(budget.limit().unwrap()), 365.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_unconstrained() -> Result {
        let battery = BatterySpec::builder().power(Quantity(10.0)).capacity(Quantity(10.0)).build()?;
        let horizon = TimeHorizon::new(Utc::now(), TimeDelta::minutes(30), 96)?;
        assert!(CycleBudget::new(&battery, &horizon).limit().is_none());
        Ok(())
    }
}
