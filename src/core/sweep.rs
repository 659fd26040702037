//! Battery sizing sweep for the revenue smoothing problem.

use std::collections::BTreeMap;

use bon::Builder;
use ndarray::Array2;
use ordered_float::OrderedFloat;

use crate::{
    core::{
        battery::BatterySpec,
        formulation::smoothing::Smoothing,
        horizon::TimeHorizon,
        probability::linspace,
        solver::Backend,
    },
    prelude::*,
    quantity::Quantity,
};

/// Grid of battery sizes: power multipliers of a base power times durations (energy over power).
#[derive(Builder)]
pub struct DesignSweep<'a> {
    horizon: &'a TimeHorizon,
    spot_prices: &'a [f64],

    /// Plant output per step, MWh.
    production: &'a [f64],

    /// Plant nameplate capacity, MW.
    #[builder(default = 200.0)]
    plant_capacity: f64,

    /// Battery power that the multipliers scale, MW.
    #[builder(default = 20.0)]
    base_power: f64,

    #[builder(default = linspace(0.5, 5.0, 10))]
    power_multipliers: Vec<f64>,

    /// Energy-to-power ratios, hours.
    #[builder(default = linspace(0.5, 5.0, 10))]
    durations: Vec<f64>,

    #[builder(default = 0.85)]
    round_trip_efficiency: f64,

    max_cycles_per_year: Option<f64>,
}

/// One solved grid point.
#[derive(Copy, Clone, Debug)]
pub struct SweepPoint {
    pub power: f64,
    pub energy: f64,

    /// Battery power relative to the plant capacity.
    pub power_share: f64,

    pub duration: f64,

    /// [`None`] when the point failed to solve.
    pub improvement: Option<f64>,

    pub annualized_cycles: Option<f64>,
}

impl DesignSweep<'_> {
    /// Solve every grid point independently, a failed point does not abort the sweep.
    #[instrument(
        skip_all,
        fields(n_points = self.power_multipliers.len() * self.durations.len()),
    )]
    pub fn run(&self, backend: &impl Backend) -> Vec<SweepPoint> {
        let mut points = Vec::with_capacity(self.power_multipliers.len() * self.durations.len());
        for power_multiplier in &self.power_multipliers {
            let power = self.base_power * power_multiplier;
            for duration in &self.durations {
                let energy = power * duration;
                let outcome = self.solve_point(backend, power, energy);
                if let Err(error) = &outcome {
                    warn!(power, energy, "failed to solve the point: {error:#}");
                }
                let outcome = outcome.ok();
                points.push(SweepPoint {
                    power,
                    energy,
                    power_share: power / self.plant_capacity,
                    duration: *duration,
                    improvement: outcome.map(|(improvement, _)| improvement),
                    annualized_cycles: outcome.map(|(_, cycles)| cycles),
                });
            }
        }
        info!(n_failed = points.iter().filter(|point| point.improvement.is_none()).count(), "done");
        points
    }

    fn solve_point(&self, backend: &impl Backend, power: f64, energy: f64) -> Result<(f64, f64)> {
        let battery = BatterySpec::builder()
            .power(Quantity(power))
            .capacity(Quantity(energy))
            .round_trip_efficiency(self.round_trip_efficiency)
            .maybe_max_cycles_per_year(self.max_cycles_per_year)
            .build()?;
        let outcome = Smoothing::builder()
            .battery(&battery)
            .horizon(self.horizon)
            .spot_prices(self.spot_prices)
            .production(self.production)
            .build()
            .solve(backend)?;
        info!(power, energy, improvement = outcome.improvement, "solved the point");
        Ok((outcome.improvement, outcome.report.annualized_cycles))
    }
}

/// Improvement and cycle usage by power share (rows) and duration (columns).
#[must_use]
pub struct SweepSurface {
    pub power_shares: Vec<f64>,
    pub durations: Vec<f64>,
    pub improvements: Array2<Option<f64>>,
    pub annualized_cycles: Array2<Option<f64>>,
}

impl SweepSurface {
    pub fn pivot(points: &[SweepPoint]) -> Self {
        let row_index = Self::index(points.iter().map(|point| point.power_share));
        let column_index = Self::index(points.iter().map(|point| point.duration));
        let shape = (row_index.len(), column_index.len());
        let mut improvements = Array2::from_elem(shape, None);
        let mut annualized_cycles = Array2::from_elem(shape, None);
        for point in points {
            let cell = [row_index[&OrderedFloat(point.power_share)], column_index[&OrderedFloat(point.duration)]];
            improvements[cell] = point.improvement;
            annualized_cycles[cell] = point.annualized_cycles;
        }
        Self {
            power_shares: row_index.into_keys().map(OrderedFloat::into_inner).collect(),
            durations: column_index.into_keys().map(OrderedFloat::into_inner).collect(),
            improvements,
            annualized_cycles,
        }
    }

    /// Map sorted unique keys to their positions.
    fn index(keys: impl Iterator<Item = f64>) -> BTreeMap<OrderedFloat<f64>, usize> {
        let mut index: BTreeMap<_, _> = keys.map(|key| (OrderedFloat(key), 0)).collect();
        for (position, value) in index.values_mut().enumerate() {
            *value = position;
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::core::solver::{Clarabel, Problem, Settings, Solution};

    #[test]
    fn test_pivot() {
        let point = |power_share, duration, improvement: Option<f64>| SweepPoint {
            power: 0.0,
            energy: 0.0,
            power_share,
            duration,
            improvement,
            annualized_cycles: improvement.map(|improvement| improvement * 1000.0),
        };
        let points = [
            point(0.2, 2.0, Some(0.4)),
            point(0.1, 2.0, Some(0.2)),
            point(0.2, 1.0, None),
            point(0.1, 1.0, Some(0.1)),
        ];
        let surface = SweepSurface::pivot(&points);
        assert_eq!(surface.power_shares, [0.1, 0.2]);
        assert_eq!(surface.durations, [1.0, 2.0]);
        assert_eq!(surface.improvements[[0, 0]], Some(0.1));
        assert_eq!(surface.improvements[[0, 1]], Some(0.2));
        assert_eq!(surface.improvements[[1, 0]], None);
        assert_eq!(surface.improvements[[1, 1]], Some(0.4));
        assert_eq!(surface.annualized_cycles[[0, 1]], Some(200.0));
        assert_eq!(surface.annualized_cycles[[1, 0]], None);
    }

    struct Failing;

    impl Backend for Failing {
        fn solve(&self, _problem: &Problem) -> Result<Solution> {
            bail!("numerical trouble")
        }
    }

    fn horizon() -> Result<TimeHorizon> {
        TimeHorizon::new(Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(), TimeDelta::hours(1), 6)
    }

    #[test]
    fn test_failures_are_recorded() -> Result {
        let horizon = horizon()?;
        let points = DesignSweep::builder()
            .horizon(&horizon)
            .spot_prices(&[50.0; 6])
            .production(&[10.0, 0.0, 10.0, 0.0, 10.0, 0.0])
            .power_multipliers(vec![0.5, 1.0])
            .durations(vec![1.0, 2.0, 4.0])
            .build()
            .run(&Failing);
        assert_eq!(points.len(), 6);
        assert!(points.iter().all(|point| point.improvement.is_none()));
        Ok(())
    }

    #[test]
    fn test_sweep() -> Result {
        let horizon = horizon()?;
        let points = DesignSweep::builder()
            .horizon(&horizon)
            .spot_prices(&[50.0; 6])
            .production(&[100.0, 0.0, 100.0, 0.0, 100.0, 0.0])
            .power_multipliers(vec![0.5, 1.0])
            .durations(vec![1.0, 2.0])
            .max_cycles_per_year(400.0)
            .build()
            .run(&Clarabel::new(Settings::builder().eps_abs(1e-8).eps_rel(1e-8).build()));
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|point| point.improvement.is_some_and(|improvement| improvement > 0.0)));

        let surface = SweepSurface::pivot(&points);
        assert_eq!(surface.power_shares, [0.05, 0.1]);
        assert_eq!(surface.durations, [1.0, 2.0]);
        Ok(())
    }
}
