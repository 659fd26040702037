use bon::Builder;

use crate::{
    core::horizon::TimeHorizon,
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts},
};

/// Physical battery parameters, immutable per run.
#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
#[builder(finish_fn(name = build_unchecked, vis = ""))]
pub struct BatterySpec {
    /// Charging and discharging power limit.
    pub power: Megawatts,

    pub capacity: MegawattHours,

    /// Round-trip efficiency, split evenly between charging and discharging.
    #[builder(default = 0.85)]
    pub round_trip_efficiency: f64,

    /// Upper bound on full discharge cycles per year, [`None`] means unconstrained.
    pub max_cycles_per_year: Option<f64>,
}

impl<S: battery_spec_builder::IsComplete> BatterySpecBuilder<S> {
    pub fn build(self) -> Result<BatterySpec> {
        let spec = self.build_unchecked();
        spec.validate()?;
        Ok(spec)
    }
}

impl BatterySpec {
    fn validate(&self) -> Result {
        ensure!(self.power.is_positive(), "the power limit must be positive, got {}", self.power);
        ensure!(self.capacity.is_positive(), "the capacity must be positive, got {}", self.capacity);
        ensure!(
            self.round_trip_efficiency > 0.0 && self.round_trip_efficiency <= 1.0,
            "the round-trip efficiency must be in (0, 1], got {}",
            self.round_trip_efficiency,
        );
        if let Some(max_cycles) = self.max_cycles_per_year {
            ensure!(max_cycles >= 0.0, "the cycle limit must be non-negative, got {max_cycles}");
        }
        Ok(())
    }

    /// Efficiency of either direction: `√η`.
    #[must_use]
    pub fn one_way_efficiency(&self) -> f64 {
        self.round_trip_efficiency.sqrt()
    }

    /// Maximum charged or discharged volume per step.
    pub fn max_volume(&self, horizon: &TimeHorizon) -> MegawattHours {
        self.power * horizon.step
    }
}
