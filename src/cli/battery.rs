//! Battery-related CLI arguments.

use clap::Parser;

use crate::{
    core::battery::BatterySpec,
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts},
};

#[derive(Copy, Clone, Parser)]
pub struct BatteryArgs {
    /// Charging and discharging power limit in megawatts.
    #[clap(long = "battery-power-mw", default_value = "10", env = "BATTERY_POWER_MW")]
    pub power: Megawatts,

    /// Energy capacity in megawatt-hours.
    #[clap(long = "battery-capacity-mwh", default_value = "10", env = "BATTERY_CAPACITY_MWH")]
    pub capacity: MegawattHours,

    #[clap(flatten)]
    pub lifetime: BatteryLifetimeArgs,
}

impl BatteryArgs {
    pub fn spec(&self) -> Result<BatterySpec> {
        BatterySpec::builder()
            .power(self.power)
            .capacity(self.capacity)
            .round_trip_efficiency(self.lifetime.round_trip_efficiency)
            .maybe_max_cycles_per_year(self.lifetime.max_cycles_per_year())
            .build()
            .context("invalid battery parameters")
    }
}

/// Parameters that stay the same when the battery is resized.
#[derive(Copy, Clone, Parser)]
pub struct BatteryLifetimeArgs {
    #[clap(long, default_value = "0.85", env = "ROUND_TRIP_EFFICIENCY")]
    pub round_trip_efficiency: f64,

    /// Maximum number of full discharge cycles per year.
    #[clap(long, default_value = "400", env = "MAX_CYCLES_PER_YEAR")]
    max_cycles_per_year: f64,

    /// Do not limit the number of cycles.
    #[clap(long, env = "UNLIMITED_CYCLES")]
    unlimited_cycles: bool,
}

impl BatteryLifetimeArgs {
    pub const fn max_cycles_per_year(&self) -> Option<f64> {
        if self.unlimited_cycles { None } else { Some(self.max_cycles_per_year) }
    }
}
