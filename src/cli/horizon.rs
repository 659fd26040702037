use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;

use crate::{core::horizon::TimeHorizon, prelude::*};

#[derive(Copy, Clone, Parser)]
pub struct HorizonArgs {
    /// First step, inclusive.
    #[clap(long = "start", default_value = "2018-01-01T00:00:00Z", env = "HORIZON_START")]
    pub start: DateTime<Utc>,

    #[clap(long = "step-minutes", default_value = "30", env = "STEP_MINUTES")]
    pub step_minutes: i64,
}

impl HorizonArgs {
    /// Build the horizon up to the last step, inclusive.
    pub fn until(&self, end: DateTime<Utc>) -> Result<TimeHorizon> {
        TimeHorizon::from_range(self.start, end, TimeDelta::minutes(self.step_minutes))
            .context("invalid horizon")
    }
}
