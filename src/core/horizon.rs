use chrono::{DateTime, TimeDelta, Utc};

use crate::prelude::*;

/// Ordered sequence of fixed-width steps.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimeHorizon {
    /// Start of the first step.
    pub start: DateTime<Utc>,

    pub step: TimeDelta,

    /// Number of steps.
    pub len: usize,
}

impl TimeHorizon {
    pub fn new(start: DateTime<Utc>, step: TimeDelta, len: usize) -> Result<Self> {
        ensure!(step > TimeDelta::zero(), "the step must be positive, got {step}");
        ensure!(len != 0, "the horizon must contain at least one step");
        Ok(Self { start, step, len })
    }

    /// Build the horizon the way a date range does: both ends are included.
    pub fn from_range(start: DateTime<Utc>, end: DateTime<Utc>, step: TimeDelta) -> Result<Self> {
        ensure!(start <= end, "the range is reversed: {start} > {end}");
        ensure!(step > TimeDelta::zero(), "the step must be positive, got {step}");
        let n_steps = (end - start).num_seconds() / step.num_seconds().max(1);
        Self::new(start, step, usize::try_from(n_steps)? + 1)
    }

    #[must_use]
    pub fn step_hours(&self) -> f64 {
        self.step.as_seconds_f64() / 3600.0
    }

    /// Number of steps in a 365-day year.
    #[must_use]
    pub fn steps_per_year(&self) -> f64 {
        TimeDelta::days(365).as_seconds_f64() / self.step.as_seconds_f64()
    }

    /// Part of a year the horizon spans.
    #[must_use]
    pub fn fraction_of_year(&self) -> f64 {
        #[expect(clippy::cast_precision_loss)]
        let len = self.len as f64;
        len / self.steps_per_year()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.len).scan(self.start, |timestamp, _| {
            let current = *timestamp;
            *timestamp += self.step;
            Some(current)
        })
    }
}
