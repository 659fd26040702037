use std::iter::once;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use itertools::Itertools;

impl<T> Resample for T where T: ?Sized {}

pub trait Resample {
    /// Resample onto a regular grid of `step`, holding each value until the next point.
    ///
    /// The grid is aligned to `step` from the Unix epoch, so hourly data stays on the hour.
    fn resample_forward<V>(self, step: TimeDelta) -> impl Iterator<Item = (DateTime<Utc>, V)>
    where
        Self: Iterator<Item = (DateTime<Utc>, V)> + Sized,
        V: Copy,
    {
        self.map(Some)
            .chain(once(None))
            .tuple_windows()
            .filter_map(|(left, right)| left.map(|left| (left, right)))
            .flat_map(move |((left_key, left_value), right)| {
                // Past the last point, only its own grid timestamp remains:
                let right_key = right.map_or(left_key + TimeDelta::nanoseconds(1), |(key, _)| key);
                let first = ceil(left_key, step);
                (0..)
                    .map(move |i| first + step * i)
                    .take_while(move |key| *key < right_key)
                    .map(move |key| (key, left_value))
            })
    }
}

fn ceil(timestamp: DateTime<Utc>, step: TimeDelta) -> DateTime<Utc> {
    match timestamp.duration_trunc(step) {
        Ok(truncated) if truncated == timestamp => truncated,
        Ok(truncated) => truncated + step,
        Err(_) => timestamp,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_resample_forward() {
        let at = |hour, minute| Utc.with_ymd_and_hms(2016, 1, 1, hour, minute, 0).unwrap();
        let series = [(at(0, 0), 1.0), (at(1, 0), 2.0), (at(1, 15), 3.0), (at(2, 0), 4.0)];
        let resampled = series.into_iter().resample_forward(TimeDelta::minutes(30)).collect_vec();
        assert_eq!(resampled, [
            (at(0, 0), 1.0),
            (at(0, 30), 1.0),
            (at(1, 0), 2.0),
            (at(1, 30), 3.0),
            (at(2, 0), 4.0),
        ]);
    }

    #[test]
    fn test_resample_forward_downsamples() {
        let at = |hour, minute| Utc.with_ymd_and_hms(2016, 1, 1, hour, minute, 0).unwrap();
        let series = [(at(0, 0), 1.0), (at(0, 30), 2.0), (at(1, 0), 3.0), (at(1, 30), 4.0)];
        let resampled = series.into_iter().resample_forward(TimeDelta::hours(1)).collect_vec();
        assert_eq!(resampled, [(at(0, 0), 1.0), (at(1, 0), 3.0)]);
    }
}
