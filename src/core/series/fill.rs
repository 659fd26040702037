impl<T> ForwardFill for T where T: ?Sized {}

pub trait ForwardFill {
    /// Replace the missing values with the last known one.
    ///
    /// Leading missing values have nothing to carry forward and are dropped.
    fn forward_fill<K, V>(self) -> impl Iterator<Item = (K, V)>
    where
        Self: Iterator<Item = (K, Option<V>)> + Sized,
        V: Copy,
    {
        self.scan(None, |last, (key, value)| {
            if value.is_some() {
                *last = value;
            }
            Some((key, *last))
        })
        .filter_map(|(key, value)| value.map(|value| (key, value)))
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_forward_fill() {
        let series = [(1, None), (2, Some(0.5)), (3, None), (4, None), (5, Some(0.7))];
        let filled = series.into_iter().forward_fill().collect_vec();
        assert_eq!(filled, [(2, 0.5), (3, 0.5), (4, 0.5), (5, 0.7)]);
    }
}
