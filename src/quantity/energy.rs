use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use crate::quantity::{Quantity, cost::Cost, rate::MegawattHourRate};

pub type MegawattHours = Quantity<1, 1, 0>;

impl Display for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} MWh", self.0)
    }
}

impl Debug for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}MWh", self.0)
    }
}

impl Mul<MegawattHourRate> for MegawattHours {
    type Output = Cost;

    fn mul(self, rhs: MegawattHourRate) -> Self::Output {
        Cost::from(self.0 * rhs.0)
    }
}

/// Ratio of two energies, for example the number of full cycles.
impl Div<Self> for MegawattHours {
    type Output = f64;

    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_cost() {
        let cost = MegawattHours::from(2.0) * MegawattHourRate::from(35.0);
        assert_abs_diff_eq!(cost.0, 70.0);
    }

    #[test]
    fn test_cycles() {
        assert_abs_diff_eq!(MegawattHours::from(25.0) / MegawattHours::from(10.0), 2.5);
    }
}
