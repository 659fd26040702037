use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Pounds per megawatt-hour.
pub type MegawattHourRate = Quantity<-1, -1, 1>;

impl Display for MegawattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} £/MWh", self.0)
    }
}

impl Debug for MegawattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}£/MWh", self.0)
    }
}
