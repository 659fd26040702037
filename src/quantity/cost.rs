use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Pounds sterling.
pub type Cost = Quantity<0, 0, 1>;

impl Display for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+.2} £", self.0)
    }
}

impl Debug for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}£", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_signed() {
        assert_eq!(Cost::from(1340.0).to_string(), "+1340.00 £");
        assert_eq!(Cost::from(-2.5).to_string(), "-2.50 £");
    }
}
