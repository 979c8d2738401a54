use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{Result, UncertaintyError};

/// A value with its standard uncertainty.
///
/// The arithmetic operators assume the operands are uncorrelated. Use
/// [`crate::propagate_correlated`] when they are not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measured {
    pub value: f64,
    pub uncertainty: f64,
}

impl Measured {
    pub fn new(value: f64, uncertainty: f64) -> Result<Self> {
        let measured = Self { value, uncertainty };
        measured.check("value", "measurement")?;
        Ok(measured)
    }

    /// An exactly known value.
    pub const fn exact(value: f64) -> Self {
        Self {
            value,
            uncertainty: 0.0,
        }
    }

    /// Fails when either half is unusable.
    pub fn check(&self, quantity: &str, operation: &'static str) -> Result<()> {
        if !self.value.is_finite() {
            return Err(UncertaintyError::NonFinite {
                quantity: quantity.to_string(),
                operation,
            });
        }
        if !self.uncertainty.is_finite() || self.uncertainty < 0.0 {
            return Err(UncertaintyError::Missing {
                quantity: quantity.to_string(),
                operation,
            });
        }
        Ok(())
    }

    /// Uncertainty relative to the magnitude of the value.
    pub fn relative(&self) -> Option<f64> {
        (self.value != 0.0).then(|| self.uncertainty / self.value.abs())
    }

    pub fn scale(self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            uncertainty: self.uncertainty * factor.abs(),
        }
    }

    pub fn checked_div(self, rhs: Self) -> Result<Self> {
        if rhs.value == 0.0 {
            return Err(UncertaintyError::DivisionByZero {
                operation: "quotient",
            });
        }
        let value = self.value / rhs.value;
        let da = self.uncertainty / rhs.value;
        let db = self.value * rhs.uncertainty / (rhs.value * rhs.value);
        Ok(Self {
            value,
            uncertainty: da.hypot(db),
        })
    }

    pub fn as_pair(self) -> (f64, f64) {
        (self.value, self.uncertainty)
    }
}

impl From<(f64, f64)> for Measured {
    fn from((value, uncertainty): (f64, f64)) -> Self {
        Self { value, uncertainty }
    }
}

impl Add for Measured {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
            uncertainty: self.uncertainty.hypot(rhs.uncertainty),
        }
    }
}

impl Sub for Measured {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
            uncertainty: self.uncertainty.hypot(rhs.uncertainty),
        }
    }
}

impl Mul for Measured {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let da = self.uncertainty * rhs.value;
        let db = self.value * rhs.uncertainty;
        Self {
            value: self.value * rhs.value,
            uncertainty: da.hypot(db),
        }
    }
}

impl Neg for Measured {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            value: -self.value,
            uncertainty: self.uncertainty,
        }
    }
}

impl fmt::Display for Measured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.p$} ± {:.p$}", self.value, self.uncertainty),
            None => write!(f, "{} ± {}", self.value, self.uncertainty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nan_uncertainty() {
        assert!(matches!(
            Measured::new(1.0, f64::NAN),
            Err(UncertaintyError::Missing { .. })
        ));
    }

    #[test]
    fn area_from_width_and_thickness() {
        let width = Measured::new(10.0, 0.1).unwrap();
        let thickness = Measured::new(5.0, 0.1).unwrap();
        let area = width * thickness;
        assert_eq!(area.value, 50.0);
        let expected = (0.5f64 * 0.5 + 1.0 * 1.0).sqrt();
        assert!((area.uncertainty - expected).abs() < 1e-12);
    }

    #[test]
    fn display_honours_precision() {
        let m = Measured::exact(1.23456);
        assert_eq!(format!("{m:.2}"), "1.23 ± 0.00");
    }
}
