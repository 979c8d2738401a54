use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnitError;

/// Uncertainty as supplied at import, before it is resolved against a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UncertaintySpec {
    /// Standard uncertainty in the declared unit.
    Absolute(f64),
    /// Percentage of the reading, e.g. `0.5` for "0.5%".
    Relative(f64),
}

impl UncertaintySpec {
    /// Absolute uncertainty in the declared unit of `value`.
    pub fn resolve(self, value: f64) -> f64 {
        match self {
            Self::Absolute(u) => u,
            Self::Relative(percent) => (value * percent / 100.0).abs(),
        }
    }
}

impl FromStr for UncertaintySpec {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = |reason| UnitError::InvalidUncertainty {
            spec: s.to_string(),
            reason,
        };
        let (number, relative) = match trimmed.strip_suffix('%') {
            Some(number) => (number.trim(), true),
            None => (trimmed, false),
        };
        let value: f64 = number.parse().map_err(|_| invalid("not a number"))?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid("must be finite and non-negative"));
        }
        Ok(if relative {
            Self::Relative(value)
        } else {
            Self::Absolute(value)
        })
    }
}

impl fmt::Display for UncertaintySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(u) => write!(f, "{u}"),
            Self::Relative(percent) => write!(f, "{percent}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relative_and_absolute() {
        assert_eq!(
            "0.5%".parse::<UncertaintySpec>().unwrap(),
            UncertaintySpec::Relative(0.5)
        );
        assert_eq!(
            " 0.02 ".parse::<UncertaintySpec>().unwrap(),
            UncertaintySpec::Absolute(0.02)
        );
        assert!("-1".parse::<UncertaintySpec>().is_err());
        assert!("abc%".parse::<UncertaintySpec>().is_err());
    }

    #[test]
    fn relative_resolves_against_reading() {
        assert_eq!(UncertaintySpec::Relative(50.0).resolve(-4.0), 2.0);
        assert_eq!(UncertaintySpec::Absolute(0.1).resolve(100.0), 0.1);
    }
}
