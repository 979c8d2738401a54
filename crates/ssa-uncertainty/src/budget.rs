//! Uncertainty budgets.
//!
//! Components are evaluated either statistically (Type A) or from other
//! knowledge such as resolution and calibration certificates (Type B), then
//! combined by root-sum-square.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UncertaintyError};
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationType {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyComponent {
    pub name: String,
    pub evaluation: EvaluationType,
    /// Standard uncertainty contributed by this component.
    pub standard_uncertainty: f64,
}

impl UncertaintyComponent {
    /// Standard error of the mean of repeated readings.
    pub fn repeatability(name: impl Into<String>, readings: &[f64]) -> Result<Self> {
        let sd = stats::std_dev(readings).ok_or_else(|| {
            UncertaintyError::degenerate("repeatability needs at least 2 finite readings")
        })?;
        Ok(Self {
            name: name.into(),
            evaluation: EvaluationType::A,
            standard_uncertainty: sd / (readings.len() as f64).sqrt(),
        })
    }

    /// Rectangular distribution over the instrument resolution.
    pub fn resolution(name: impl Into<String>, resolution: f64) -> Self {
        Self {
            name: name.into(),
            evaluation: EvaluationType::B,
            standard_uncertainty: resolution.abs() / 3f64.sqrt(),
        }
    }

    /// Expanded calibration uncertainty divided by its coverage factor.
    pub fn calibration(name: impl Into<String>, expanded: f64, coverage_factor: f64) -> Self {
        Self {
            name: name.into(),
            evaluation: EvaluationType::B,
            standard_uncertainty: expanded.abs() / coverage_factor,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBudget {
    pub components: Vec<UncertaintyComponent>,
}

impl UncertaintyBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, component: UncertaintyComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Root-sum-square of every component.
    pub fn combined(&self) -> f64 {
        self.components
            .iter()
            .map(|c| c.standard_uncertainty * c.standard_uncertainty)
            .sum::<f64>()
            .sqrt()
    }

    pub fn expanded(&self, coverage_factor: f64) -> f64 {
        self.combined() * coverage_factor
    }
}

/// Fallback uncertainties for a typical universal testing machine.
///
/// Used only when the import supplies none. Every use is visible in the
/// sample metadata as an assumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultUncertainties {
    /// Percent of reading.
    pub force_percent: f64,
    /// mm.
    pub displacement: f64,
    /// mm, for specimen dimensions.
    pub dimension: f64,
    /// °C.
    pub temperature: f64,
}

impl Default for DefaultUncertainties {
    fn default() -> Self {
        Self {
            force_percent: 0.5,
            displacement: 0.01,
            dimension: 0.1,
            temperature: 1.0,
        }
    }
}

impl DefaultUncertainties {
    pub fn force(&self, reading: f64) -> f64 {
        (reading * self.force_percent / 100.0).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_combines_in_quadrature() {
        let budget = UncertaintyBudget::new()
            .with(UncertaintyComponent::calibration("load cell", 0.6, 2.0))
            .with(UncertaintyComponent::calibration("fixture", 0.8, 2.0));
        assert!((budget.combined() - 0.5).abs() < 1e-12);
        assert!((budget.expanded(2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn repeatability_is_type_a() {
        let component =
            UncertaintyComponent::repeatability("width", &[10.0, 10.2, 9.8, 10.0]).unwrap();
        assert_eq!(component.evaluation, EvaluationType::A);
        assert!(component.standard_uncertainty > 0.0);
        assert!(UncertaintyComponent::repeatability("width", &[10.0]).is_err());
    }

    #[test]
    fn default_force_uncertainty_is_relative() {
        let defaults = DefaultUncertainties::default();
        assert_eq!(defaults.force(-200.0), 1.0);
        let resolution = UncertaintyComponent::resolution("caliper", 0.01);
        assert!((resolution.standard_uncertainty - 0.01 / 3f64.sqrt()).abs() < 1e-15);
    }
}
