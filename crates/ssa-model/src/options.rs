//! Configuration options for sample analysis.

use serde::{Deserialize, Serialize};

use crate::operation::{FitModel, OutlierRule, ResidualScale, ZeroReference};

/// Selects a registered analysis standard by name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardSelector {
    pub name: String,
    pub version: String,
}

impl StandardSelector {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parses `name@version`.
    pub fn parse(value: &str) -> Option<Self> {
        let (name, version) = value.split_once('@')?;
        let (name, version) = (name.trim(), version.trim());
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self::new(name, version))
    }
}

impl Default for StandardSelector {
    fn default() -> Self {
        Self::new("generic", "1")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroingOptions {
    pub enabled: bool,
    pub reference: ZeroReference,
}

impl Default for ZeroingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            reference: ZeroReference::Point { index: 0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierOptions {
    pub enabled: bool,
    pub rule: OutlierRule,
}

impl Default for OutlierOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            rule: OutlierRule::ResidualThreshold {
                model: FitModel::Polynomial { degree: 3 },
                threshold: 4.0,
                scale: ResidualScale::MedianAbsoluteDeviation,
            },
        }
    }
}

/// Units used at the presentation boundary. Engine values stay canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub force: String,
    pub displacement: String,
    pub stress: String,
    pub strain: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            force: "N".to_string(),
            displacement: "mm".to_string(),
            stress: "MPa".to_string(),
            strain: "%".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Stop the batch at the first failing sample instead of skipping it.
    pub stop_on_error: bool,
}

/// Options controlling sample analysis behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub standard: StandardSelector,
    pub zeroing: ZeroingOptions,
    pub outliers: OutlierOptions,
    pub display: DisplayOptions,
    pub batch: BatchOptions,
    /// Record every validation outcome in the audit trail.
    pub audit_validation: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            standard: StandardSelector::default(),
            zeroing: ZeroingOptions::default(),
            outliers: OutlierOptions::default(),
            display: DisplayOptions::default(),
            batch: BatchOptions::default(),
            audit_validation: true,
        }
    }
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_standard(mut self, standard: StandardSelector) -> Self {
        self.standard = standard;
        self
    }

    pub fn with_zero_reference(mut self, reference: ZeroReference) -> Self {
        self.zeroing.reference = reference;
        self
    }

    pub fn with_outlier_rule(mut self, rule: OutlierRule) -> Self {
        self.outliers.rule = rule;
        self
    }

    pub fn without_outliers(mut self) -> Self {
        self.outliers.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_name_and_version() {
        let selector = StandardSelector::parse("iso-13314@2011").unwrap();
        assert_eq!(selector.name, "iso-13314");
        assert_eq!(selector.version, "2011");
        assert!(StandardSelector::parse("iso-13314").is_none());
        assert!(StandardSelector::parse("@2011").is_none());
    }

    #[test]
    fn partial_options_fill_defaults() {
        let options: AnalysisOptions =
            serde_json::from_str(r#"{"zeroing": {"enabled": false}}"#).unwrap();
        assert!(!options.zeroing.enabled);
        assert_eq!(options.zeroing.reference, ZeroReference::Point { index: 0 });
        assert!(options.outliers.enabled);
        assert!(options.audit_validation);
        assert_eq!(options.standard, StandardSelector::default());
    }
}
