//! Analysis standard definitions.
//!
//! A standard is data: required specimen fields with tolerances, data
//! requirements, the parameters of the property formulas and the
//! propagation rule set. Once fingerprinted it is never modified; a changed
//! definition is a new version.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ssa_model::{FieldValue, SampleMetadata, StandardRef};
use ssa_uncertainty::PROPAGATION_RULES_VERSION;

use crate::error::{Result, StandardsError};

/// Well-known specimen field names.
pub mod field {
    pub const WIDTH: &str = "width";
    pub const THICKNESS: &str = "thickness";
    pub const DIAMETER: &str = "diameter";
    pub const GAUGE_LENGTH: &str = "gauge_length";
    pub const MASS: &str = "mass";
    pub const TEMPERATURE: &str = "temperature";
    pub const STRAIN_RATE: &str = "strain_rate";
    pub const SPECIMEN_SHAPE: &str = "specimen_shape";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardHeader {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Number with an uncertainty, in canonical units.
    #[default]
    Quantity,
    Number,
    Text,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quantity => "quantity",
            Self::Number => "number",
            Self::Text => "text",
        }
    }

    pub fn accepts(self, value: &FieldValue) -> bool {
        match (self, value) {
            (Self::Quantity, FieldValue::Quantity { .. }) => true,
            (Self::Number, FieldValue::Quantity { .. } | FieldValue::Number(_)) => true,
            (Self::Text, FieldValue::Text(_)) => true,
            _ => false,
        }
    }
}

/// Allowed values of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Tolerance {
    Range { min: Option<f64>, max: Option<f64> },
    OneOf(Vec<String>),
}

impl Tolerance {
    /// Human-readable rule, e.g. `10 <= width <= 100`.
    pub fn describe(&self, field: &str) -> String {
        match self {
            Self::Range {
                min: Some(min),
                max: Some(max),
            } => format!("{min} <= {field} <= {max}"),
            Self::Range {
                min: Some(min),
                max: None,
            } => format!("{field} >= {min}"),
            Self::Range {
                min: None,
                max: Some(max),
            } => format!("{field} <= {max}"),
            Self::Range {
                min: None,
                max: None,
            } => format!("{field} is any number"),
            Self::OneOf(values) => format!("{field} in [{}]", values.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub kind: FieldKind,
    /// Canonical unit the value is expressed in, for documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    /// Fields that together stand in for this one, e.g. `diameter` for the
    /// `width` and `thickness` of a round specimen.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub satisfied_by: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn default_true() -> bool {
    true
}

impl FieldRule {
    /// True when a required field is absent and no alternative covers it.
    pub fn is_missing(&self, metadata: &SampleMetadata) -> bool {
        let present = |name: &str| metadata.field(name).is_some();
        self.required
            && !present(&self.name)
            && (self.satisfied_by.is_empty() || !self.satisfied_by.iter().all(|alt| present(alt)))
    }

    /// `width is required (quantity)`, naming the alternatives when there
    /// are any.
    pub fn requirement(&self) -> String {
        let base = format!("{} is required ({})", self.name, self.kind.as_str());
        if self.satisfied_by.is_empty() {
            base
        } else {
            format!("{base} unless {} is given", self.satisfied_by.join(" and "))
        }
    }

    pub fn tolerance(&self) -> Option<Tolerance> {
        if let Some(allowed) = &self.allowed {
            return Some(Tolerance::OneOf(allowed.clone()));
        }
        if self.min.is_some() || self.max.is_some() {
            return Some(Tolerance::Range {
                min: self.min,
                max: self.max,
            });
        }
        None
    }
}

/// Requirements on the measurement sequence itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataRequirements {
    pub min_points: usize,
    /// Largest share of points an outlier rule may exclude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_excluded_fraction: Option<f64>,
    /// Smallest covered range of the independent variable, canonical units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_x_span: Option<f64>,
}

impl Default for DataRequirements {
    fn default() -> Self {
        Self {
            min_points: 2,
            max_excluded_fraction: None,
            min_x_span: None,
        }
    }
}

/// Closed strain interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainWindow {
    pub start: f64,
    pub end: f64,
}

impl StrainWindow {
    pub fn contains(&self, strain: f64) -> bool {
        (self.start..=self.end).contains(&strain)
    }
}

/// Parameters of the derived-property formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formulas {
    /// Strain window of the elastic modulus fit.
    pub modulus_window: StrainWindow,
    /// Plastic strain offset of the yield construction.
    pub yield_offset: f64,
    /// Window averaged for the plateau stress of cellular materials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plateau_window: Option<StrainWindow>,
}

impl Default for Formulas {
    fn default() -> Self {
        Self {
            modulus_window: StrainWindow {
                start: 0.0005,
                end: 0.0025,
            },
            yield_offset: 0.002,
            plateau_window: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationPolicy {
    pub rules_version: String,
    /// Coverage factor for expanded uncertainties in reports.
    pub coverage_factor: f64,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            rules_version: PROPAGATION_RULES_VERSION.to_string(),
            coverage_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStandard {
    standard: StandardHeader,
    #[serde(default)]
    fields: Vec<FieldRule>,
    #[serde(default)]
    data: DataRequirements,
    #[serde(default)]
    formulas: Formulas,
    #[serde(default)]
    propagation: PropagationPolicy,
    #[serde(skip)]
    fingerprint: String,
}

impl AnalysisStandard {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let parsed: Self =
            toml::from_str(contents).map_err(|source| StandardsError::Parse { source })?;
        parsed.seal()
    }

    /// Checks the definition and computes its fingerprint.
    pub(crate) fn seal(mut self) -> Result<Self> {
        self.check()?;
        let canonical = serde_json::to_vec(&self)
            .map_err(|e| StandardsError::invalid(self.key(), e.to_string()))?;
        self.fingerprint = hex::encode(Sha256::digest(&canonical));
        Ok(self)
    }

    fn check(&self) -> Result<()> {
        let key = self.key();
        let invalid = |reason: String| StandardsError::invalid(key.clone(), reason);
        if self.standard.name.trim().is_empty() || self.standard.version.trim().is_empty() {
            return Err(invalid("name and version must not be empty".to_string()));
        }
        if self.standard.name.contains('@') {
            return Err(invalid("name must not contain '@'".to_string()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for rule in &self.fields {
            if !seen.insert(rule.name.as_str()) {
                return Err(invalid(format!("field '{}' is declared twice", rule.name)));
            }
            if let (Some(min), Some(max)) = (rule.min, rule.max)
                && min > max
            {
                return Err(invalid(format!(
                    "field '{}' has min {min} above max {max}",
                    rule.name
                )));
            }
            for alt in &rule.satisfied_by {
                if *alt == rule.name || !self.fields.iter().any(|other| other.name == *alt) {
                    return Err(invalid(format!(
                        "field '{}' is satisfied by undeclared field '{alt}'",
                        rule.name
                    )));
                }
            }
            if let Some(allowed) = &rule.allowed {
                if allowed.is_empty() {
                    return Err(invalid(format!("field '{}' allows no value", rule.name)));
                }
                if rule.kind != FieldKind::Text {
                    return Err(invalid(format!(
                        "field '{}' enumerates values but is not text",
                        rule.name
                    )));
                }
            }
        }
        if let Some(fraction) = self.data.max_excluded_fraction
            && !(0.0..=1.0).contains(&fraction)
        {
            return Err(invalid(format!(
                "max_excluded_fraction {fraction} is outside [0, 1]"
            )));
        }
        let windows = std::iter::once(("modulus_window", self.formulas.modulus_window))
            .chain(self.formulas.plateau_window.map(|w| ("plateau_window", w)));
        for (name, window) in windows {
            if !(window.start.is_finite() && window.end.is_finite()) || window.start >= window.end {
                return Err(invalid(format!(
                    "{name} [{}, {}] is empty",
                    window.start, window.end
                )));
            }
        }
        if !self.formulas.yield_offset.is_finite() || self.formulas.yield_offset < 0.0 {
            return Err(invalid("yield_offset must be non-negative".to_string()));
        }
        if self.propagation.rules_version != PROPAGATION_RULES_VERSION {
            return Err(invalid(format!(
                "propagation rules '{}' are not supported (engine implements '{}')",
                self.propagation.rules_version, PROPAGATION_RULES_VERSION
            )));
        }
        if !self.propagation.coverage_factor.is_finite() || self.propagation.coverage_factor <= 0.0 {
            return Err(invalid("coverage_factor must be positive".to_string()));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.standard.name
    }

    pub fn version(&self) -> &str {
        &self.standard.version
    }

    pub fn title(&self) -> &str {
        &self.standard.title
    }

    /// `name@version`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.standard.name, self.standard.version)
    }

    /// SHA-256 of the canonical serialization.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.name == name)
    }

    pub fn data(&self) -> &DataRequirements {
        &self.data
    }

    pub fn formulas(&self) -> &Formulas {
        &self.formulas
    }

    pub fn propagation(&self) -> &PropagationPolicy {
        &self.propagation
    }

    pub fn standard_ref(&self) -> StandardRef {
        StandardRef::new(&self.standard.name, &self.standard.version)
            .with_fingerprint(&self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[standard]
name = "lab"
version = "3"

[[fields]]
name = "width"
min = 1.0
max = 50.0
"#;

    #[test]
    fn defaults_fill_missing_tables() {
        let standard = AnalysisStandard::from_toml_str(MINIMAL).unwrap();
        assert_eq!(standard.key(), "lab@3");
        assert_eq!(standard.data().min_points, 2);
        assert_eq!(standard.formulas().yield_offset, 0.002);
        assert_eq!(standard.propagation().rules_version, PROPAGATION_RULES_VERSION);
        let width = standard.field("width").unwrap();
        assert!(width.required);
        assert_eq!(width.kind, FieldKind::Quantity);
        assert_eq!(standard.fingerprint().len(), 64);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = AnalysisStandard::from_toml_str(MINIMAL).unwrap();
        let b = AnalysisStandard::from_toml_str(&MINIMAL.replace("50.0", "60.0")).unwrap();
        let again = AnalysisStandard::from_toml_str(MINIMAL).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), again.fingerprint());
    }

    #[test]
    fn inverted_tolerance_is_rejected() {
        let err = AnalysisStandard::from_toml_str(&MINIMAL.replace("50.0", "0.5")).unwrap_err();
        assert!(err.to_string().contains("min 1 above max 0.5"));
    }

    #[test]
    fn unknown_propagation_rules_are_rejected() {
        let toml = format!("{MINIMAL}\n[propagation]\nrules_version = \"monte-carlo/1\"\n");
        assert!(matches!(
            AnalysisStandard::from_toml_str(&toml),
            Err(StandardsError::Invalid { .. })
        ));
    }

    const ROUND_OR_FLAT: &str = r#"
[standard]
name = "lab"
version = "4"

[[fields]]
name = "width"
satisfied_by = ["diameter"]

[[fields]]
name = "diameter"
required = false
"#;

    #[test]
    fn alternative_fields_satisfy_a_requirement() {
        let standard = AnalysisStandard::from_toml_str(ROUND_OR_FLAT).unwrap();
        let width = standard.field("width").unwrap();
        let bare = SampleMetadata::new("R1", standard.standard_ref());
        let round = bare.clone().with_field(
            "diameter",
            FieldValue::Quantity {
                value: 8.0,
                uncertainty: 0.02,
            },
        );
        assert!(width.is_missing(&bare));
        assert!(!width.is_missing(&round));
        assert_eq!(width.requirement(), "width is required (quantity) unless diameter is given");
    }

    #[test]
    fn undeclared_alternative_is_rejected() {
        let toml = ROUND_OR_FLAT.replace("[\"diameter\"]", "[\"radius\"]");
        let err = AnalysisStandard::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("undeclared field 'radius'"));
    }

    #[test]
    fn tolerance_descriptions() {
        let range = Tolerance::Range {
            min: Some(10.0),
            max: Some(100.0),
        };
        assert_eq!(range.describe("width"), "10 <= width <= 100");
        let set = Tolerance::OneOf(vec!["cylinder".into(), "prism".into()]);
        assert_eq!(set.describe("shape"), "shape in [cylinder, prism]");
    }
}
