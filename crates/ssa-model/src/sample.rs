use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::ids::{GroupName, SampleId};
use crate::operation::OperationRecord;

/// Name, version and content fingerprint of an analysis standard.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StandardRef {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl StandardRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// `name@version`, the registry key.
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for StandardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Machine and procedure the specimen was tested with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestProcedure {
    pub machine: String,
    pub procedure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

/// A metadata field value in canonical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Quantity { value: f64, uncertainty: f64 },
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Quantity { value, .. } | Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn uncertainty(&self) -> Option<f64> {
        match self {
            Self::Quantity { uncertainty, .. } => Some(*uncertainty),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quantity { value, uncertainty } => write!(f, "{value} ± {uncertainty}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// An analyst's override of a default assumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionOverride {
    pub value: String,
    pub set_by: String,
    pub set_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Human-readable specimen name.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub standard: StandardRef,
    #[serde(default)]
    pub procedure: TestProcedure,
    /// Specimen fields checked by the standard (dimensions, mass, ...).
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub assumptions: BTreeMap<String, AssumptionOverride>,
}

impl SampleMetadata {
    pub fn new(name: impl Into<String>, standard: StandardRef) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            standard,
            procedure: TestProcedure::default(),
            fields: BTreeMap::new(),
            assumptions: BTreeMap::new(),
        }
    }

    pub fn with_procedure(mut self, procedure: TestProcedure) -> Self {
        self.procedure = procedure;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn with_assumption(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        set_by: impl Into<String>,
    ) -> Self {
        self.assumptions.insert(
            key.into(),
            AssumptionOverride {
                value: value.into(),
                set_by: set_by.into(),
                set_at: Utc::now(),
            },
        );
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// One specimen's test record.
///
/// Samples are immutable: there are no `&mut` accessors. A further
/// transformation always produces a new sample whose `derived_from` points
/// back at this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    id: SampleId,
    metadata: SampleMetadata,
    data: Dataset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    derived_from: Option<SampleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operation: Option<OperationRecord>,
    /// Raw sample at the root of this lineage (itself for raw samples).
    lineage_root: SampleId,
    depth: usize,
}

impl Sample {
    pub fn raw(id: SampleId, metadata: SampleMetadata, data: Dataset) -> Self {
        Self {
            id,
            metadata,
            data,
            derived_from: None,
            operation: None,
            lineage_root: id,
            depth: 0,
        }
    }

    /// Builds a derived sample. Metadata is inherited from the parent with a
    /// fresh creation timestamp.
    pub fn derived(id: SampleId, parent: &Sample, data: Dataset, operation: OperationRecord) -> Self {
        let mut metadata = parent.metadata.clone();
        metadata.created_at = Utc::now();
        Self {
            id,
            metadata,
            data,
            derived_from: Some(parent.id),
            operation: Some(operation),
            lineage_root: parent.lineage_root,
            depth: parent.depth + 1,
        }
    }

    pub fn id(&self) -> SampleId {
        self.id
    }

    pub fn metadata(&self) -> &SampleMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn standard(&self) -> &StandardRef {
        &self.metadata.standard
    }

    /// The raw measurements for raw samples, the derived dataset otherwise.
    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn derived_from(&self) -> Option<SampleId> {
        self.derived_from
    }

    pub fn operation(&self) -> Option<&OperationRecord> {
        self.operation.as_ref()
    }

    pub fn lineage_root(&self) -> SampleId {
        self.lineage_root
    }

    /// Number of derivation steps from the raw sample.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_raw(&self) -> bool {
        self.derived_from.is_none()
    }
}

/// Named set of samples with a comparison/aggregation role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleGroup {
    pub name: GroupName,
    #[serde(default)]
    pub role: String,
    pub members: BTreeSet<SampleId>,
}

impl SampleGroup {
    pub fn new(name: GroupName, role: impl Into<String>) -> Self {
        Self {
            name,
            role: role.into(),
            members: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{OperationParams, ZeroReference, ZeroingParams};

    #[test]
    fn derived_sample_tracks_lineage() {
        let metadata = SampleMetadata::new("A1", StandardRef::new("generic", "1"));
        let raw = Sample::raw(
            SampleId::new(1),
            metadata,
            Dataset::from_triples([(0.0, 1.0, 0.1), (1.0, 2.0, 0.1)]),
        );
        let record = OperationRecord {
            params: OperationParams::Zeroing(ZeroingParams {
                reference: ZeroReference::Point { index: 0 },
                offset: 1.0,
                offset_uncertainty: 0.1,
                corrections: Vec::new(),
            }),
            input_digest: raw.data().digest(),
            output_digest: String::new(),
        };
        let derived = Sample::derived(
            SampleId::new(2),
            &raw,
            Dataset::from_triples([(0.0, 0.0, 0.1), (1.0, 1.0, 0.1)]),
            record,
        );
        assert!(raw.is_raw());
        assert!(!derived.is_raw());
        assert_eq!(derived.derived_from(), Some(SampleId::new(1)));
        assert_eq!(derived.lineage_root(), SampleId::new(1));
        assert_eq!(derived.depth(), 1);
        assert_eq!(derived.name(), "A1");
    }

    #[test]
    fn field_value_deserializes_untagged() {
        let value: FieldValue =
            serde_json::from_str(r#"{"value": 10.0, "uncertainty": 0.1}"#).unwrap();
        assert_eq!(value.as_number(), Some(10.0));
        assert_eq!(value.uncertainty(), Some(0.1));
        let text: FieldValue = serde_json::from_str(r#""foam""#).unwrap();
        assert_eq!(text.as_text(), Some("foam"));
    }
}
