//! Report payload types.
//!
//! The payload is a plain serializable tree. A document writer needs
//! nothing else from the engine to render it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use ssa_model::{
    AuditEntry, EntryId, FieldValue, GroupName, SampleId, TestProcedure, ValidationResult,
};

use crate::series::PlotSeries;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    pub generated_at: DateTime<Utc>,
    pub engine_version: String,
    /// Version of the uncertainty propagation rules behind every value.
    pub propagation_rules: String,
    pub samples: Vec<SampleReport>,
    pub groups: Vec<GroupReport>,
}

impl ReportPayload {
    pub fn sample(&self, id: SampleId) -> Option<&SampleReport> {
        self.samples.iter().find(|s| s.id == id)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardSummary {
    pub name: String,
    pub version: String,
    pub title: String,
    pub fingerprint: String,
    pub rules_version: String,
    pub coverage_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionSource {
    /// Set on the sample metadata at import.
    Metadata,
    /// Recorded later as an audit event.
    Audit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssumptionReport {
    pub key: String,
    pub value: String,
    pub set_by: String,
    pub set_at: DateTime<Utc>,
    pub source: AssumptionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyValue {
    pub name: String,
    /// Canonical unit of `value` and `uncertainty`.
    pub unit: String,
    pub value: f64,
    /// Standard uncertainty.
    pub uncertainty: f64,
    /// Uncertainty times the standard's coverage factor.
    pub expanded_uncertainty: f64,
    pub display_unit: String,
    pub display_value: f64,
    pub display_uncertainty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedPoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub u: f64,
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub id: SampleId,
    pub name: String,
    pub standard: StandardSummary,
    pub procedure: TestProcedure,
    pub fields: BTreeMap<String, FieldValue>,
    /// Raw sample first, this sample last.
    pub lineage: Vec<SampleId>,
    pub raw_digest: String,
    pub digest: String,
    pub points: usize,
    pub excluded: Vec<ExcludedPoint>,
    pub assumptions: Vec<AssumptionReport>,
    /// Latest validation in the lineage against this sample's standard.
    pub validation: Option<ValidationResult>,
    pub properties: Vec<PropertyValue>,
    pub history: Vec<AuditEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<PlotSeries>,
    /// Tangent modulus against strain, for stress/strain samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tangent: Option<PlotSeries>,
}

impl SampleReport {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateValue {
    pub name: String,
    pub unit: String,
    /// Members contributing a value.
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation, absent for a single value.
    pub std_dev: Option<f64>,
    /// Scatter of the mean combined with the members' own uncertainties.
    pub combined_uncertainty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub name: GroupName,
    pub role: String,
    pub members: Vec<SampleId>,
    pub aggregates: Vec<AggregateValue>,
}
