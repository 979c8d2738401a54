//! Report assembly.
//!
//! Assembly only reads from the store. Nothing is recorded while a report
//! is built, so the same selection can be reported any number of times.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ssa_model::{
    AnalysisOptions, AuditEntry, AuditEvent, DisplayOptions, EngineError, GroupName,
    OperationKind, Result, Sample, SampleId, ValidationResult,
};
use ssa_standards::{AnalysisStandard, StandardsRegistry};
use ssa_store::SampleStore;
use ssa_standards::field;
use ssa_transform::{compute_properties, specimen};
use ssa_uncertainty::{Measured, PROPAGATION_RULES_VERSION};
use ssa_units::{DisplayConversion, QuantityKind};
use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::payload::{
    AssumptionReport, AssumptionSource, ExcludedPoint, GroupReport, PropertyValue, ReportPayload,
    SampleReport, StandardSummary,
};
use crate::series::PlotSeries;

/// One entry of a report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Selection {
    Sample(SampleId),
    Group(GroupName),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub display: DisplayOptions,
    /// Attach a plot series to every sample.
    pub include_series: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            display: DisplayOptions::default(),
            include_series: true,
        }
    }
}

impl From<&AnalysisOptions> for ReportOptions {
    fn from(options: &AnalysisOptions) -> Self {
        Self {
            display: options.display.clone(),
            ..Self::default()
        }
    }
}

/// Builds the report payload for `selections`.
///
/// Every selected sample must be live with an intact lineage. A sample
/// selected both directly and through a group is reported once.
pub fn assemble(
    store: &dyn SampleStore,
    standards: &StandardsRegistry,
    selections: &[Selection],
    options: &ReportOptions,
) -> Result<ReportPayload> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut groups = Vec::new();
    for selection in selections {
        match selection {
            Selection::Sample(id) => {
                if seen.insert(*id) {
                    order.push(*id);
                }
            }
            Selection::Group(name) => {
                let group = store.group(name)?;
                for id in &group.members {
                    if seen.insert(*id) {
                        order.push(*id);
                    }
                }
                groups.push(group);
            }
        }
    }

    let samples = order
        .into_iter()
        .map(|id| sample_report(store, standards, id, options))
        .collect::<Result<Vec<_>>>()?;

    let groups = groups
        .into_iter()
        .map(|group| {
            let members: Vec<&SampleReport> = group
                .members
                .iter()
                .filter_map(|id| samples.iter().find(|s| s.id == *id))
                .collect();
            Ok(GroupReport {
                aggregates: aggregate(&members)?,
                name: group.name,
                role: group.role,
                members: group.members.into_iter().collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(samples = samples.len(), groups = groups.len(), "assembled report");
    Ok(ReportPayload {
        generated_at: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        propagation_rules: PROPAGATION_RULES_VERSION.to_string(),
        samples,
        groups,
    })
}

fn sample_report(
    store: &dyn SampleStore,
    standards: &StandardsRegistry,
    id: SampleId,
    options: &ReportOptions,
) -> Result<SampleReport> {
    let lineage = store.intact_lineage(id)?;
    if store.is_retired(id)? {
        return Err(EngineError::SampleRetired { sample: id });
    }
    let sample = store.get(id)?;
    let root = store.get(sample.lineage_root())?;
    let standard = standards.resolve(sample.standard())?;
    let history = store.history(id)?;

    let stress_strain = history
        .iter()
        .filter_map(AuditEntry::operation)
        .any(|op| op.kind() == OperationKind::StressStrain);
    let mut properties = if stress_strain {
        properties(&sample, &standard, &options.display)?
    } else {
        Vec::new()
    };
    if sample.metadata().field(field::MASS).is_some() {
        let density = specimen::density(sample.metadata())?;
        properties.push(property(
            "density",
            "g/cm³",
            density,
            standard.propagation().coverage_factor,
            None,
        )?);
    }
    let (series, tangent) = if options.include_series {
        let tangent = if stress_strain {
            Some(PlotSeries::tangent_modulus(&sample, &options.display)?)
        } else {
            None
        };
        (
            Some(PlotSeries::for_sample(&sample, stress_strain, &options.display)?),
            tangent,
        )
    } else {
        (None, None)
    };
    debug!(sample = %id, properties = properties.len(), "assembled sample report");

    Ok(SampleReport {
        id,
        name: sample.name().to_string(),
        standard: summary(&standard),
        procedure: sample.metadata().procedure.clone(),
        fields: sample.metadata().fields.clone(),
        lineage,
        raw_digest: root.data().digest(),
        digest: sample.data().digest(),
        points: sample.data().len(),
        excluded: excluded(&sample),
        assumptions: assumptions(&sample, &history),
        validation: latest_validation(&standard, &history),
        properties,
        series,
        tangent,
        history,
    })
}

fn summary(standard: &AnalysisStandard) -> StandardSummary {
    StandardSummary {
        name: standard.name().to_string(),
        version: standard.version().to_string(),
        title: standard.title().to_string(),
        fingerprint: standard.fingerprint().to_string(),
        rules_version: standard.propagation().rules_version.clone(),
        coverage_factor: standard.propagation().coverage_factor,
    }
}

fn properties(
    sample: &Sample,
    standard: &AnalysisStandard,
    display: &DisplayOptions,
) -> Result<Vec<PropertyValue>> {
    let k = standard.propagation().coverage_factor;
    compute_properties(sample.data(), standard.formulas())?
        .entries()
        .into_iter()
        .map(|(name, unit, measured)| {
            let conversion = match unit {
                "MPa" => Some(DisplayConversion::new(QuantityKind::Stress, &display.stress)?),
                "mm/mm" => Some(DisplayConversion::new(QuantityKind::Strain, &display.strain)?),
                _ => None,
            };
            property(name, unit, measured, k, conversion)
        })
        .collect()
}

fn property(
    name: &str,
    unit: &str,
    measured: Measured,
    k: f64,
    conversion: Option<DisplayConversion>,
) -> Result<PropertyValue> {
    measured.check(name, "report")?;
    Ok(PropertyValue {
        name: name.to_string(),
        unit: unit.to_string(),
        value: measured.value,
        uncertainty: measured.uncertainty,
        expanded_uncertainty: measured.uncertainty * k,
        display_unit: conversion
            .as_ref()
            .map_or_else(|| unit.to_string(), |c| c.display_unit.clone()),
        display_value: conversion
            .as_ref()
            .map_or(measured.value, |c| c.value(measured.value)),
        display_uncertainty: conversion
            .as_ref()
            .map_or(measured.uncertainty, |c| c.uncertainty(measured.uncertainty)),
    })
}

fn excluded(sample: &Sample) -> Vec<ExcludedPoint> {
    sample
        .data()
        .points()
        .iter()
        .enumerate()
        .filter_map(|(index, point)| {
            point.flag.as_ref().map(|flag| ExcludedPoint {
                index,
                x: point.x,
                y: point.y,
                u: point.u,
                rule: flag.rule.clone(),
                residual: flag.residual,
            })
        })
        .collect()
}

fn assumptions(sample: &Sample, history: &[AuditEntry]) -> Vec<AssumptionReport> {
    let from_metadata = sample
        .metadata()
        .assumptions
        .iter()
        .map(|(key, value)| AssumptionReport {
            key: key.clone(),
            value: value.value.clone(),
            set_by: value.set_by.clone(),
            set_at: value.set_at,
            source: AssumptionSource::Metadata,
            entry: None,
        });
    let from_audit = history.iter().filter_map(|entry| match &entry.event {
        AuditEvent::AssumptionOverridden { key, value } => Some(AssumptionReport {
            key: key.clone(),
            value: value.value.clone(),
            set_by: value.set_by.clone(),
            set_at: value.set_at,
            source: AssumptionSource::Audit,
            entry: Some(entry.id),
        }),
        _ => None,
    });
    from_metadata.chain(from_audit).collect()
}

fn latest_validation(standard: &AnalysisStandard, history: &[AuditEntry]) -> Option<ValidationResult> {
    history.iter().rev().find_map(|entry| match &entry.event {
        AuditEvent::Validated { result }
            if result.standard.name == standard.name()
                && result.standard.version == standard.version() =>
        {
            Some(result.clone())
        }
        _ => None,
    })
}
