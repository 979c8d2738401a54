//! The analysis run behind `ssa analyze` and `ssa batch`.
//!
//! Ingest creates the raw sample and validates it. Processing applies the
//! configured cleaning steps and, when the specimen geometry is known,
//! converts force/displacement to stress/strain.

use std::sync::Arc;

use ssa_model::{
    AnalysisOptions, GroupName, Result, Sample, SampleGroup, SampleId, StandardRef,
    ValidationResult,
};
use ssa_standards::{AnalysisStandard, StandardsRegistry};
use ssa_store::SampleStore;
use ssa_transform::grouping::{assign, group_by_field};
use ssa_transform::{Pipeline, StressStrain, apply_to_store};
use tracing::{info, info_span, warn};

use crate::import::ImportedTest;

/// Outcome of ingesting one test.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub raw: SampleId,
    pub validation: ValidationResult,
}

pub struct Analyzer<'a> {
    store: &'a dyn SampleStore,
    standard: Arc<AnalysisStandard>,
    options: &'a AnalysisOptions,
    pipeline: Pipeline,
    /// Standard uncertainty of the displacement channel, mm.
    displacement_uncertainty: f64,
}

impl<'a> Analyzer<'a> {
    /// Resolves the configured standard up front so every test of a run is
    /// checked against the same fingerprint.
    pub fn new(
        store: &'a dyn SampleStore,
        standards: &StandardsRegistry,
        options: &'a AnalysisOptions,
        displacement_uncertainty: f64,
    ) -> Result<Self> {
        let selector = &options.standard;
        let standard = standards.resolve(&StandardRef::new(&selector.name, &selector.version))?;
        Ok(Self {
            store,
            standard,
            options,
            pipeline: Pipeline::from_options(options),
            displacement_uncertainty,
        })
    }

    /// Reference recorded on every sample, fingerprint included.
    pub fn standard_ref(&self) -> StandardRef {
        self.standard.standard_ref()
    }

    pub fn standard(&self) -> &AnalysisStandard {
        &self.standard
    }

    pub fn ingest(&self, test: ImportedTest) -> Result<Ingested> {
        let ImportedTest {
            measurements,
            metadata,
            ..
        } = test;
        let raw = self
            .store
            .create_raw(measurements.dataset, metadata, self.standard_ref())?;
        let sample = self.store.get(raw)?;
        let validation = ssa_validate::validate(&sample, &self.standard);
        if self.options.audit_validation {
            self.store.record_validation(raw, validation.clone())?;
        }
        Ok(Ingested { raw, validation })
    }

    /// Runs the cleaning pipeline from `raw` and returns the final sample.
    pub fn process(&self, raw: SampleId) -> Result<SampleId> {
        let span = info_span!("process", sample = %raw);
        let _guard = span.enter();

        let cleaned = self.pipeline.run(self.store, raw)?.last().copied().unwrap_or(raw);
        let sample = self.store.get(cleaned)?;
        let conversion =
            match StressStrain::from_metadata(sample.metadata(), self.displacement_uncertainty) {
                Ok(conversion) => conversion,
                Err(err) => {
                    warn!(error = %err, "stress-strain conversion skipped");
                    return Ok(cleaned);
                }
            };
        let converted = apply_to_store(self.store, cleaned, &conversion)?;
        info!(raw = %raw, result = %converted, "analysis finished");
        Ok(converted)
    }
}

/// Saves the batch group over `members` and, with `group_by`, one subgroup
/// per distinct value of that metadata field, named `{name}/{field}={value}`.
/// Returns the saved group names, the batch group first.
pub fn save_batch_groups(
    store: &dyn SampleStore,
    name: GroupName,
    members: &[SampleId],
    group_by: Option<&str>,
) -> Result<Vec<GroupName>> {
    let batch = assign(&SampleGroup::new(name.clone(), "batch"), members.iter().copied());
    store.save_group(batch)?;
    let mut names = vec![name.clone()];
    if let Some(field) = group_by {
        let samples = members
            .iter()
            .map(|id| store.get(*id))
            .collect::<Result<Vec<Arc<Sample>>>>()?;
        let prefix = format!("{name}/");
        for group in group_by_field(samples.iter().map(Arc::as_ref), &prefix, field, field)? {
            names.push(group.name.clone());
            store.save_group(group)?;
        }
        info!(field, groups = names.len() - 1, "batch subgroups saved");
    }
    Ok(names)
}
