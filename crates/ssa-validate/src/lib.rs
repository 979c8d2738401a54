//! Standards validation.
//!
//! Checking a sample against a standard never fails for business-rule
//! reasons: non-compliance comes back as a [`ValidationResult`] and the
//! caller decides whether to block. Only a missing or unresolvable standard
//! is an error.

#![deny(unsafe_code)]

mod checks;

use std::fmt::Write as _;

use ssa_model::{EngineError, Sample, StandardRef, ValidationResult, ViolationKind};
use ssa_standards::{AnalysisStandard, StandardsRegistry};
use tracing::{debug, warn};

/// Capability of checking samples, implemented by analysis standards.
pub trait Validate {
    fn validate(&self, sample: &Sample) -> ValidationResult;
}

impl Validate for AnalysisStandard {
    fn validate(&self, sample: &Sample) -> ValidationResult {
        validate(sample, self)
    }
}

/// Checks `sample` against `standard`. Pure: no state outside the arguments.
pub fn validate(sample: &Sample, standard: &AnalysisStandard) -> ValidationResult {
    let violations = checks::run_all(sample, standard);
    let result = ValidationResult::from_violations(standard.standard_ref(), violations);
    if result.passed {
        debug!(sample = %sample.id(), standard = %standard.key(), "validation passed");
    } else {
        warn!(
            sample = %sample.id(),
            standard = %standard.key(),
            violations = result.violations.len(),
            "validation failed"
        );
    }
    result
}

/// Resolves the standard named by `reference` and validates against it.
pub fn validate_with(
    sample: &Sample,
    reference: &StandardRef,
    registry: &StandardsRegistry,
) -> Result<ValidationResult, EngineError> {
    let standard = registry.resolve(reference)?;
    Ok(standard.validate(sample))
}

/// Validates against the standard recorded in the sample's own metadata.
pub fn validate_by_ref(
    sample: &Sample,
    registry: &StandardsRegistry,
) -> Result<ValidationResult, EngineError> {
    validate_with(sample, sample.standard(), registry)
}

pub fn kind_label(kind: ViolationKind) -> &'static str {
    match kind {
        ViolationKind::Missing => "missing",
        ViolationKind::OutOfTolerance => "out of tolerance",
        ViolationKind::NotAllowed => "not allowed",
        ViolationKind::WrongType => "wrong type",
        ViolationKind::Data => "data",
    }
}

/// Plain-text summary, one line per violation.
pub fn render_summary(result: &ValidationResult) -> String {
    let mut out = String::new();
    if result.passed {
        let _ = write!(out, "{}: passed", result.standard);
        return out;
    }
    let _ = write!(
        out,
        "{}: FAILED ({} violation{})",
        result.standard,
        result.violations.len(),
        if result.violations.len() == 1 { "" } else { "s" }
    );
    for violation in &result.violations {
        let _ = write!(
            out,
            "\n  - {} [{}]: {}",
            violation.field,
            kind_label(violation.kind),
            violation.expected_rule
        );
        if let Some(actual) = &violation.actual {
            let _ = write!(out, " (actual {actual})");
        }
    }
    out
}
