//! Validation check modules.
//!
//! Each module checks one aspect of a sample and returns violations in a
//! fixed order, so the combined result is deterministic.

mod data;
mod required;
mod tolerance;

use ssa_model::{Sample, Violation};
use ssa_standards::AnalysisStandard;

pub fn run_all(sample: &Sample, standard: &AnalysisStandard) -> Vec<Violation> {
    let mut violations = Vec::new();

    // 1. Required fields present
    violations.extend(required::check(sample, standard));

    // 2. Present fields have the right type and lie within tolerance
    violations.extend(tolerance::check(sample, standard));

    // 3. Measurement data meets the data requirements
    violations.extend(data::check(sample, standard));

    violations
}
