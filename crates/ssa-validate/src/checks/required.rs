//! Required specimen field checks.

use ssa_model::{Sample, Violation, ViolationKind};
use ssa_standards::AnalysisStandard;

pub fn check(sample: &Sample, standard: &AnalysisStandard) -> Vec<Violation> {
    standard
        .fields()
        .iter()
        .filter(|rule| rule.is_missing(sample.metadata()))
        .map(|rule| Violation {
            field: rule.name.clone(),
            kind: ViolationKind::Missing,
            expected_rule: rule.requirement(),
            actual: None,
        })
        .collect()
}
