//! Type and tolerance checks for the fields a sample supplies.
//!
//! Absent optional fields are skipped; absent required fields are reported
//! by the required check, not here.

use ssa_model::{FieldValue, Sample, Violation, ViolationKind};
use ssa_standards::{AnalysisStandard, Tolerance};

pub fn check(sample: &Sample, standard: &AnalysisStandard) -> Vec<Violation> {
    let mut violations = Vec::new();

    for rule in standard.fields() {
        let Some(value) = sample.metadata().field(&rule.name) else {
            continue;
        };

        if !rule.kind.accepts(value) {
            violations.push(Violation {
                field: rule.name.clone(),
                kind: ViolationKind::WrongType,
                expected_rule: format!("{} must be a {}", rule.name, rule.kind.as_str()),
                actual: Some(value.to_string()),
            });
            continue;
        }

        let Some(tolerance) = rule.tolerance() else {
            continue;
        };
        let kind = match &tolerance {
            Tolerance::Range { min, max } => match value.as_number() {
                Some(number) if within(number, *min, *max) => continue,
                _ => ViolationKind::OutOfTolerance,
            },
            Tolerance::OneOf(allowed) => match value {
                FieldValue::Text(text)
                    if allowed
                        .iter()
                        .any(|candidate| candidate.eq_ignore_ascii_case(text.trim())) =>
                {
                    continue;
                }
                _ => ViolationKind::NotAllowed,
            },
        };
        violations.push(Violation {
            field: rule.name.clone(),
            kind,
            expected_rule: tolerance.describe(&rule.name),
            actual: Some(value.to_string()),
        });
    }

    violations
}

fn within(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    value.is_finite() && min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}
