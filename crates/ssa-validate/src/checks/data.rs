//! Measurement data requirement checks.

use ssa_model::{Sample, Violation, ViolationKind};
use ssa_standards::AnalysisStandard;

pub fn check(sample: &Sample, standard: &AnalysisStandard) -> Vec<Violation> {
    let requirements = standard.data();
    let data = sample.data();
    let mut violations = Vec::new();

    let active = data.active_count();
    if active < requirements.min_points {
        violations.push(Violation {
            field: "data.points".to_string(),
            kind: ViolationKind::Data,
            expected_rule: format!("at least {} active points", requirements.min_points),
            actual: Some(active.to_string()),
        });
    }

    if let Some(limit) = requirements.max_excluded_fraction
        && !data.is_empty()
    {
        let excluded = data.len() - active;
        let fraction = excluded as f64 / data.len() as f64;
        if fraction > limit {
            violations.push(Violation {
                field: "data.excluded".to_string(),
                kind: ViolationKind::Data,
                expected_rule: format!("at most {limit} of points excluded"),
                actual: Some(format!("{excluded} of {}", data.len())),
            });
        }
    }

    if let Some(min_span) = requirements.min_x_span {
        let (lo, hi) = data
            .active()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.x), hi.max(p.x))
            });
        let span = if hi >= lo { hi - lo } else { 0.0 };
        if span < min_span {
            violations.push(Violation {
                field: "data.x_span".to_string(),
                kind: ViolationKind::Data,
                expected_rule: format!("independent variable spans at least {min_span}"),
                actual: Some(span.to_string()),
            });
        }
    }

    violations
}
