use insta::assert_snapshot;
use proptest::prelude::*;
use ssa_model::{
    Dataset, EngineError, FieldValue, Sample, SampleId, SampleMetadata, StandardRef,
    ViolationKind,
};
use ssa_standards::StandardsRegistry;
use ssa_validate::{Validate, render_summary, validate, validate_by_ref};

fn quantity(value: f64) -> FieldValue {
    FieldValue::Quantity {
        value,
        uncertainty: 0.1,
    }
}

fn sample(standard: StandardRef, metadata: impl FnOnce(SampleMetadata) -> SampleMetadata) -> Sample {
    Sample::raw(
        SampleId::new(1),
        metadata(SampleMetadata::new("foam-01", standard)),
        Dataset::from_triples([(0.0, 0.0, 0.01), (1.0, 5.0, 0.02), (2.0, 11.0, 0.02)]),
    )
}

#[test]
fn iso_violations_are_reported_in_standard_order() {
    let registry = StandardsRegistry::with_builtins().expect("builtins");
    let iso = registry.get("iso-13314", "2011").expect("iso");
    let sample = sample(iso.standard_ref(), |m| {
        m.with_field("specimen_shape", FieldValue::Text("sphere".into()))
            .with_field("width", quantity(12.0))
            .with_field("gauge_length", quantity(4.0))
            .with_field("strain_rate", FieldValue::Text("fast".into()))
    });

    let result = validate(&sample, &iso);
    assert!(!result.passed);
    assert_eq!(result.count(ViolationKind::Missing), 1);
    assert_snapshot!(render_summary(&result), @r"
    iso-13314@2011: FAILED (5 violations)
      - thickness [missing]: thickness is required (quantity) unless diameter is given
      - specimen_shape [not allowed]: specimen_shape in [cylinder, prism] (actual sphere)
      - gauge_length [out of tolerance]: 10 <= gauge_length <= 200 (actual 4 ± 0.1)
      - strain_rate [wrong type]: strain_rate must be a number (actual fast)
      - data.points [data]: at least 20 active points (actual 3)
    ");
}

#[test]
fn compliant_sample_passes() {
    let registry = StandardsRegistry::with_builtins().expect("builtins");
    let generic = registry.get("generic", "1").expect("generic");
    let sample = sample(generic.standard_ref(), |m| {
        m.with_field("width", quantity(10.0))
            .with_field("thickness", quantity(2.0))
            .with_field("gauge_length", quantity(50.0))
    });
    let result = generic.validate(&sample);
    assert!(result.passed);
    assert!(result.violations.is_empty());
    assert_eq!(render_summary(&result), "generic@1: passed");
    assert_eq!(result.standard.fingerprint.as_deref(), Some(generic.fingerprint()));
}

#[test]
fn round_specimen_passes_with_a_diameter() {
    let registry = StandardsRegistry::with_builtins().expect("builtins");
    let generic = registry.get("generic", "1").expect("generic");
    let round = sample(generic.standard_ref(), |m| {
        m.with_field("diameter", quantity(6.0))
            .with_field("gauge_length", quantity(30.0))
    });
    let result = validate(&round, &generic);
    assert!(result.passed, "{}", render_summary(&result));

    let flat_without_thickness = sample(generic.standard_ref(), |m| {
        m.with_field("width", quantity(6.0))
            .with_field("gauge_length", quantity(30.0))
    });
    let result = validate(&flat_without_thickness, &generic);
    assert_eq!(result.count(ViolationKind::Missing), 1);
    assert_eq!(result.violations[0].field, "thickness");
}

#[test]
fn unknown_standard_is_a_configuration_error() {
    let registry = StandardsRegistry::with_builtins().expect("builtins");
    let sample = sample(StandardRef::new("astm-e8", "2022"), |m| m);
    let err = validate_by_ref(&sample, &registry).expect_err("standard is missing");
    assert!(matches!(err, EngineError::Configuration { .. }));
}

#[test]
fn business_rule_failure_is_not_an_error() {
    let registry = StandardsRegistry::with_builtins().expect("builtins");
    let sample = sample(StandardRef::new("generic", "1"), |m| m);
    let result = validate_by_ref(&sample, &registry).expect("resolves");
    assert_eq!(result.count(ViolationKind::Missing), 3);
}

proptest! {
    #[test]
    fn validation_is_deterministic(width in -50.0f64..150.0, gauge in -50.0f64..250.0) {
        let registry = StandardsRegistry::with_builtins().expect("builtins");
        let iso = registry.get("iso-13314", "2011").expect("iso");
        let sample = sample(iso.standard_ref(), |m| {
            m.with_field("width", quantity(width))
                .with_field("gauge_length", quantity(gauge))
        });
        prop_assert_eq!(validate(&sample, &iso), validate(&sample, &iso));
    }
}
