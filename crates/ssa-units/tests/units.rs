use proptest::prelude::*;
use ssa_model::EngineError;
use ssa_units::{
    Channel, DisplayConversion, QuantityKind, RawPoint, UncertaintySpec, normalize,
    normalize_points, parse_header,
};

#[test]
fn scenario_millimetres_and_newtons_are_already_canonical() {
    let x = parse_header("Displacement (mm)");
    let y = parse_header("Force (N)");
    let points = [
        RawPoint::new(0.0, 0.0, UncertaintySpec::Absolute(0.01)),
        RawPoint::new(1.0, 5.0, UncertaintySpec::Absolute(0.02)),
        RawPoint::new(2.0, 11.0, UncertaintySpec::Absolute(0.02)),
    ];
    let data = normalize_points(
        &points,
        &Channel::new(x.quantity.expect("x kind"), x.unit.expect("x unit")),
        &Channel::new(y.quantity.expect("y kind"), y.unit.expect("y unit")),
    )
    .expect("normalize");
    let triples: Vec<_> = data.points().iter().map(|p| (p.x, p.y, p.u)).collect();
    assert_eq!(
        triples,
        vec![(0.0, 0.0, 0.01), (1.0, 5.0, 0.02), (2.0, 11.0, 0.02)]
    );
}

#[test]
fn mismatch_maps_to_engine_error() {
    let err: EngineError = normalize(1.0, "MPa", QuantityKind::Force)
        .unwrap_err()
        .into();
    match err {
        EngineError::UnitMismatch {
            declared,
            quantity,
            canonical,
        } => {
            assert_eq!(declared, "MPa");
            assert_eq!(quantity, "force");
            assert_eq!(canonical, "N");
        }
        other => panic!("unexpected error: {other}"),
    }
}

proptest! {
    #[test]
    fn display_conversion_undoes_normalization(value in -1.0e6f64..1.0e6) {
        for (unit, kind) in [("kN", QuantityKind::Force), ("psi", QuantityKind::Stress), ("K", QuantityKind::Temperature)] {
            let canonical = normalize(value, unit, kind).expect("normalize");
            let shown = DisplayConversion::new(kind, unit).expect("conversion").value(canonical);
            prop_assert!((shown - value).abs() <= 1e-9 * value.abs().max(1.0));
        }
    }
}
