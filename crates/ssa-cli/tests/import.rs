use std::fs;

use ssa_cli::import::{
    ImportOptions, SpecimenFile, import_test, list_csv_files, read_measurements,
};
use ssa_model::{FieldValue, StandardRef};
use ssa_uncertainty::DefaultUncertainties;
use ssa_units::{QuantityKind, UncertaintySpec};
use tempfile::TempDir;

fn standard() -> StandardRef {
    StandardRef::new("generic", "1")
}

#[test]
fn header_units_are_normalized() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t1.csv");
    fs::write(
        &path,
        "# exported by the test machine\nTime (s),Displacement [mm],Force (kN)\n0,0.0,0.0\n1,0.5,1.0\n2,1.0,2.0\n",
    )
    .unwrap();

    let measurements = read_measurements(&path, &ImportOptions::default()).unwrap();

    assert_eq!(measurements.x.quantity, QuantityKind::Displacement);
    assert_eq!(measurements.y.unit, "kN");
    let points = measurements.dataset.points();
    assert_eq!(points.len(), 3);
    assert_eq!(points[1].x, 0.5);
    assert_eq!(points[1].y, 1000.0);
    // 0.5 % of 1 kN, in newtons.
    assert!((points[1].u - 5.0).abs() < 1e-12);
    let keys: Vec<&str> = measurements.assumptions.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["force_uncertainty", "displacement_uncertainty"]);
}

#[test]
fn uncertainty_column_wins_over_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t1.csv");
    fs::write(&path, "Displacement (mm),Load (N),u (N)\n0,0,0.2\n1,10,1%\n").unwrap();
    let options = ImportOptions {
        force_uncertainty: Some(UncertaintySpec::Absolute(3.0)),
        displacement_uncertainty: Some(0.005),
        ..ImportOptions::default()
    };

    let measurements = read_measurements(&path, &options).unwrap();

    let points = measurements.dataset.points();
    assert_eq!(points[0].u, 0.2);
    assert!((points[1].u - 0.1).abs() < 1e-12);
    assert!(measurements.assumptions.is_empty());
    assert_eq!(options.displacement_uncertainty(), 0.005);
}

#[test]
fn missing_force_column_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t1.csv");
    fs::write(&path, "Displacement (mm),Comment\n0,start\n").unwrap();

    let err = read_measurements(&path, &ImportOptions::default()).unwrap_err();
    assert!(err.to_string().contains("no force column"));
}

#[test]
fn bad_cell_names_the_row() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t1.csv");
    fs::write(&path, "Displacement (mm),Force (N)\n0,0\n1,n/a\n").unwrap();

    let err = read_measurements(&path, &ImportOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("row 2"));
}

#[test]
fn specimen_fields_become_canonical_with_recorded_defaults() {
    let specimen: SpecimenFile = toml::from_str(
        r#"
        name = "P-07"

        [procedure]
        machine = "UTM-50"
        procedure = "compression"

        [fields]
        width = { value = 1.0, unit = "cm", uncertainty = "0.01" }
        thickness = { value = 2.0 }
        specimen_shape = "prism"
        strain_rate = 0.001
        "#,
    )
    .unwrap();

    let metadata = specimen
        .into_metadata("fallback", standard(), &DefaultUncertainties::default())
        .unwrap();

    assert_eq!(metadata.name, "P-07");
    assert_eq!(metadata.procedure.machine, "UTM-50");
    assert_eq!(
        metadata.field("width"),
        Some(&FieldValue::Quantity {
            value: 10.0,
            uncertainty: 0.1
        })
    );
    assert_eq!(metadata.field("thickness").and_then(FieldValue::uncertainty), Some(0.1));
    assert_eq!(metadata.field("specimen_shape").and_then(FieldValue::as_text), Some("prism"));
    assert_eq!(metadata.field("strain_rate"), Some(&FieldValue::Number(0.001)));
    assert!(metadata.assumptions.contains_key("thickness_uncertainty"));
    assert!(!metadata.assumptions.contains_key("width_uncertainty"));
}

#[test]
fn quantity_without_known_default_needs_an_uncertainty() {
    let specimen: SpecimenFile = toml::from_str("[fields]\nmass = { value = 12.5 }\n").unwrap();
    let err = specimen
        .into_metadata("m", standard(), &DefaultUncertainties::default())
        .unwrap_err();
    assert!(err.to_string().contains("mass"));
}

#[test]
fn sidecar_specimen_file_is_picked_up() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("a1.csv");
    fs::write(&csv, "Displacement (mm),Force (N)\n0,0\n1,10\n").unwrap();
    fs::write(dir.path().join("a1.toml"), "name = \"A1 sidecar\"\n").unwrap();

    let test = import_test(&csv, None, standard(), &ImportOptions::default()).unwrap();

    assert_eq!(test.metadata.name, "A1 sidecar");
    assert_eq!(test.metadata.standard, standard());
    assert!(test.metadata.assumptions.contains_key("force_uncertainty"));
}

#[test]
fn csv_listing_is_sorted_and_filtered() {
    let dir = TempDir::new().unwrap();
    for name in ["b.csv", "a.CSV", "a.toml", "notes.txt"] {
        fs::write(dir.path().join(name), "").unwrap();
    }
    let files = list_csv_files(dir.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.CSV", "b.csv"]);
}
