use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use ssa_cli::analysis::{Analyzer, save_batch_groups};
use ssa_cli::import::{ImportOptions, import_test};
use ssa_model::{
    AnalysisOptions, Dataset, FieldValue, GroupName, OperationKind, SampleMetadata, StandardRef,
};
use ssa_report::{ReportOptions, Selection, assemble};
use ssa_standards::StandardsRegistry;
use ssa_store::{InMemoryStore, SampleStore, load_store, save_store};
use tempfile::TempDir;

const SPECIMEN: &str = r#"
name = "C-01"

[fields]
width = { value = 10.0, uncertainty = "0.1" }
thickness = { value = 1.0, uncertainty = "0.05" }
gauge_length = { value = 100.0, uncertainty = "0.5" }
"#;

/// 1000 MPa up to 1 % strain, 100 MPa after, on a 10 mm² x 100 mm specimen.
fn write_curve(path: &Path) {
    let mut csv = String::from("Displacement (mm),Force (N),u (N)\n");
    for i in 0..=80 {
        let strain = f64::from(i) * 0.0005;
        let stress = if strain <= 0.01 {
            1000.0 * strain
        } else {
            10.0 + 100.0 * (strain - 0.01)
        };
        writeln!(csv, "{},{},0.5", strain * 100.0, stress * 10.0).unwrap();
    }
    fs::write(path, csv).unwrap();
}

fn options() -> AnalysisOptions {
    AnalysisOptions::default().without_outliers()
}

#[test]
fn analysis_converts_and_reports_properties() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("c01.csv");
    write_curve(&csv);
    fs::write(dir.path().join("c01.toml"), SPECIMEN).unwrap();

    let store = InMemoryStore::new();
    let registry = StandardsRegistry::with_builtins().unwrap();
    let options = options();
    let analyzer = Analyzer::new(&store, &registry, &options, 0.01).unwrap();
    let test = import_test(&csv, None, analyzer.standard_ref(), &ImportOptions::default()).unwrap();

    let ingested = analyzer.ingest(test).unwrap();
    assert!(ingested.validation.passed);
    let result = analyzer.process(ingested.raw).unwrap();

    let sample = store.get(result).unwrap();
    assert_eq!(sample.operation().map(|op| op.kind()), Some(OperationKind::StressStrain));
    assert_eq!(store.lineage(result).unwrap().len(), 3);
    assert!(sample.standard().fingerprint.is_some());

    let payload = assemble(
        &store,
        &registry,
        &[Selection::Sample(result)],
        &ReportOptions::from(&options),
    )
    .unwrap();
    let report = payload.sample(result).unwrap();
    let modulus = report.property("modulus").unwrap();
    assert!((modulus.value - 1000.0).abs() < 1e-6);
    assert!(report.validation.as_ref().is_some_and(|v| v.passed));
    assert!(report.assumptions.iter().any(|a| a.key == "displacement_uncertainty"));
}

#[test]
fn missing_geometry_stops_before_conversion() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("c02.csv");
    write_curve(&csv);

    let store = InMemoryStore::new();
    let registry = StandardsRegistry::with_builtins().unwrap();
    let options = options();
    let analyzer = Analyzer::new(&store, &registry, &options, 0.01).unwrap();
    let test = import_test(&csv, None, analyzer.standard_ref(), &ImportOptions::default()).unwrap();

    let ingested = analyzer.ingest(test).unwrap();
    assert!(!ingested.validation.passed);
    let result = analyzer.process(ingested.raw).unwrap();

    let sample = store.get(result).unwrap();
    assert_eq!(sample.operation().map(|op| op.kind()), Some(OperationKind::Zeroing));
}

#[test]
fn unknown_standard_is_a_configuration_error() {
    let store = InMemoryStore::new();
    let registry = StandardsRegistry::with_builtins().unwrap();
    let options = AnalysisOptions::default()
        .with_standard(ssa_model::StandardSelector::new("astm-e8", "2024"));
    let err = Analyzer::new(&store, &registry, &options, 0.01).err().unwrap();
    assert!(matches!(err, ssa_model::EngineError::Configuration { .. }));
}

#[test]
fn analysed_store_survives_a_snapshot() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("c01.csv");
    write_curve(&csv);
    fs::write(dir.path().join("c01.toml"), SPECIMEN).unwrap();

    let store = InMemoryStore::new();
    let registry = StandardsRegistry::with_builtins().unwrap();
    let options = options();
    let analyzer = Analyzer::new(&store, &registry, &options, 0.01).unwrap();
    let test = import_test(&csv, None, analyzer.standard_ref(), &ImportOptions::default()).unwrap();
    let raw = analyzer.ingest(test).unwrap().raw;
    let result = analyzer.process(raw).unwrap();

    let snapshot = dir.path().join("store.ssa");
    save_store(&store, &snapshot).unwrap();
    let restored = load_store(&snapshot).unwrap();

    assert_eq!(restored.ids().unwrap(), store.ids().unwrap());
    assert_eq!(restored.history(result).unwrap(), store.history(result).unwrap());
}

#[test]
fn batch_groups_split_by_a_specimen_field() {
    let store = InMemoryStore::new();
    let standard = StandardRef::new("generic", "1");
    let mut members = Vec::new();
    let specimens = [
        ("P1", Some("prism")),
        ("C1", Some("cylinder")),
        ("P2", Some("prism")),
        ("X1", None),
    ];
    for (name, shape) in specimens {
        let mut metadata = SampleMetadata::new(name, standard.clone());
        if let Some(shape) = shape {
            metadata = metadata.with_field("specimen_shape", FieldValue::Text(shape.to_string()));
        }
        let data = Dataset::from_triples([(0.0, 0.0, 0.1), (1.0, 1.0, 0.1)]);
        members.push(store.create_raw(data, metadata, standard.clone()).unwrap());
    }

    let batch = GroupName::new("run-3").unwrap();
    let names = save_batch_groups(&store, batch.clone(), &members, Some("specimen_shape")).unwrap();
    let names: Vec<&str> = names.iter().map(GroupName::as_str).collect();
    assert_eq!(
        names,
        vec!["run-3", "run-3/specimen_shape=cylinder", "run-3/specimen_shape=prism"]
    );
    assert_eq!(store.group(&batch).unwrap().members.len(), 4);
    let prisms = store
        .group(&GroupName::new("run-3/specimen_shape=prism").unwrap())
        .unwrap();
    assert_eq!(prisms.members.len(), 2);
    assert_eq!(prisms.role, "specimen_shape");
}

#[test]
fn batch_group_without_a_field_is_saved_alone() {
    let store = InMemoryStore::new();
    let standard = StandardRef::new("generic", "1");
    let raw = store
        .create_raw(
            Dataset::from_triples([(0.0, 0.0, 0.1)]),
            SampleMetadata::new("A1", standard.clone()),
            standard,
        )
        .unwrap();
    let names = save_batch_groups(&store, GroupName::new("solo").unwrap(), &[raw], None).unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(store.groups().unwrap().len(), 1);
}
