use std::fs;

use insta::assert_snapshot;
use ssa_model::EngineError;
use ssa_standards::{StandardsError, StandardsRegistry, load_file};

fn summary(registry: &StandardsRegistry) -> String {
    registry
        .iter()
        .map(|s| {
            format!(
                "{} fields={} min_points={} yield_offset={}",
                s.key(),
                s.fields().len(),
                s.data().min_points,
                s.formulas().yield_offset
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn builtin_summary_is_stable() {
    let registry = StandardsRegistry::with_builtins().expect("builtins");
    assert_snapshot!(summary(&registry), @r"
    generic@1 fields=4 min_points=3 yield_offset=0.002
    iso-13314@2011 fields=7 min_points=20 yield_offset=0.01
    ");
}

#[test]
fn load_dir_registers_new_versions() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("lab-2.toml"),
        "[standard]\nname = \"lab\"\nversion = \"2\"\n\n[[fields]]\nname = \"mass\"\nunit = \"g\"\n",
    )
    .expect("write");
    fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

    let mut registry = StandardsRegistry::with_builtins().expect("builtins");
    let count = registry.load_dir(dir.path()).expect("load dir");
    assert_eq!(count, 1);
    let lab = registry.get("lab", "2").expect("lab@2");
    assert_eq!(lab.fields()[0].name, "mass");
}

#[test]
fn malformed_file_reports_its_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[standard\nname = ").expect("write");
    let err = load_file(&path).expect_err("parse should fail");
    assert!(matches!(err, StandardsError::Toml { .. }));
    assert!(err.to_string().contains("broken.toml"));

    let engine: EngineError = err.into();
    assert!(matches!(engine, EngineError::Configuration { .. }));
}
