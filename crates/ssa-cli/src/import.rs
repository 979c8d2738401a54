//! Measurement and specimen file import.
//!
//! A test is a CSV file with a displacement and a force column, units in the
//! headers (`Force (kN)`, `Displacement [mm]`), and an optional `u` column
//! holding the force uncertainty. Specimen metadata lives in a TOML file
//! next to it with the same stem.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use ssa_model::{Dataset, FieldValue, SampleMetadata, StandardRef, TestProcedure};
use ssa_uncertainty::DefaultUncertainties;
use ssa_units::{
    Channel, ColumnHeader, QuantityKind, RawPoint, UncertaintySpec, normalize_field,
    normalize_points, parse_header,
};
use tracing::{debug, info};

/// Recorded as `set_by` for assumptions made during import.
pub const IMPORT_ACTOR: &str = "import";

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Force uncertainty when the file has no `u` column.
    pub force_uncertainty: Option<UncertaintySpec>,
    /// Displacement channel uncertainty, mm.
    pub displacement_uncertainty: Option<f64>,
    pub defaults: DefaultUncertainties,
}

impl ImportOptions {
    pub fn displacement_uncertainty(&self) -> f64 {
        self.displacement_uncertainty.unwrap_or(self.defaults.displacement)
    }
}

/// Canonical measurements read from one CSV file.
#[derive(Debug, Clone)]
pub struct Measurements {
    pub dataset: Dataset,
    pub x: Channel,
    pub y: Channel,
    /// `(key, value)` assumptions made while reading.
    pub assumptions: Vec<(String, String)>,
}

pub fn read_measurements(path: &Path, options: &ImportOptions) -> Result<Measurements> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let headers: Vec<ColumnHeader> = reader.headers()?.iter().map(parse_header).collect();

    let column = |kind: QuantityKind| {
        headers
            .iter()
            .position(|h| h.quantity == Some(kind))
            .ok_or_else(|| anyhow!("{}: no {kind} column", path.display()))
    };
    let x_col = column(QuantityKind::Displacement)?;
    let y_col = column(QuantityKind::Force)?;
    let u_col = headers.iter().position(|h| {
        matches!(h.name.to_lowercase().as_str(), "u" | "uncertainty" | "force uncertainty")
    });
    let x = channel(&headers[x_col])?;
    let y = channel(&headers[y_col])?;

    let mut assumptions = Vec::new();
    let source = match (u_col, options.force_uncertainty) {
        (Some(col), _) => UncertaintySource::Column(col),
        (None, Some(spec)) => UncertaintySource::Fixed(spec),
        (None, None) => {
            let spec = UncertaintySpec::Relative(options.defaults.force_percent);
            assumptions.push(("force_uncertainty".to_string(), describe_default(spec, &y.unit)));
            UncertaintySource::Fixed(spec)
        }
    };
    if options.displacement_uncertainty.is_none() {
        let spec = UncertaintySpec::Absolute(options.defaults.displacement);
        assumptions.push((
            "displacement_uncertainty".to_string(),
            describe_default(spec, "mm"),
        ));
    }

    let mut points = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let row = row + 1;
        let record = record.with_context(|| format!("{}: row {row}", path.display()))?;
        let cell = |col: usize| record.get(col).unwrap_or_default();
        let number = |col: usize| -> Result<f64> {
            cell(col).parse().with_context(|| {
                format!("{}: row {row}: '{}' is not a number", path.display(), cell(col))
            })
        };
        let u = match source {
            UncertaintySource::Column(col) => cell(col)
                .parse::<UncertaintySpec>()
                .with_context(|| format!("{}: row {row}", path.display()))?,
            UncertaintySource::Fixed(spec) => spec,
        };
        points.push(RawPoint::new(number(x_col)?, number(y_col)?, u));
    }
    if points.is_empty() {
        bail!("{}: no data rows", path.display());
    }

    let dataset = normalize_points(&points, &x, &y)?;
    debug!(path = %path.display(), points = dataset.len(), x = %x.unit, y = %y.unit, "read measurements");
    Ok(Measurements {
        dataset,
        x,
        y,
        assumptions,
    })
}

#[derive(Debug, Clone, Copy)]
enum UncertaintySource {
    Column(usize),
    Fixed(UncertaintySpec),
}

fn describe_default(spec: UncertaintySpec, unit: &str) -> String {
    match spec {
        UncertaintySpec::Absolute(_) => format!("{spec} {unit} (default)"),
        UncertaintySpec::Relative(_) => format!("{spec} of reading (default)"),
    }
}

fn channel(header: &ColumnHeader) -> Result<Channel> {
    let quantity = header
        .quantity
        .ok_or_else(|| anyhow!("column '{}' has no known quantity", header.name))?;
    let unit = header.unit_or_canonical().unwrap_or(quantity.canonical_unit());
    Ok(Channel::new(quantity, unit))
}

/// A specimen field as written in the TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SpecimenField {
    Quantity {
        value: f64,
        #[serde(default)]
        unit: Option<String>,
        /// Absolute or percentage, e.g. `"0.05"` or `"1%"`.
        #[serde(default)]
        uncertainty: Option<String>,
    },
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpecimenFile {
    pub name: Option<String>,
    pub procedure: TestProcedure,
    pub fields: BTreeMap<String, SpecimenField>,
}

impl SpecimenFile {
    pub fn read(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
    }

    /// Builds sample metadata with every field in canonical units.
    ///
    /// Quantities without an uncertainty fall back to the default budget
    /// and the fallback is recorded as an assumption.
    pub fn into_metadata(
        self,
        fallback_name: &str,
        standard: StandardRef,
        defaults: &DefaultUncertainties,
    ) -> Result<SampleMetadata> {
        let name = self.name.unwrap_or_else(|| fallback_name.to_string());
        let mut metadata = SampleMetadata::new(name, standard).with_procedure(self.procedure);
        for (key, field) in self.fields {
            let value = match field {
                SpecimenField::Number(value) => FieldValue::Number(value),
                SpecimenField::Text(text) => FieldValue::Text(text),
                SpecimenField::Quantity {
                    value,
                    unit,
                    uncertainty,
                } => {
                    let quantity = QuantityKind::from_column_name(&key)
                        .ok_or_else(|| anyhow!("specimen field '{key}' has no known quantity"))?;
                    let unit = unit.unwrap_or_else(|| quantity.canonical_unit().to_string());
                    let spec = match uncertainty {
                        Some(spec) => spec
                            .parse::<UncertaintySpec>()
                            .with_context(|| format!("specimen field '{key}'"))?,
                        None => {
                            let spec = default_uncertainty(quantity, defaults)
                                .ok_or_else(|| anyhow!("specimen field '{key}' needs an uncertainty"))?;
                            metadata = metadata.with_assumption(
                                format!("{key}_uncertainty"),
                                describe_default(spec, quantity.canonical_unit()),
                                IMPORT_ACTOR,
                            );
                            spec
                        }
                    };
                    normalize_field(value, spec, &unit, quantity)?
                }
            };
            metadata = metadata.with_field(key, value);
        }
        Ok(metadata)
    }
}

fn default_uncertainty(
    quantity: QuantityKind,
    defaults: &DefaultUncertainties,
) -> Option<UncertaintySpec> {
    match quantity {
        QuantityKind::Length | QuantityKind::Displacement => {
            Some(UncertaintySpec::Absolute(defaults.dimension))
        }
        QuantityKind::Temperature => Some(UncertaintySpec::Absolute(defaults.temperature)),
        QuantityKind::Force => Some(UncertaintySpec::Relative(defaults.force_percent)),
        _ => None,
    }
}

/// `test.csv` → `test.toml`.
pub fn specimen_path_for(csv: &Path) -> PathBuf {
    csv.with_extension("toml")
}

/// One test ready for ingestion.
#[derive(Debug, Clone)]
pub struct ImportedTest {
    pub source: PathBuf,
    pub measurements: Measurements,
    pub metadata: SampleMetadata,
}

/// Reads `csv` and its specimen file (explicit, or the sidecar when present).
pub fn import_test(
    csv: &Path,
    specimen: Option<&Path>,
    standard: StandardRef,
    options: &ImportOptions,
) -> Result<ImportedTest> {
    let measurements = read_measurements(csv, options)?;
    let sidecar = specimen_path_for(csv);
    let specimen = match specimen {
        Some(path) => SpecimenFile::read(path)?,
        None if sidecar.is_file() => SpecimenFile::read(&sidecar)?,
        None => SpecimenFile::default(),
    };
    let stem = csv
        .file_stem()
        .map_or_else(|| "specimen".to_string(), |s| s.to_string_lossy().into_owned());
    let mut metadata = specimen.into_metadata(&stem, standard, &options.defaults)?;
    for (key, value) in &measurements.assumptions {
        metadata = metadata.with_assumption(key, value, IMPORT_ACTOR);
    }
    info!(source = %csv.display(), name = %metadata.name, points = measurements.dataset.len(), "imported test");
    Ok(ImportedTest {
        source: csv.to_path_buf(),
        measurements,
        metadata,
    })
}

/// CSV files in `dir`, sorted by name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
