use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use ssa_cli::analysis::{Analyzer, save_batch_groups};
use ssa_cli::config::load_options;
use ssa_cli::import::{ImportOptions, import_test, list_csv_files};
use ssa_model::{AnalysisOptions, GroupName, SampleId};
use ssa_report::{ReportOptions, ReportPayload, Selection, assemble};
use ssa_standards::StandardsRegistry;
use ssa_store::{InMemoryStore, load_store, save_store};
use ssa_transform::{BatchJob, CancellationToken};
use tracing::{info, info_span, warn};

use crate::cli::{AnalysisArgs, AnalyzeArgs, BatchArgs, CheckStandardArgs, StandardsArgs};
use crate::summary::{print_batch, print_sample, print_standard, print_standards};

/// Runs `analyze`. Returns whether the sample complies with its standard.
pub fn run_analyze(args: &AnalyzeArgs) -> Result<bool> {
    let options = resolve_options(&args.analysis)?;
    let registry = load_registry(args.analysis.standards_dir.as_deref())?;
    let store = open_store(args.analysis.store.as_deref())?;
    let import = import_options(&args.analysis);
    let analyzer = Analyzer::new(&store, &registry, &options, import.displacement_uncertainty())?;

    let test = import_test(
        &args.input,
        args.specimen.as_deref(),
        analyzer.standard_ref(),
        &import,
    )?;
    let ingested = analyzer.ingest(test)?;
    if args.strict && !ingested.validation.passed {
        eprintln!("{}", ssa_validate::render_summary(&ingested.validation));
        bail!("{} does not comply with {}", args.input.display(), analyzer.standard().key());
    }
    let result = analyzer
        .process(ingested.raw)
        .with_context(|| format!("analyse {}", args.input.display()))?;

    let payload = assemble(
        &store,
        &registry,
        &[Selection::Sample(result)],
        &ReportOptions::from(&options),
    )?;
    write_report(&payload, args.output.as_deref())?;
    if args.output.is_some()
        && let Some(report) = payload.sample(result)
    {
        print_sample(report);
    }
    save(&store, args.analysis.store.as_deref())?;
    Ok(ingested.validation.passed)
}

/// Runs `batch`. Returns whether every test was analysed and complies.
pub fn run_batch(args: &BatchArgs) -> Result<bool> {
    let span = info_span!("batch", dir = %args.input_dir.display());
    let _guard = span.enter();

    let mut options = resolve_options(&args.analysis)?;
    if args.stop_on_error {
        options.batch.stop_on_error = true;
    }
    let registry = load_registry(args.analysis.standards_dir.as_deref())?;
    let store = open_store(args.analysis.store.as_deref())?;
    let import = import_options(&args.analysis);
    let analyzer = Analyzer::new(&store, &registry, &options, import.displacement_uncertainty())?;

    let files = list_csv_files(&args.input_dir)?;
    if files.is_empty() {
        bail!("no CSV files in {}", args.input_dir.display());
    }

    let mut failures: Vec<(String, String)> = Vec::new();
    let mut sources: Vec<(SampleId, String)> = Vec::new();
    let mut compliant = true;
    for file in &files {
        let name = file.display().to_string();
        let ingested = import_test(file, None, analyzer.standard_ref(), &import)
            .and_then(|test| analyzer.ingest(test).map_err(anyhow::Error::from));
        match ingested {
            Ok(ingested) => {
                compliant &= ingested.validation.passed;
                sources.push((ingested.raw, name));
            }
            Err(err) => {
                warn!(file = %name, error = %err, "import failed");
                failures.push((name, format!("{err:#}")));
            }
        }
    }

    let raws: Vec<SampleId> = sources.iter().map(|(id, _)| *id).collect();
    let source_of = |id: SampleId| {
        sources
            .iter()
            .find(|(raw, _)| *raw == id)
            .map_or_else(|| id.to_string(), |(_, name)| name.clone())
    };
    let token = CancellationToken::new();
    let job = BatchJob::new(&store, options.batch).with_token(token.clone());
    let bar = ProgressBar::new(raws.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    let max_failures = args.max_failures;
    let import_failures = failures.len();
    let report = job.run(
        &raws,
        |raw| analyzer.process(raw),
        |progress| {
            bar.set_position(progress.completed as u64 + progress.failed as u64);
            bar.set_message(source_of(progress.current));
            if max_failures.is_some_and(|max| import_failures + progress.failed >= max) {
                token.cancel();
            }
        },
    )?;
    bar.finish_and_clear();

    for (raw, err) in &report.failures {
        failures.push((source_of(*raw), err.to_string()));
    }
    if !report.skipped.is_empty() {
        warn!(skipped = report.skipped.len(), cancelled = report.cancelled, "batch stopped early");
        for raw in &report.skipped {
            failures.push((source_of(*raw), "skipped".to_string()));
        }
    }

    let group_name = match &args.group {
        Some(name) => name.clone(),
        None => args
            .input_dir
            .file_name()
            .map_or_else(|| "batch".to_string(), |n| n.to_string_lossy().into_owned()),
    };
    let members: Vec<SampleId> = report.derived.iter().map(|(_, result)| *result).collect();
    let groups = save_batch_groups(
        &store,
        GroupName::new(group_name)?,
        &members,
        args.group_by.as_deref(),
    )?;
    let selections: Vec<Selection> = groups.into_iter().map(Selection::Group).collect();

    let payload = assemble(&store, &registry, &selections, &ReportOptions::from(&options))?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.input_dir.join("output"));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;
    let report_path = output_dir.join("report.json");
    write_report(&payload, Some(&report_path))?;
    info!(path = %report_path.display(), samples = payload.samples.len(), "batch report written");

    print_batch(&payload, &failures);
    println!("Report: {}", report_path.display());
    save(&store, args.analysis.store.as_deref())?;
    Ok(failures.is_empty() && compliant)
}

pub fn run_standards(args: &StandardsArgs) -> Result<()> {
    let registry = load_registry(args.standards_dir.as_deref())?;
    print_standards(registry.iter().map(Arc::as_ref));
    Ok(())
}

pub fn run_check_standard(args: &CheckStandardArgs) -> Result<()> {
    let standard = ssa_standards::load_file(&args.path)
        .with_context(|| format!("load standard {}", args.path.display()))?;
    print_standard(&standard);
    Ok(())
}

fn resolve_options(args: &AnalysisArgs) -> Result<AnalysisOptions> {
    let mut options = load_options(args.config.as_deref())?;
    if let Some(standard) = &args.standard {
        options.standard = standard.clone();
    }
    if args.no_zeroing {
        options.zeroing.enabled = false;
    }
    if args.no_outliers {
        options.outliers.enabled = false;
    }
    Ok(options)
}

fn import_options(args: &AnalysisArgs) -> ImportOptions {
    ImportOptions {
        force_uncertainty: args.force_uncertainty,
        displacement_uncertainty: args.displacement_uncertainty,
        ..ImportOptions::default()
    }
}

fn load_registry(dir: Option<&Path>) -> Result<StandardsRegistry> {
    let mut registry = StandardsRegistry::with_builtins().context("load built-in standards")?;
    if let Some(dir) = dir {
        let loaded = registry
            .load_dir(dir)
            .with_context(|| format!("load standards from {}", dir.display()))?;
        info!(dir = %dir.display(), loaded, "loaded standards");
    }
    Ok(registry)
}

fn open_store(path: Option<&Path>) -> Result<InMemoryStore> {
    match path {
        Some(path) if path.exists() => {
            load_store(path).map_err(|err| anyhow::anyhow!(err.user_message()))
        }
        _ => Ok(InMemoryStore::new()),
    }
}

fn save(store: &InMemoryStore, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        save_store(store, path).map_err(|err| anyhow::anyhow!(err.user_message()))?;
        info!(path = %path.display(), "store saved");
    }
    Ok(())
}

fn write_report(payload: &ReportPayload, output: Option<&Path>) -> Result<()> {
    let json = payload.to_json_pretty()?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}
