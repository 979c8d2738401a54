//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use ssa_model::StandardSelector;
use ssa_units::UncertaintySpec;

#[derive(Parser)]
#[command(
    name = "ssa",
    version,
    about = "Stress-strain sample analysis with uncertainty and full audit trail",
    long_about = "Import force/displacement tests, validate them against a versioned \
                  analysis standard, clean and convert them, and emit a report payload \
                  where every value carries its uncertainty and lineage."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyse one test file and write its report payload.
    Analyze(AnalyzeArgs),

    /// Analyse every CSV file in a directory as one sample group.
    Batch(BatchArgs),

    /// List the built-in analysis standards.
    Standards(StandardsArgs),

    /// Load a standard definition file and print its fingerprint.
    CheckStandard(CheckStandardArgs),
}

/// Options shared by `analyze` and `batch`.
#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Analysis options file (TOML). Flags below override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Standard as `name@version`, e.g. `iso-13314@2011`.
    #[arg(long, value_name = "NAME@VERSION", value_parser = parse_standard)]
    pub standard: Option<StandardSelector>,

    /// Additional directory of standard definitions.
    #[arg(long = "standards-dir", value_name = "DIR")]
    pub standards_dir: Option<PathBuf>,

    /// Force uncertainty when the file has none, absolute (N) or relative ("0.5%").
    #[arg(long = "force-uncertainty", value_name = "U", value_parser = parse_uncertainty)]
    pub force_uncertainty: Option<UncertaintySpec>,

    /// Displacement uncertainty in mm.
    #[arg(long = "displacement-uncertainty", value_name = "MM")]
    pub displacement_uncertainty: Option<f64>,

    #[arg(long = "no-zeroing")]
    pub no_zeroing: bool,

    #[arg(long = "no-outliers")]
    pub no_outliers: bool,

    /// Store snapshot to resume from and save to.
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Test data file (CSV with displacement and force columns).
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Specimen file (default: the CSV path with a .toml extension).
    #[arg(long, value_name = "FILE")]
    pub specimen: Option<PathBuf>,

    /// Report output path (default: stdout).
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fail when the sample does not comply with the standard.
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Directory of test CSV files, each with an optional specimen TOML.
    #[arg(value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Output directory for the report (default: <DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Group name (default: the directory name).
    #[arg(long)]
    pub group: Option<String>,

    /// Also group the results by this specimen field (e.g. specimen_shape).
    #[arg(long = "group-by", value_name = "FIELD")]
    pub group_by: Option<String>,

    /// Stop at the first failing test.
    #[arg(long = "stop-on-error")]
    pub stop_on_error: bool,

    /// Cancel the remaining tests after this many failures.
    #[arg(long = "max-failures", value_name = "N")]
    pub max_failures: Option<usize>,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args)]
pub struct StandardsArgs {
    /// Additional directory of standard definitions.
    #[arg(long = "standards-dir", value_name = "DIR")]
    pub standards_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckStandardArgs {
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_standard(value: &str) -> Result<StandardSelector, String> {
    StandardSelector::parse(value).ok_or_else(|| format!("expected NAME@VERSION, got '{value}'"))
}

fn parse_uncertainty(value: &str) -> Result<UncertaintySpec, String> {
    value.parse().map_err(|err: ssa_units::UnitError| err.to_string())
}
