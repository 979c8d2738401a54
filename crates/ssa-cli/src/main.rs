//! `ssa`: stress-strain sample analysis from the command line.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use ssa_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_analyze, run_batch, run_check_standard, run_standards};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let outcome = match &cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Batch(args) => run_batch(args),
        Command::Standards(args) => run_standards(args).map(|()| true),
        Command::CheckStandard(args) => run_check_standard(args).map(|()| true),
    };
    let exit_code = match outcome {
        Ok(true) => 0,
        // Finished, but with non-compliant samples or failed batch items.
        Ok(false) => 2,
        Err(error) => {
            tracing::error!("{error:#}");
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Flags win over `RUST_LOG`; `RUST_LOG` wins over the default level.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let level_filter = match cli.log_level {
        Some(LogLevelArg::Error) => LevelFilter::ERROR,
        Some(LogLevelArg::Warn) => LevelFilter::WARN,
        Some(LogLevelArg::Info) => LevelFilter::INFO,
        Some(LogLevelArg::Debug) => LevelFilter::DEBUG,
        Some(LogLevelArg::Trace) => LevelFilter::TRACE,
        None => cli.verbosity.tracing_level_filter(),
    };
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    LogConfig {
        use_env_filter: !(cli.verbosity.is_present() || cli.log_level.is_some()),
        with_ansi: match cli.color.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
        },
        ..LogConfig::default()
    }
    .with_level(level_filter)
    .with_format(format)
    .with_log_file(cli.log_file.clone())
}
