//! Tracing subscriber setup.
//!
//! Engine crates only emit events. The binary decides where they go and in
//! which format:
//!
//! - `error`: failed commands
//! - `warn`: failed validations, skipped conversions, failed batch items
//! - `info`: one line per created or derived sample and per report
//! - `debug`: operation parameters and unit conversions
//!
//! `RUST_LOG` overrides the configured level unless a level was given on
//! the command line.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Crates whose events are shown at the configured level. Everything else
/// stays at `warn`.
const ENGINE_TARGETS: &[&str] = &[
    "ssa",
    "ssa_cli",
    "ssa_model",
    "ssa_report",
    "ssa_standards",
    "ssa_store",
    "ssa_transform",
    "ssa_uncertainty",
    "ssa_units",
    "ssa_validate",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event, for log shippers.
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level_filter: LevelFilter,
    /// Let `RUST_LOG` replace `level_filter` when set.
    pub use_env_filter: bool,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_timestamps: bool,
    /// Append to this file instead of writing to stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            format: LogFormat::default(),
            with_ansi: true,
            with_target: false,
            with_timestamps: false,
            log_file: None,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn with_level(mut self, level_filter: LevelFilter) -> Self {
        self.level_filter = level_filter;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }
}

/// Installs the global subscriber. Call once, before any command runs.
///
/// # Errors
///
/// Fails when the log file cannot be opened or a subscriber is already set.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            init_logging_with_writer(config, SharedFileWriter::new(file))
        }
        None => init_logging_with_writer(config, io::stderr),
    }
}

/// Installs the global subscriber writing to `writer`.
pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W) -> io::Result<()>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(config.with_target)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact if config.with_timestamps => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .without_time()
            .with_writer(writer)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Pretty if config.with_timestamps => fmt::layer()
            .with_writer(writer)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .without_time()
            .with_writer(writer)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(build_filter(config))
        .try_init()
        .map_err(io::Error::other)
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    if config.use_env_filter
        && let Ok(filter) = EnvFilter::try_from_default_env()
    {
        return filter;
    }
    let level = config.level_filter.to_string().to_lowercase();
    let directives: Vec<String> = std::iter::once("warn".to_string())
        .chain(ENGINE_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect();
    EnvFilter::new(directives.join(","))
}

/// Log file handle shared by every event writer.
#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl SharedFileWriter {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<File>>,
}

impl SharedFileGuard {
    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        f(&mut file)
    }
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(Write::flush)
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_covers_every_engine_crate() {
        let config = LogConfig {
            use_env_filter: false,
            ..LogConfig::default()
        }
        .with_level(LevelFilter::DEBUG);
        let filter = build_filter(&config).to_string();
        assert!(filter.contains("ssa_transform=debug"));
        assert!(filter.contains("ssa_store=debug"));
        assert!(filter.starts_with("warn"));
    }
}
