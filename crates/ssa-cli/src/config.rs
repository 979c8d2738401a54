//! `--config` file handling.
//!
//! The file is an [`AnalysisOptions`] document in TOML. Missing tables keep
//! their defaults; command-line flags are applied on top afterwards.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ssa_model::AnalysisOptions;

pub fn load_options(path: Option<&Path>) -> Result<AnalysisOptions> {
    let Some(path) = path else {
        return Ok(AnalysisOptions::default());
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    parse_options(&contents).with_context(|| format!("parse config {}", path.display()))
}

pub fn parse_options(contents: &str) -> Result<AnalysisOptions> {
    Ok(toml::from_str(contents)?)
}
