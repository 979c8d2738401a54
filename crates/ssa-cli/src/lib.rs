//! Library side of the `ssa` command-line tool.

pub mod analysis;
pub mod config;
pub mod import;
pub mod logging;
