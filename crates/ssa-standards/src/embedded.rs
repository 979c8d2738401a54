//! Built-in standards, embedded at compile time.

pub const GENERIC_1: &str = include_str!("../data/generic-1.toml");

pub const ISO_13314_2011: &str = include_str!("../data/iso-13314-2011.toml");

pub const BUILTIN: &[&str] = &[GENERIC_1, ISO_13314_2011];
