//! Analysis standards.
//!
//! Standards are TOML files with `[standard]`, `[[fields]]`, `[data]`,
//! `[formulas]` and `[propagation]` tables. Each loaded standard carries a
//! SHA-256 fingerprint of its canonical form so reports can prove which
//! exact definition was applied.

#![deny(unsafe_code)]

pub mod definition;
pub mod embedded;
pub mod error;
pub mod registry;

pub use crate::definition::{
    AnalysisStandard, DataRequirements, FieldKind, FieldRule, Formulas, PropagationPolicy,
    StandardHeader, StrainWindow, Tolerance, field,
};
pub use crate::error::StandardsError;
pub use crate::registry::{StandardsRegistry, load_file};
