//! Unit normalization layer.
//!
//! Every externally supplied quantity is converted to one canonical unit per
//! [`QuantityKind`] at ingestion. Conversion back to display units happens
//! only at the presentation boundary through [`DisplayConversion`].

#![deny(unsafe_code)]

mod error;
mod header;
mod import;
mod quantity;
mod registry;
mod uncertainty;

pub use error::{Result, UnitError};
pub use header::{ColumnHeader, parse_header};
pub use import::{Channel, RawPoint, normalize_field, normalize_points};
pub use quantity::{Dimension, QuantityKind};
pub use registry::{
    DisplayConversion, UnitDef, lookup, normalize, normalize_uncertainty, resolve, to_display,
};
pub use uncertainty::UncertaintySpec;
