//! Error types for unit handling.

use ssa_model::EngineError;
use thiserror::Error;

use crate::quantity::QuantityKind;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum UnitError {
    /// The unit symbol is not in the registry at all.
    #[error("unknown unit '{unit}' for {quantity}")]
    UnknownUnit { unit: String, quantity: QuantityKind },

    /// The unit exists but measures a different dimension.
    #[error("unit '{unit}' is not convertible to {canonical} ({quantity})")]
    Incompatible {
        unit: String,
        quantity: QuantityKind,
        canonical: &'static str,
    },

    #[error("value {value} for {quantity} is not finite")]
    NonFinite { value: f64, quantity: QuantityKind },

    #[error("invalid uncertainty '{spec}': {reason}")]
    InvalidUncertainty { spec: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, UnitError>;

impl From<UnitError> for EngineError {
    fn from(err: UnitError) -> Self {
        match err {
            UnitError::UnknownUnit { unit, quantity }
            | UnitError::Incompatible { unit, quantity, .. } => EngineError::UnitMismatch {
                declared: unit,
                quantity: quantity.to_string(),
                canonical: quantity.canonical_unit().to_string(),
            },
            other => EngineError::validation(other.to_string()),
        }
    }
}
