//! Engine error taxonomy.
//!
//! Standards non-compliance is never an error: it is reported as a
//! [`crate::ValidationResult`]. Everything here is either an input error,
//! an invariant violation, or a recoverable operation failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::SampleId;

/// Broad class of an [`EngineError`], used by callers to route failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed or missing input data. Surfaced immediately, never defaulted.
    Input,
    /// Programming-contract failure. Fatal, never recovered.
    Invariant,
    /// Local failure; the caller may retry with different parameters.
    Operation,
}

/// Why a lineage chain could not be followed back to its raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageBreak {
    Missing,
    Retired,
}

impl std::fmt::Display for LineageBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Retired => f.write_str("retired"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid measurements: {reason}")]
    Validation { reason: String },

    #[error("unit '{declared}' cannot be converted to {canonical} for quantity {quantity}")]
    UnitMismatch {
        declared: String,
        quantity: String,
        canonical: String,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("sample {sample} is immutable: {reason}")]
    ImmutabilityViolation { sample: SampleId, reason: String },

    #[error("derived value '{quantity}' from {operation} has no propagated uncertainty")]
    MissingUncertainty { quantity: String, operation: String },

    #[error("lineage of sample {sample} is broken: ancestor {ancestor} is {cause}")]
    IncompleteLineage {
        sample: SampleId,
        ancestor: SampleId,
        cause: LineageBreak,
    },

    #[error("operation {operation} failed: {reason}")]
    Operation { operation: String, reason: String },

    #[error("parent sample {parent} not found")]
    ParentNotFound { parent: SampleId },

    #[error("sample {sample} not found")]
    SampleNotFound { sample: SampleId },

    #[error("sample {sample} is retired")]
    SampleRetired { sample: SampleId },

    #[error("sample {sample} is still referenced by {dependents} live derived sample(s)")]
    StillReferenced { sample: SampleId, dependents: usize },

    #[error("cancelled after {completed} completed item(s)")]
    Cancelled { completed: usize },

    #[error("{resource} lock poisoned")]
    LockPoisoned { resource: &'static str },
}

impl EngineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn operation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_uncertainty(quantity: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::MissingUncertainty {
            quantity: quantity.into(),
            operation: operation.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. }
            | Self::UnitMismatch { .. }
            | Self::Configuration { .. }
            | Self::SampleNotFound { .. } => ErrorClass::Input,
            Self::ImmutabilityViolation { .. }
            | Self::MissingUncertainty { .. }
            | Self::IncompleteLineage { .. }
            | Self::LockPoisoned { .. } => ErrorClass::Invariant,
            Self::Operation { .. }
            | Self::ParentNotFound { .. }
            | Self::SampleRetired { .. }
            | Self::StillReferenced { .. }
            | Self::Cancelled { .. } => ErrorClass::Operation,
        }
    }

    /// True when the caller may retry with different parameters.
    pub fn is_recoverable(&self) -> bool {
        self.class() == ErrorClass::Operation
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_errors_are_not_recoverable() {
        let err = EngineError::ImmutabilityViolation {
            sample: SampleId::new(3),
            reason: "sample already exists".to_string(),
        };
        assert_eq!(err.class(), ErrorClass::Invariant);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn parent_not_found_is_recoverable() {
        let err = EngineError::ParentNotFound {
            parent: SampleId::new(42),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "parent sample S-000042 not found");
    }
}
