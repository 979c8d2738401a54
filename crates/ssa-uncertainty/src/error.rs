use ssa_model::EngineError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum UncertaintyError {
    /// An input or the result has no usable uncertainty (NaN, infinite or negative).
    #[error("{quantity} has no propagated uncertainty in {operation}")]
    Missing {
        quantity: String,
        operation: &'static str,
    },

    #[error("{quantity} is not finite in {operation}")]
    NonFinite {
        quantity: String,
        operation: &'static str,
    },

    #[error("{operation} expects {expected} input(s), got {actual}")]
    Arity {
        operation: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("division by zero in {operation}")]
    DivisionByZero { operation: &'static str },

    #[error("degenerate fit: {reason}")]
    DegenerateFit { reason: String },

    #[error("invalid correlation matrix: {reason}")]
    Correlation { reason: String },
}

impl UncertaintyError {
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateFit {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UncertaintyError>;

impl From<UncertaintyError> for EngineError {
    fn from(err: UncertaintyError) -> Self {
        match err {
            UncertaintyError::Missing {
                quantity,
                operation,
            } => EngineError::missing_uncertainty(quantity, operation),
            UncertaintyError::NonFinite { operation, .. }
            | UncertaintyError::Arity { operation, .. }
            | UncertaintyError::DivisionByZero { operation } => {
                EngineError::operation(operation, err.to_string())
            }
            UncertaintyError::DegenerateFit { .. } => EngineError::operation("fit", err.to_string()),
            UncertaintyError::Correlation { .. } => {
                EngineError::operation("propagation", err.to_string())
            }
        }
    }
}
