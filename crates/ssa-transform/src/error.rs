use ssa_model::{EngineError, OperationKind};
use ssa_uncertainty::UncertaintyError;
use thiserror::Error;

/// Failure of a single cleaning operation. Nothing is derived or recorded.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{operation}: reference window [{x_min}, {x_max}] lies outside the data range [{first}, {last}]")]
    WindowOutOfRange {
        operation: OperationKind,
        x_min: f64,
        x_max: f64,
        first: f64,
        last: f64,
    },

    #[error("{operation}: point index {index} is out of bounds for {len} point(s)")]
    IndexOutOfBounds {
        operation: OperationKind,
        index: usize,
        len: usize,
    },

    #[error("{operation}: {reason}")]
    InvalidParameters {
        operation: OperationKind,
        reason: String,
    },

    #[error("{operation}: specimen field '{field}' is missing")]
    MissingField {
        operation: OperationKind,
        field: &'static str,
    },

    #[error("{operation}: {source}")]
    Uncertainty {
        operation: OperationKind,
        #[source]
        source: UncertaintyError,
    },

    #[error("replay of {operation} diverged: {reason}")]
    ReplayMismatch {
        operation: OperationKind,
        reason: String,
    },

    #[error("no operation registered for {kind}")]
    Unregistered { kind: OperationKind },
}

impl TransformError {
    pub(crate) fn invalid(operation: OperationKind, reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            operation,
            reason: reason.into(),
        }
    }

    pub(crate) fn uncertainty(operation: OperationKind) -> impl FnOnce(UncertaintyError) -> Self {
        move |source| Self::Uncertainty { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;

impl From<TransformError> for EngineError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Uncertainty {
                source: UncertaintyError::Missing { quantity, .. },
                operation,
            } => EngineError::missing_uncertainty(quantity, operation.as_str()),
            TransformError::Unregistered { .. } => EngineError::configuration(err.to_string()),
            TransformError::MissingField { .. } => EngineError::validation(err.to_string()),
            TransformError::WindowOutOfRange { operation, .. }
            | TransformError::IndexOutOfBounds { operation, .. }
            | TransformError::InvalidParameters { operation, .. }
            | TransformError::ReplayMismatch { operation, .. }
            | TransformError::Uncertainty { operation, .. } => {
                EngineError::operation(operation.as_str(), err.to_string())
            }
        }
    }
}
