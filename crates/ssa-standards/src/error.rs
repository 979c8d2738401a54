use std::path::PathBuf;

use ssa_model::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse standard {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse standard: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid standard {standard}: {reason}")]
    Invalid { standard: String, reason: String },

    #[error("standard {key} is already registered with fingerprint {existing}; a changed definition needs a new version")]
    Immutable {
        key: String,
        existing: String,
        incoming: String,
    },

    #[error("standard {key} is not registered")]
    NotFound { key: String },

    #[error("standard {key} fingerprint mismatch (expected {expected}, registered {actual})")]
    FingerprintMismatch {
        key: String,
        expected: String,
        actual: String,
    },
}

impl StandardsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(standard: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            standard: standard.into(),
            reason: reason.into(),
        }
    }
}

impl From<StandardsError> for EngineError {
    fn from(err: StandardsError) -> Self {
        EngineError::configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StandardsError>;
