//! Persistence error types.

use std::path::PathBuf;

use ssa_model::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid store file format: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("store file version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        path: PathBuf,
    },

    #[error("store file checksum mismatch (expected {expected}, found {actual})")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to serialize store contents")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize store contents")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file decoded but does not describe a consistent store.
    #[error("store file {path} is inconsistent")]
    Inconsistent {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PersistenceError {
    /// Message suitable for showing to an analyst.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {operation} the file at {}", path.display()),
            Self::InvalidFormat { path, reason } => format!(
                "The file at {} is not a sample store: {reason}",
                path.display()
            ),
            Self::UnsupportedVersion {
                found,
                max_supported,
                ..
            } => format!(
                "This store was written by a newer version (file version {found}, \
                 supported up to {max_supported}). Please update the application."
            ),
            Self::ChecksumMismatch { path, .. } => format!(
                "The store at {} has been modified or corrupted since it was saved.",
                path.display()
            ),
            Self::Serialization { .. } => {
                "An error occurred while encoding the store contents.".to_string()
            }
            Self::Deserialization { path, .. } => format!(
                "The store at {} could not be decoded. The file may be corrupted.",
                path.display()
            ),
            Self::Inconsistent { path, source } => {
                format!("The store at {} is inconsistent: {source}", path.display())
            }
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not save the store to {}. Please check disk space and permissions.",
                target_path.display()
            ),
            Self::Engine(source) => source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
