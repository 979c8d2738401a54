use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::{CURRENT_SCHEMA_VERSION, HEADER_LEN, MAGIC_BYTES};
use crate::error::{PersistenceError, Result};
use crate::memory::InMemoryStore;
use crate::snapshot::StoreSnapshot;

/// Loads a store file and rebuilds the in-memory store from it.
pub fn load_store(path: &Path) -> Result<InMemoryStore> {
    let snapshot = load_snapshot(path)?;
    InMemoryStore::from_snapshot(snapshot).map_err(|source| PersistenceError::Inconsistent {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads and verifies a store file without rebuilding the store.
pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;
    decode(&bytes, path)
}

fn decode(bytes: &[u8], path: &Path) -> Result<StoreSnapshot> {
    if bytes.len() < HEADER_LEN {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "file too small".to_string(),
        });
    }
    if bytes[0..4] != MAGIC_BYTES {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "invalid magic bytes".to_string(),
        });
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version > CURRENT_SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: version,
            max_supported: CURRENT_SCHEMA_VERSION,
            path: path.to_path_buf(),
        });
    }

    let (checksum, payload) = bytes[8..].split_at(32);
    let actual = Sha256::digest(payload);
    if actual.as_slice() != checksum {
        return Err(PersistenceError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: hex::encode(checksum),
            actual: hex::encode(actual),
        });
    }

    let snapshot: StoreSnapshot =
        serde_json::from_slice(payload).map_err(|source| PersistenceError::Deserialization {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(samples = snapshot.samples.len(), "loaded store from {}", path.display());
    Ok(snapshot)
}
