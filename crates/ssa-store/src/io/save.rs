use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::{CURRENT_SCHEMA_VERSION, HEADER_LEN, MAGIC_BYTES};
use crate::error::{PersistenceError, Result};
use crate::memory::InMemoryStore;
use crate::snapshot::StoreSnapshot;

/// Saves the whole store. The write is atomic: readers see either the old
/// file or the new one.
pub fn save_store(store: &InMemoryStore, path: &Path) -> Result<()> {
    let snapshot = store.snapshot()?;
    save_snapshot(&snapshot, path)
}

pub fn save_snapshot(snapshot: &StoreSnapshot, path: &Path) -> Result<()> {
    let bytes = encode(snapshot)?;
    let temp_path = path.with_extension("ssa.tmp");

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut file = File::create(&temp_path).map_err(|e| PersistenceError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;
    file.write_all(&bytes).map_err(|e| PersistenceError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;
    file.sync_all().map_err(|e| PersistenceError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| PersistenceError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(
        samples = snapshot.samples.len(),
        entries = snapshot.audit.len(),
        "saved store to {}",
        path.display()
    );
    Ok(())
}

fn encode(snapshot: &StoreSnapshot) -> Result<Vec<u8>> {
    let payload =
        serde_json::to_vec(snapshot).map_err(|source| PersistenceError::Serialization { source })?;
    let checksum = Sha256::digest(&payload);

    let mut output = Vec::with_capacity(HEADER_LEN + payload.len());
    output.extend_from_slice(&MAGIC_BYTES);
    output.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
    output.extend_from_slice(&checksum);
    output.extend_from_slice(&payload);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.ssa");

        save_store(&InMemoryStore::new(), &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], &MAGIC_BYTES);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 1);
        assert!(!path.with_extension("ssa.tmp").exists());
    }
}
