use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ssa_model::{EngineError, Result, SampleId};

/// One mutex per lineage, keyed by the lineage's raw sample.
///
/// Mutations of one lineage are serialized; unrelated lineages proceed in
/// parallel.
#[derive(Debug, Default)]
pub(crate) struct LineageLocks {
    locks: Mutex<HashMap<SampleId, Arc<Mutex<()>>>>,
}

impl LineageLocks {
    pub(crate) fn for_root(&self, root: SampleId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| EngineError::LockPoisoned {
                resource: "lineage lock table",
            })?;
        Ok(Arc::clone(locks.entry(root).or_default()))
    }
}
