use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ssa_model::StandardRef;
use tracing::{debug, info};

use crate::definition::AnalysisStandard;
use crate::embedded::BUILTIN;
use crate::error::{Result, StandardsError};

/// Standards keyed by `name@version`.
///
/// Registration is append-only. Re-registering identical content is a no-op;
/// different content under an existing key is rejected.
#[derive(Debug, Clone, Default)]
pub struct StandardsRegistry {
    standards: BTreeMap<String, Arc<AnalysisStandard>>,
}

impl StandardsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in standards.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for contents in BUILTIN {
            registry.register(AnalysisStandard::from_toml_str(contents)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, standard: AnalysisStandard) -> Result<Arc<AnalysisStandard>> {
        let key = standard.key();
        if let Some(existing) = self.standards.get(&key) {
            if existing.fingerprint() == standard.fingerprint() {
                return Ok(Arc::clone(existing));
            }
            return Err(StandardsError::Immutable {
                key,
                existing: existing.fingerprint().to_string(),
                incoming: standard.fingerprint().to_string(),
            });
        }
        debug!(standard = %key, fingerprint = standard.fingerprint(), "registered standard");
        let standard = Arc::new(standard);
        self.standards.insert(key, Arc::clone(&standard));
        Ok(standard)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<Arc<AnalysisStandard>> {
        self.register(load_file(path)?)
    }

    /// Registers every `*.toml` file in `dir`, in file-name order.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| StandardsError::io(dir, e))? {
            let path = entry.map_err(|e| StandardsError::io(dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();
        for path in &paths {
            self.load_file(path)?;
        }
        info!(dir = %dir.display(), count = paths.len(), "loaded standards");
        Ok(paths.len())
    }

    pub fn get(&self, name: &str, version: &str) -> Option<Arc<AnalysisStandard>> {
        self.standards.get(&format!("{name}@{version}")).cloned()
    }

    /// Resolves a sample's standard reference, checking the fingerprint when
    /// the reference carries one.
    pub fn resolve(&self, reference: &StandardRef) -> Result<Arc<AnalysisStandard>> {
        let key = reference.key();
        let standard = self
            .standards
            .get(&key)
            .cloned()
            .ok_or_else(|| StandardsError::NotFound { key: key.clone() })?;
        if let Some(expected) = &reference.fingerprint
            && expected != standard.fingerprint()
        {
            return Err(StandardsError::FingerprintMismatch {
                key,
                expected: expected.clone(),
                actual: standard.fingerprint().to_string(),
            });
        }
        Ok(standard)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AnalysisStandard>> {
        self.standards.values()
    }

    pub fn len(&self) -> usize {
        self.standards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standards.is_empty()
    }
}

/// Parses and fingerprints a standard file without registering it.
pub fn load_file(path: &Path) -> Result<AnalysisStandard> {
    let contents = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
    match AnalysisStandard::from_toml_str(&contents) {
        Err(StandardsError::Parse { source }) => Err(StandardsError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        other => other,
    }
}
