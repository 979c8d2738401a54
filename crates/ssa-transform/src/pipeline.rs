//! Applying operations to stored samples.

use ssa_model::{AnalysisOptions, EngineError, Result, SampleId};
use ssa_store::SampleStore;
use tracing::info;

use crate::operation::CleaningOperation;
use crate::outliers::OutlierFlagging;
use crate::registry::OperationRegistry;
use crate::zeroing::Zeroing;

/// Applies `operation` to the sample `parent` and stores the result.
///
/// Either one derived sample and one audit entry exist afterwards, or the
/// store is unchanged.
pub fn apply_to_store(
    store: &dyn SampleStore,
    parent: SampleId,
    operation: &dyn CleaningOperation,
) -> Result<SampleId> {
    let sample = store.get(parent)?;
    let (dataset, record) = operation.apply(sample.data())?;
    store.derive(parent, dataset, record)
}

/// Replays the recorded history of `id` from its raw ancestor and checks the
/// result against the stored dataset bit for bit.
pub fn verify_reproducible(
    store: &dyn SampleStore,
    registry: &OperationRegistry,
    id: SampleId,
) -> Result<()> {
    let lineage = store.lineage(id)?;
    let Some(&root) = lineage.first() else {
        return Err(EngineError::SampleNotFound { sample: id });
    };
    let raw = store.get(root)?;
    let replayed = registry.replay(raw.data(), &store.history(id)?)?;
    if !replayed.bit_identical(store.get(id)?.data()) {
        return Err(EngineError::ImmutabilityViolation {
            sample: id,
            reason: "replayed history does not reproduce the stored dataset".to_string(),
        });
    }
    Ok(())
}

/// Ordered cleaning steps configured from [`AnalysisOptions`].
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn CleaningOperation>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroing then outlier flagging, each only when enabled.
    pub fn from_options(options: &AnalysisOptions) -> Self {
        let mut pipeline = Self::new();
        if options.zeroing.enabled {
            pipeline = pipeline.then(Zeroing::new(options.zeroing.reference.clone()));
        }
        if options.outliers.enabled {
            pipeline = pipeline.then(OutlierFlagging::new(options.outliers.rule.clone()));
        }
        pipeline
    }

    pub fn then(mut self, step: impl CleaningOperation + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step, each producing one derived sample. Returns the ids of
    /// the derived samples in order. A failing step leaves the samples
    /// derived by earlier steps in place.
    pub fn run(&self, store: &dyn SampleStore, start: SampleId) -> Result<Vec<SampleId>> {
        let mut current = start;
        let mut derived = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            current = apply_to_store(store, current, step.as_ref())?;
            derived.push(current);
        }
        info!(start = %start, steps = derived.len(), "pipeline finished");
        Ok(derived)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|s| s.kind()))
            .finish()
    }
}
