//! Cancellable work over many samples.
//!
//! Each item is one atomic derivation. Cancelling stops before the next item
//! starts; items already completed stay in the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ssa_model::{BatchOptions, EngineError, ErrorClass, Result, SampleGroup, SampleId};
use ssa_store::SampleStore;
use tracing::{info, warn};

use crate::operation::CleaningOperation;
use crate::pipeline::apply_to_store;

/// Shared flag checked between batch items.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    /// Item that just finished.
    pub current: SampleId,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// `(input, derived)` pairs in processing order.
    pub derived: Vec<(SampleId, SampleId)>,
    pub failures: Vec<(SampleId, EngineError)>,
    pub cancelled: bool,
    /// Items never started because of cancellation or `stop_on_error`.
    pub skipped: Vec<SampleId>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.derived.len()
    }

    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.skipped.is_empty()
    }

    /// The derived pairs, or the first problem: cancellation first, then the
    /// first failure.
    pub fn into_result(self) -> Result<Vec<(SampleId, SampleId)>> {
        if self.cancelled {
            return Err(EngineError::Cancelled {
                completed: self.derived.len(),
            });
        }
        match self.failures.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(self.derived),
        }
    }
}

pub struct BatchJob<'a> {
    store: &'a dyn SampleStore,
    options: BatchOptions,
    token: CancellationToken,
}

impl<'a> BatchJob<'a> {
    pub fn new(store: &'a dyn SampleStore, options: BatchOptions) -> Self {
        Self {
            store,
            options,
            token: CancellationToken::new(),
        }
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs `work` on every input.
    ///
    /// Recoverable failures are collected in the report. Invariant
    /// violations abort the batch and are returned as errors.
    pub fn run(
        &self,
        inputs: &[SampleId],
        mut work: impl FnMut(SampleId) -> Result<SampleId>,
        mut progress: impl FnMut(&BatchProgress),
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for (pos, &input) in inputs.iter().enumerate() {
            if self.token.is_cancelled() {
                report.cancelled = true;
                report.skipped.extend_from_slice(&inputs[pos..]);
                info!(completed = report.completed(), "batch cancelled");
                break;
            }
            match work(input) {
                Ok(derived) => report.derived.push((input, derived)),
                Err(err) if err.class() == ErrorClass::Invariant => return Err(err),
                Err(err) => {
                    warn!(sample = %input, error = %err, "batch item failed");
                    report.failures.push((input, err));
                    if self.options.stop_on_error {
                        report.skipped.extend_from_slice(&inputs[pos + 1..]);
                        break;
                    }
                }
            }
            progress(&BatchProgress {
                completed: report.derived.len(),
                failed: report.failures.len(),
                total: inputs.len(),
                current: input,
            });
        }
        Ok(report)
    }

    /// Applies one operation to every member of `group`, e.g. a bulk outlier
    /// recomputation.
    pub fn apply_to_group(
        &self,
        group: &SampleGroup,
        operation: &dyn CleaningOperation,
        progress: impl FnMut(&BatchProgress),
    ) -> Result<BatchReport> {
        let members: Vec<SampleId> = group.members.iter().copied().collect();
        info!(group = %group.name, members = members.len(), operation = %operation.kind(), "batch started");
        self.run(
            &members,
            |id| apply_to_store(self.store, id, operation),
            progress,
        )
    }
}
