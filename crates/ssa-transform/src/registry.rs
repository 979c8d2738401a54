//! Operations keyed by kind, and replay of recorded histories.

use std::collections::BTreeMap;

use ssa_model::{AuditEntry, Dataset, OperationKind, OperationParams, OperationRecord};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::operation::CleaningOperation;
use crate::outliers::OutlierFlagging;
use crate::stress_strain::StressStrain;
use crate::zeroing::{Unzeroing, Zeroing};

/// Rebuilds an operation from its recorded parameters.
pub type OperationBuilder = fn(&OperationParams) -> Result<Box<dyn CleaningOperation>>;

#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    builders: BTreeMap<OperationKind, OperationBuilder>,
}

fn wrong_params(expected: OperationKind, params: &OperationParams) -> TransformError {
    TransformError::invalid(
        expected,
        format!("builder received {} parameters", params.kind()),
    )
}

fn build_zeroing(params: &OperationParams) -> Result<Box<dyn CleaningOperation>> {
    match params {
        OperationParams::Zeroing(p) => Ok(Box::new(Zeroing::new(p.reference.clone()))),
        other => Err(wrong_params(OperationKind::Zeroing, other)),
    }
}

fn build_unzeroing(params: &OperationParams) -> Result<Box<dyn CleaningOperation>> {
    match params {
        OperationParams::Unzeroing(p) => Ok(Box::new(Unzeroing::new(p.clone()))),
        other => Err(wrong_params(OperationKind::Unzeroing, other)),
    }
}

fn build_outliers(params: &OperationParams) -> Result<Box<dyn CleaningOperation>> {
    match params {
        OperationParams::OutlierFlagging(p) => Ok(Box::new(OutlierFlagging::new(p.rule.clone()))),
        other => Err(wrong_params(OperationKind::OutlierFlagging, other)),
    }
}

fn build_stress_strain(params: &OperationParams) -> Result<Box<dyn CleaningOperation>> {
    match params {
        OperationParams::StressStrain(p) => Ok(Box::new(StressStrain::new(p.clone()))),
        other => Err(wrong_params(OperationKind::StressStrain, other)),
    }
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every operation this crate implements.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .builders
            .insert(OperationKind::Zeroing, build_zeroing);
        registry
            .builders
            .insert(OperationKind::Unzeroing, build_unzeroing);
        registry
            .builders
            .insert(OperationKind::OutlierFlagging, build_outliers);
        registry
            .builders
            .insert(OperationKind::StressStrain, build_stress_strain);
        registry
    }

    /// Adds a builder. A kind can be registered only once.
    pub fn register(&mut self, kind: OperationKind, builder: OperationBuilder) -> Result<()> {
        if self.builders.contains_key(&kind) {
            return Err(TransformError::invalid(kind, "operation is already registered"));
        }
        self.builders.insert(kind, builder);
        Ok(())
    }

    pub fn build(&self, params: &OperationParams) -> Result<Box<dyn CleaningOperation>> {
        let kind = params.kind();
        let builder = self
            .builders
            .get(&kind)
            .ok_or(TransformError::Unregistered { kind })?;
        builder(params)
    }

    /// Re-applies one recorded step and checks it reproduces the record.
    pub fn replay_step(&self, input: &Dataset, recorded: &OperationRecord) -> Result<Dataset> {
        let kind = recorded.kind();
        if input.digest() != recorded.input_digest {
            return Err(TransformError::ReplayMismatch {
                operation: kind,
                reason: "input differs from the dataset the step was recorded on".to_string(),
            });
        }
        let (output, record) = self.build(&recorded.params)?.apply(input)?;
        if record.params != recorded.params {
            return Err(TransformError::ReplayMismatch {
                operation: kind,
                reason: "recomputed parameters differ from the recorded ones".to_string(),
            });
        }
        if record.output_digest != recorded.output_digest {
            return Err(TransformError::ReplayMismatch {
                operation: kind,
                reason: "output digest differs".to_string(),
            });
        }
        Ok(output)
    }

    /// Replays every derivation in `history` starting from the raw dataset.
    pub fn replay(&self, raw: &Dataset, history: &[AuditEntry]) -> Result<Dataset> {
        let mut current = raw.clone();
        for entry in history {
            if let Some(recorded) = entry.operation() {
                debug!(entry = %entry.id, operation = %recorded.kind(), "replaying");
                current = self.replay_step(&current, recorded)?;
            }
        }
        Ok(current)
    }
}
