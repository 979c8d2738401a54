use ssa_model::{Dataset, OperationKind, OperationParams, OperationRecord};

use crate::error::Result;

/// A cleaning step: a pure function from a dataset to a new dataset plus the
/// record needed to replay it.
pub trait CleaningOperation: Send + Sync {
    fn kind(&self) -> OperationKind;

    /// Never mutates `input`. On error nothing has been produced.
    fn apply(&self, input: &Dataset) -> Result<(Dataset, OperationRecord)>;
}

/// Builds the record for an applied step, digesting both datasets.
pub(crate) fn record(params: OperationParams, input: &Dataset, output: &Dataset) -> OperationRecord {
    OperationRecord {
        params,
        input_digest: input.digest(),
        output_digest: output.digest(),
    }
}
