use std::sync::Arc;

use ssa_model::{
    AuditEntry, Dataset, EntryId, GroupName, OperationRecord, Result, Sample, SampleGroup,
    SampleId, SampleMetadata, StandardRef, ValidationResult,
};

/// Contract every sample store satisfies, in memory or on disk.
///
/// Every successful mutation appends exactly one audit entry, and the entry
/// becomes visible together with the state change it describes.
pub trait SampleStore: Send + Sync {
    /// Stores a raw sample after checking the ingestion contract.
    fn create_raw(
        &self,
        measurements: Dataset,
        metadata: SampleMetadata,
        standard: StandardRef,
    ) -> Result<SampleId>;

    fn get(&self, id: SampleId) -> Result<Arc<Sample>>;

    /// Stores a derived sample. Fails with `ParentNotFound` for an unknown
    /// parent, leaving no audit entry behind.
    fn derive(&self, parent: SampleId, dataset: Dataset, operation: OperationRecord)
    -> Result<SampleId>;

    /// Audit entries of the whole lineage from the raw sample to `id`.
    fn history(&self, id: SampleId) -> Result<Vec<AuditEntry>>;

    /// Sample ids from the raw ancestor to `id`.
    fn lineage(&self, id: SampleId) -> Result<Vec<SampleId>>;

    /// Like [`SampleStore::lineage`] but also fails when an ancestor is retired.
    fn intact_lineage(&self, id: SampleId) -> Result<Vec<SampleId>>;

    fn is_retired(&self, id: SampleId) -> Result<bool>;

    /// Soft delete. Refused while live derived samples reference `id`.
    fn retire(&self, id: SampleId, reason: &str) -> Result<EntryId>;

    /// Records an analyst override of a default assumption.
    fn set_assumption(&self, id: SampleId, key: &str, value: &str, set_by: &str)
    -> Result<EntryId>;

    fn record_validation(&self, id: SampleId, result: ValidationResult) -> Result<EntryId>;

    /// Re-inserts a sample exported from another store, with its own entries.
    fn restore(&self, sample: Sample, entries: Vec<AuditEntry>) -> Result<SampleId>;

    fn ids(&self) -> Result<Vec<SampleId>>;

    fn save_group(&self, group: SampleGroup) -> Result<()>;

    fn group(&self, name: &GroupName) -> Result<SampleGroup>;

    /// Removes a group. Its member samples are untouched.
    fn delete_group(&self, name: &GroupName) -> Result<SampleGroup>;

    fn groups(&self) -> Result<Vec<SampleGroup>>;
}
