//! In-memory sample store.
//!
//! Samples live in an arena indexed by `id - 1`; lineage edges are plain ids.
//! The arena, groups and audit trail share one `RwLock` held only for short
//! critical sections; dataset digests are computed before it is taken.
//! Multi-step mutations of a lineage additionally hold that lineage's mutex.

use std::collections::BTreeMap;
use std::sync::{Arc, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ssa_model::{
    AssumptionOverride, AuditEntry, AuditEvent, AuditKind, Dataset, EngineError, EntryId,
    GroupName, LineageBreak, OperationRecord, Result, Sample, SampleGroup, SampleId,
    SampleMetadata, StandardRef, ValidationResult,
};
use tracing::{debug, info, warn};

use crate::audit::AuditTrail;
use crate::locks::LineageLocks;
use crate::snapshot::{StoreSnapshot, StoredSample};
use crate::store::SampleStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retirement {
    pub reason: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
struct SampleRecord {
    sample: Arc<Sample>,
    digest: String,
    retired: Option<Retirement>,
    children: Vec<SampleId>,
}

impl SampleRecord {
    /// `digest` must be the digest of `sample`'s dataset.
    fn new(sample: Sample, digest: String) -> Self {
        Self {
            digest,
            sample: Arc::new(sample),
            retired: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    records: Vec<SampleRecord>,
    groups: BTreeMap<GroupName, SampleGroup>,
    audit: AuditTrail,
}

impl State {
    fn record(&self, id: SampleId) -> Result<&SampleRecord> {
        if id.get() == 0 {
            return Err(EngineError::SampleNotFound { sample: id });
        }
        self.records
            .get(id.index())
            .ok_or(EngineError::SampleNotFound { sample: id })
    }

    fn record_mut(&mut self, id: SampleId) -> Result<&mut SampleRecord> {
        if id.get() == 0 {
            return Err(EngineError::SampleNotFound { sample: id });
        }
        self.records
            .get_mut(id.index())
            .ok_or(EngineError::SampleNotFound { sample: id })
    }

    fn next_id(&self) -> SampleId {
        SampleId::new(self.records.len() as u64 + 1)
    }

    fn live(&self, id: SampleId) -> Result<&SampleRecord> {
        let record = self.record(id)?;
        if record.retired.is_some() {
            return Err(EngineError::SampleRetired { sample: id });
        }
        Ok(record)
    }

    /// Ids from the raw ancestor to `id`.
    fn lineage(&self, id: SampleId, allow_retired: bool) -> Result<Vec<SampleId>> {
        let mut chain = vec![id];
        let mut current = self.record(id)?;
        while let Some(parent) = current.sample.derived_from() {
            let Ok(record) = self.record(parent) else {
                return Err(EngineError::IncompleteLineage {
                    sample: id,
                    ancestor: parent,
                    cause: LineageBreak::Missing,
                });
            };
            if !allow_retired && record.retired.is_some() {
                return Err(EngineError::IncompleteLineage {
                    sample: id,
                    ancestor: parent,
                    cause: LineageBreak::Retired,
                });
            }
            chain.push(parent);
            current = record;
        }
        chain.reverse();
        Ok(chain)
    }

    fn insert(&mut self, sample: Sample, digest: String) {
        if let Some(parent) = sample.derived_from()
            && let Ok(record) = self.record_mut(parent)
        {
            record.children.push(sample.id());
        }
        self.records.push(SampleRecord::new(sample, digest));
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    locks: LineageLocks,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| EngineError::LockPoisoned {
            resource: "sample store",
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| EngineError::LockPoisoned {
            resource: "sample store",
        })
    }

    /// Runs `f` holding the mutex of the lineage `id` belongs to.
    fn with_lineage<T>(&self, id: SampleId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let root = self.read()?.record(id)?.sample.lineage_root();
        let lock = self.locks.for_root(root)?;
        let _guard: MutexGuard<'_, ()> = lock.lock().map_err(|_| EngineError::LockPoisoned {
            resource: "lineage",
        })?;
        f()
    }

    /// Appends a non-structural event for a live sample.
    fn annotate(&self, id: SampleId, event: AuditEvent) -> Result<EntryId> {
        self.with_lineage(id, || {
            let mut state = self.write()?;
            state.live(id)?;
            Ok(state.audit.record(id, event))
        })
    }

    /// Records an externally produced event.
    ///
    /// Only validation outcomes and assumption overrides may be recorded this
    /// way; creation, derivation and retirement entries are written by the
    /// store alongside the state change they describe.
    pub fn record(&self, id: SampleId, event: AuditEvent) -> Result<EntryId> {
        match event.kind() {
            AuditKind::Validated | AuditKind::AssumptionOverridden => self.annotate(id, event),
            kind => Err(EngineError::operation(
                "record",
                format!("{} entries are written by the store itself", kind.as_str()),
            )),
        }
    }

    /// Number of live samples derived directly from `id`.
    pub fn live_children(&self, id: SampleId) -> Result<usize> {
        let state = self.read()?;
        let record = state.record(id)?;
        Ok(record
            .children
            .iter()
            .filter(|child| {
                state
                    .record(**child)
                    .is_ok_and(|child| child.retired.is_none())
            })
            .count())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn audit_len(&self) -> Result<usize> {
        Ok(self.read()?.audit.len())
    }

    /// Full copy of the store contents.
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        let state = self.read()?;
        Ok(StoreSnapshot {
            samples: state
                .records
                .iter()
                .map(|record| StoredSample {
                    sample: Sample::clone(&record.sample),
                    retired: record.retired.clone(),
                })
                .collect(),
            groups: state.groups.values().cloned().collect(),
            audit: state.audit.entries().to_vec(),
        })
    }

    /// Rebuilds a store from a snapshot after checking its consistency.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        snapshot.check()?;
        let mut state = State::default();
        for stored in snapshot.samples {
            let digest = stored.sample.data().digest();
            state.insert(stored.sample, digest);
            if let Some(record) = state.records.last_mut() {
                record.retired = stored.retired;
            }
        }
        for entry in snapshot.audit {
            state.audit.push(entry);
        }
        for group in snapshot.groups {
            state.groups.insert(group.name.clone(), group);
        }
        debug!(
            samples = state.records.len(),
            entries = state.audit.len(),
            "store rebuilt from snapshot"
        );
        Ok(Self {
            state: RwLock::new(state),
            locks: LineageLocks::default(),
        })
    }
}

impl SampleStore for InMemoryStore {
    fn create_raw(
        &self,
        measurements: Dataset,
        mut metadata: SampleMetadata,
        standard: StandardRef,
    ) -> Result<SampleId> {
        measurements.validate_raw()?;
        metadata.standard = standard.clone();
        let points = measurements.len();
        let digest = measurements.digest();

        let mut state = self.write()?;
        let id = state.next_id();
        state.insert(Sample::raw(id, metadata, measurements), digest.clone());
        state.audit.record(
            id,
            AuditEvent::RawCreated {
                standard,
                points,
                digest,
            },
        );
        drop(state);

        info!(sample = %id, points, "created raw sample");
        Ok(id)
    }

    fn get(&self, id: SampleId) -> Result<Arc<Sample>> {
        Ok(Arc::clone(&self.read()?.record(id)?.sample))
    }

    fn derive(
        &self,
        parent: SampleId,
        dataset: Dataset,
        operation: OperationRecord,
    ) -> Result<SampleId> {
        let kind = operation.kind();
        // Map before anything else so an unknown parent leaves no trace.
        let not_found = |err: EngineError| match err {
            EngineError::SampleNotFound { .. } => EngineError::ParentNotFound { parent },
            other => other,
        };
        self.read()?.record(parent).map_err(not_found)?;

        dataset.ensure_uncertainties(kind.as_str())?;
        let digest = dataset.digest();
        if operation.output_digest != digest {
            return Err(EngineError::operation(
                kind.as_str(),
                "recorded output digest does not match the derived dataset",
            ));
        }

        let id = self
            .with_lineage(parent, || {
                let mut state = self.write()?;
                let record = state.live(parent)?;
                if operation.input_digest != record.digest {
                    return Err(EngineError::operation(
                        kind.as_str(),
                        format!("operation was computed from a different dataset than {parent}"),
                    ));
                }
                let parent_sample = Arc::clone(&record.sample);
                let id = state.next_id();
                let sample = Sample::derived(id, &parent_sample, dataset, operation.clone());
                state.insert(sample, digest);
                state
                    .audit
                    .record(id, AuditEvent::Derived { parent, operation });
                Ok(id)
            })
            .map_err(not_found)?;

        info!(sample = %id, parent = %parent, operation = %kind, "derived sample");
        Ok(id)
    }

    fn history(&self, id: SampleId) -> Result<Vec<AuditEntry>> {
        let state = self.read()?;
        let chain = state.lineage(id, true)?;
        Ok(state.audit.for_samples(&chain))
    }

    fn lineage(&self, id: SampleId) -> Result<Vec<SampleId>> {
        self.read()?.lineage(id, true)
    }

    fn intact_lineage(&self, id: SampleId) -> Result<Vec<SampleId>> {
        self.read()?.lineage(id, false)
    }

    fn is_retired(&self, id: SampleId) -> Result<bool> {
        Ok(self.read()?.record(id)?.retired.is_some())
    }

    fn retire(&self, id: SampleId, reason: &str) -> Result<EntryId> {
        self.with_lineage(id, || {
            let mut state = self.write()?;
            let record = state.live(id)?;
            let dependents = record
                .children
                .iter()
                .filter(|child| {
                    state
                        .record(**child)
                        .is_ok_and(|child| child.retired.is_none())
                })
                .count();
            if dependents > 0 {
                warn!(sample = %id, dependents, "refusing to retire referenced sample");
                return Err(EngineError::StillReferenced {
                    sample: id,
                    dependents,
                });
            }
            state.record_mut(id)?.retired = Some(Retirement {
                reason: reason.to_string(),
                at: Utc::now(),
            });
            let entry = state.audit.record(
                id,
                AuditEvent::Retired {
                    reason: reason.to_string(),
                },
            );
            info!(sample = %id, reason, "retired sample");
            Ok(entry)
        })
    }

    fn set_assumption(
        &self,
        id: SampleId,
        key: &str,
        value: &str,
        set_by: &str,
    ) -> Result<EntryId> {
        if key.trim().is_empty() {
            return Err(EngineError::validation("assumption key must not be empty"));
        }
        debug!(sample = %id, key, value, set_by, "assumption override");
        self.annotate(
            id,
            AuditEvent::AssumptionOverridden {
                key: key.to_string(),
                value: AssumptionOverride {
                    value: value.to_string(),
                    set_by: set_by.to_string(),
                    set_at: Utc::now(),
                },
            },
        )
    }

    fn record_validation(&self, id: SampleId, result: ValidationResult) -> Result<EntryId> {
        self.annotate(id, AuditEvent::Validated { result })
    }

    fn restore(&self, sample: Sample, entries: Vec<AuditEntry>) -> Result<SampleId> {
        let id = sample.id();
        let digest = sample.data().digest();
        let root = sample.lineage_root();
        let lock = self.locks.for_root(root)?;
        let _guard = lock.lock().map_err(|_| EngineError::LockPoisoned {
            resource: "lineage",
        })?;

        let mut state = self.write()?;
        if state.record(id).is_ok() {
            return Err(EngineError::ImmutabilityViolation {
                sample: id,
                reason: "a sample with this id already exists and cannot be replaced".to_string(),
            });
        }
        if id != state.next_id() {
            return Err(EngineError::validation(format!(
                "cannot restore {id}: the next free id is {}",
                state.next_id()
            )));
        }
        crate::snapshot::check_sample(&sample, |parent| {
            state.record(parent).ok().map(|r| r.sample.as_ref())
        })?;
        crate::snapshot::check_entries_for(&sample, &entries)?;

        let retired = entries.iter().find_map(|entry| match &entry.event {
            AuditEvent::Retired { reason } => Some(Retirement {
                reason: reason.clone(),
                at: entry.timestamp,
            }),
            _ => None,
        });
        state.insert(sample, digest);
        if let Some(record) = state.records.last_mut() {
            record.retired = retired;
        }
        for entry in entries {
            let renumbered = AuditEntry {
                id: state.audit.next_id(),
                ..entry
            };
            state.audit.push(renumbered);
        }
        info!(sample = %id, "restored sample");
        Ok(id)
    }

    fn ids(&self) -> Result<Vec<SampleId>> {
        Ok(self.read()?.records.iter().map(|r| r.sample.id()).collect())
    }

    fn save_group(&self, group: SampleGroup) -> Result<()> {
        let mut state = self.write()?;
        for member in &group.members {
            state.record(*member)?;
        }
        debug!(group = %group.name, members = group.members.len(), "saved group");
        state.groups.insert(group.name.clone(), group);
        Ok(())
    }

    fn group(&self, name: &GroupName) -> Result<SampleGroup> {
        self.read()?
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::validation(format!("group '{name}' not found")))
    }

    fn delete_group(&self, name: &GroupName) -> Result<SampleGroup> {
        self.write()?
            .groups
            .remove(name)
            .ok_or_else(|| EngineError::validation(format!("group '{name}' not found")))
    }

    fn groups(&self) -> Result<Vec<SampleGroup>> {
        Ok(self.read()?.groups.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    fn standard() -> StandardRef {
        StandardRef::new("generic", "1")
    }

    fn long_curve(points: u32) -> Dataset {
        Dataset::from_triples((0..points).map(|i| (f64::from(i), f64::from(i) * 0.5, 0.01)))
    }

    #[test]
    fn raw_record_keeps_the_digest_of_its_data() {
        let store = InMemoryStore::new();
        let data = long_curve(100);
        let expected = data.digest();
        let id = store
            .create_raw(data, SampleMetadata::new("A1", standard()), standard())
            .unwrap();

        let state = store.read().unwrap();
        assert_eq!(state.record(id).unwrap().digest, expected);
        let entries = state.audit.for_samples(&[id]);
        assert!(matches!(
            &entries[0].event,
            AuditEvent::RawCreated { digest, .. } if *digest == expected
        ));
    }

    #[test]
    fn reads_proceed_while_other_lineages_import() {
        let store = Arc::new(InMemoryStore::new());
        let first = store
            .create_raw(long_curve(10), SampleMetadata::new("A0", standard()), standard())
            .unwrap();
        let barrier = Arc::new(Barrier::new(5));

        let importers: Vec<_> = (1..=4)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .create_raw(
                            long_curve(20_000),
                            SampleMetadata::new(format!("A{i}"), standard()),
                            standard(),
                        )
                        .unwrap()
                })
            })
            .collect();
        barrier.wait();
        for _ in 0..100 {
            assert_eq!(store.get(first).unwrap().name(), "A0");
        }

        let mut ids: Vec<SampleId> = importers.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(store.audit_len().unwrap(), 5);
        for id in ids {
            let state = store.read().unwrap();
            let record = state.record(id).unwrap();
            assert_eq!(record.digest, record.sample.data().digest());
        }
    }
}
