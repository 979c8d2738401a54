//! Append-only audit trail.
//!
//! Entries are never updated or removed. The trail is owned by the store
//! and only ever mutated under the store's write lock, together with the
//! sample the entry describes.

use std::collections::BTreeMap;

use chrono::Utc;
use ssa_model::{AuditEntry, AuditEvent, EntryId, SampleId};

#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
    /// Positions in `entries` per sample, ascending.
    by_sample: BTreeMap<SampleId, Vec<usize>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns its id.
    pub fn record(&mut self, sample: SampleId, event: AuditEvent) -> EntryId {
        let id = self.next_id();
        self.push(AuditEntry {
            id,
            timestamp: Utc::now(),
            sample,
            event,
        });
        id
    }

    /// Appends a complete entry whose id continues the sequence.
    pub(crate) fn push(&mut self, entry: AuditEntry) {
        self.by_sample
            .entry(entry.sample)
            .or_default()
            .push(self.entries.len());
        self.entries.push(entry);
    }

    pub fn next_id(&self) -> EntryId {
        EntryId::new(self.entries.len() as u64 + 1)
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn for_sample(&self, sample: SampleId) -> impl Iterator<Item = &AuditEntry> {
        self.by_sample
            .get(&sample)
            .into_iter()
            .flatten()
            .map(|&pos| &self.entries[pos])
    }

    /// Entries about any of `samples`, in append order.
    pub fn for_samples(&self, samples: &[SampleId]) -> Vec<AuditEntry> {
        let mut positions: Vec<usize> = samples
            .iter()
            .filter_map(|id| self.by_sample.get(id))
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .map(|pos| self.entries[pos].clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
