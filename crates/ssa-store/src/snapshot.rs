//! Serializable copy of a store and its consistency checks.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ssa_model::{AuditEntry, AuditEvent, EngineError, Result, Sample, SampleGroup, SampleId};

use crate::memory::Retirement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSample {
    pub sample: Sample,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retired: Option<Retirement>,
}

/// Everything a store holds, in id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub samples: Vec<StoredSample>,
    #[serde(default)]
    pub groups: Vec<SampleGroup>,
    pub audit: Vec<AuditEntry>,
}

impl StoreSnapshot {
    /// Checks that the snapshot describes a store the engine could have built.
    pub fn check(&self) -> Result<()> {
        for (pos, stored) in self.samples.iter().enumerate() {
            let id = stored.sample.id();
            if id.get() != pos as u64 + 1 {
                return Err(corrupt(format!("sample at position {pos} has id {id}")));
            }
            check_sample(&stored.sample, |parent| {
                (parent < id)
                    .then(|| self.samples.get(parent.index()))
                    .flatten()
                    .map(|s| &s.sample)
                    .filter(|s| s.id() == parent)
            })?;
        }

        let mut per_sample: BTreeMap<SampleId, Vec<AuditEntry>> = BTreeMap::new();
        for (pos, entry) in self.audit.iter().enumerate() {
            if entry.id.get() != pos as u64 + 1 {
                return Err(corrupt(format!("audit entry at position {pos} has id {}", entry.id)));
            }
            per_sample.entry(entry.sample).or_default().push(entry.clone());
        }
        if let Some(unknown) = per_sample
            .keys()
            .find(|id| id.get() == 0 || id.index() >= self.samples.len())
        {
            return Err(corrupt(format!("audit entries reference unknown sample {unknown}")));
        }
        for stored in &self.samples {
            let entries = per_sample
                .get(&stored.sample.id())
                .map(Vec::as_slice)
                .unwrap_or_default();
            check_entries_for(&stored.sample, entries)?;
            let retired_entry = entries
                .iter()
                .any(|e| matches!(e.event, AuditEvent::Retired { .. }));
            if retired_entry != stored.retired.is_some() {
                return Err(corrupt(format!(
                    "retirement of {} disagrees with its audit trail",
                    stored.sample.id()
                )));
            }
        }

        let mut names = BTreeSet::new();
        for group in &self.groups {
            if !names.insert(&group.name) {
                return Err(corrupt(format!("group '{}' appears twice", group.name)));
            }
            if let Some(member) = group
                .members
                .iter()
                .find(|id| id.get() == 0 || id.index() >= self.samples.len())
            {
                return Err(corrupt(format!(
                    "group '{}' references unknown sample {member}",
                    group.name
                )));
            }
        }
        Ok(())
    }
}

fn corrupt(reason: String) -> EngineError {
    EngineError::validation(format!("inconsistent store snapshot: {reason}"))
}

/// Structural checks for one sample against its parent.
pub(crate) fn check_sample<'a>(
    sample: &Sample,
    parent_of: impl Fn(SampleId) -> Option<&'a Sample>,
) -> Result<()> {
    let id = sample.id();
    let Some(parent_id) = sample.derived_from() else {
        if sample.lineage_root() != id || sample.depth() != 0 || sample.operation().is_some() {
            return Err(corrupt(format!("raw sample {id} carries lineage data")));
        }
        return sample.data().validate_raw();
    };

    let parent = parent_of(parent_id).ok_or(EngineError::ParentNotFound { parent: parent_id })?;
    if sample.lineage_root() != parent.lineage_root() || sample.depth() != parent.depth() + 1 {
        return Err(corrupt(format!("{id} does not continue the lineage of {parent_id}")));
    }
    let Some(operation) = sample.operation() else {
        return Err(corrupt(format!("derived sample {id} has no operation record")));
    };
    if operation.input_digest != parent.data().digest()
        || operation.output_digest != sample.data().digest()
    {
        return Err(corrupt(format!("digests of {id} do not match its data")));
    }
    Ok(())
}

/// Checks the entries describing `sample`: the creation entry comes first
/// and matches the sample, a retirement comes last.
pub(crate) fn check_entries_for(sample: &Sample, entries: &[AuditEntry]) -> Result<()> {
    let id = sample.id();
    if let Some(stray) = entries.iter().find(|e| e.sample != id) {
        return Err(corrupt(format!("entry {} is about {}, not {id}", stray.id, stray.sample)));
    }
    let Some((first, rest)) = entries.split_first() else {
        return Err(corrupt(format!("{id} has no creation entry")));
    };
    let creation_matches = match (&first.event, sample.derived_from()) {
        (AuditEvent::RawCreated { digest, .. }, None) => *digest == sample.data().digest(),
        (AuditEvent::Derived { parent, operation }, Some(expected)) => {
            *parent == expected && Some(operation) == sample.operation()
        }
        _ => false,
    };
    if !creation_matches {
        return Err(corrupt(format!("creation entry of {id} does not match the sample")));
    }
    for (pos, entry) in rest.iter().enumerate() {
        match entry.event {
            AuditEvent::RawCreated { .. } | AuditEvent::Derived { .. } => {
                return Err(corrupt(format!("{id} is created twice")));
            }
            AuditEvent::Retired { .. } if pos + 1 != rest.len() => {
                return Err(corrupt(format!("{id} has entries after its retirement")));
            }
            _ => {}
        }
    }
    Ok(())
}
