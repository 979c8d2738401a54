use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use ssa_model::{
    AuditKind, Dataset, EngineError, GroupName, OperationParams, OperationRecord, SampleGroup,
    SampleId, SampleMetadata, StandardRef, ZeroReference, ZeroingParams,
};
use ssa_store::{InMemoryStore, PersistenceError, SampleStore, load_store, save_store};
use tempfile::tempdir;

fn standard() -> StandardRef {
    StandardRef::new("generic", "1")
}

fn raw(store: &InMemoryStore, name: &str) -> SampleId {
    store
        .create_raw(
            Dataset::from_triples([(0.0, 1.0, 0.01), (1.0, 2.0, 0.01), (2.0, 3.0, 0.01)]),
            SampleMetadata::new(name, standard()),
            standard(),
        )
        .unwrap()
}

/// Shifted copy of the parent's data with a matching operation record.
fn shifted(store: &InMemoryStore, parent: SampleId, offset: f64) -> (Dataset, OperationRecord) {
    let parent = store.get(parent).unwrap();
    let data: Dataset = parent
        .data()
        .points()
        .iter()
        .map(|p| ssa_model::DataPoint::new(p.x, p.y - offset, p.u))
        .collect();
    let record = OperationRecord {
        params: OperationParams::Zeroing(ZeroingParams {
            reference: ZeroReference::Point { index: 0 },
            offset,
            offset_uncertainty: 0.0,
            corrections: Vec::new(),
        }),
        input_digest: parent.data().digest(),
        output_digest: data.digest(),
    };
    (data, record)
}

#[test]
fn derive_from_unknown_parent_leaves_no_trace() {
    let store = InMemoryStore::new();
    let id = raw(&store, "A1");
    let (data, record) = shifted(&store, id, 1.0);
    let before = store.audit_len().unwrap();

    let err = store.derive(SampleId::new(99), data, record).unwrap_err();

    assert!(matches!(err, EngineError::ParentNotFound { parent } if parent == SampleId::new(99)));
    assert_eq!(store.audit_len().unwrap(), before);
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn derivation_extends_history() {
    let store = InMemoryStore::new();
    let root = raw(&store, "A1");
    let (data, record) = shifted(&store, root, 1.0);
    let zeroed = store.derive(root, data, record).unwrap();
    let (data, record) = shifted(&store, zeroed, 0.5);
    let twice = store.derive(zeroed, data, record).unwrap();

    let kinds: Vec<AuditKind> = store
        .history(twice)
        .unwrap()
        .iter()
        .map(|e| e.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![AuditKind::RawCreated, AuditKind::Derived, AuditKind::Derived]
    );
    assert_eq!(store.lineage(twice).unwrap(), vec![root, zeroed, twice]);
    assert_eq!(store.get(twice).unwrap().depth(), 2);
    // the raw measurements are untouched
    assert_eq!(store.get(root).unwrap().data().points()[0].y, 1.0);
}

#[test]
fn stale_operation_record_is_rejected() {
    let store = InMemoryStore::new();
    let a = raw(&store, "A1");
    let b = raw(&store, "B1");
    let (data, record) = shifted(&store, a, 1.0);

    let err = store.derive(b, data, record).unwrap_err();
    assert!(matches!(err, EngineError::Operation { .. }));
}

#[test]
fn raw_ingestion_rejects_unordered_points() {
    let store = InMemoryStore::new();
    let err = store
        .create_raw(
            Dataset::from_triples([(0.0, 1.0, 0.1), (0.0, 2.0, 0.1)]),
            SampleMetadata::new("dup", standard()),
            standard(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
    assert!(store.is_empty().unwrap());
    assert_eq!(store.audit_len().unwrap(), 0);
}

#[test]
fn retire_refuses_referenced_samples() {
    let store = InMemoryStore::new();
    let root = raw(&store, "A1");
    let (data, record) = shifted(&store, root, 1.0);
    let child = store.derive(root, data, record).unwrap();

    let err = store.retire(root, "superseded").unwrap_err();
    assert!(matches!(err, EngineError::StillReferenced { dependents: 1, .. }));

    store.retire(child, "bad zeroing").unwrap();
    store.retire(root, "superseded").unwrap();
    assert!(store.is_retired(root).unwrap());
    assert!(matches!(
        store.intact_lineage(child),
        Err(EngineError::IncompleteLineage { .. })
    ));
    // history stays readable after retirement
    assert_eq!(store.history(child).unwrap().len(), 4);
}

#[test]
fn restore_never_replaces_a_sample() {
    let store = InMemoryStore::new();
    let id = raw(&store, "A1");
    let sample = store.get(id).unwrap();
    let entries = store.history(id).unwrap();

    let err = store.restore((*sample).clone(), entries).unwrap_err();
    assert!(matches!(err, EngineError::ImmutabilityViolation { .. }));
}

#[test]
fn restore_moves_a_sample_between_stores() {
    let source = InMemoryStore::new();
    let id = raw(&source, "A1");
    source.set_assumption(id, "poisson_ratio", "0.3", "analyst").unwrap();

    let target = InMemoryStore::new();
    let sample = source.get(id).unwrap();
    target
        .restore((*sample).clone(), source.history(id).unwrap())
        .unwrap();
    assert_eq!(target.history(id).unwrap().len(), 2);
}

#[test]
fn deleting_a_group_keeps_its_samples() {
    let store = InMemoryStore::new();
    let a = raw(&store, "A1");
    let b = raw(&store, "A2");
    let mut group = SampleGroup::new(GroupName::new("batch-7").unwrap(), "replicates");
    group.members.extend([a, b]);
    store.save_group(group).unwrap();

    let removed = store
        .delete_group(&GroupName::new("batch-7").unwrap())
        .unwrap();
    assert_eq!(removed.members.len(), 2);
    assert!(store.groups().unwrap().is_empty());
    assert_eq!(store.ids().unwrap(), vec![a, b]);
}

#[test]
fn groups_reject_unknown_members() {
    let store = InMemoryStore::new();
    let mut group = SampleGroup::new(GroupName::new("ghosts").unwrap(), "");
    group.members.insert(SampleId::new(5));
    assert!(matches!(
        store.save_group(group),
        Err(EngineError::SampleNotFound { .. })
    ));
}

#[test]
fn concurrent_lineages_do_not_interfere() {
    let store = Arc::new(InMemoryStore::new());
    let roots: Vec<SampleId> = (0..4).map(|i| raw(&store, &format!("S{i}"))).collect();

    let handles: Vec<_> = roots
        .iter()
        .map(|&root| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut current = root;
                for _ in 0..10 {
                    let (data, record) = shifted(&store, current, 0.25);
                    current = store.derive(current, data, record).unwrap();
                }
                current
            })
        })
        .collect();

    for (root, handle) in roots.iter().zip(handles) {
        let tip = handle.join().unwrap();
        let lineage = store.lineage(tip).unwrap();
        assert_eq!(lineage.len(), 11);
        assert_eq!(lineage[0], *root);
        assert_eq!(store.history(tip).unwrap().len(), 11);
    }
    assert_eq!(store.audit_len().unwrap(), 4 + 40);
}

#[test]
fn store_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lab.ssa");
    let store = InMemoryStore::new();
    let root = raw(&store, "A1");
    let (data, record) = shifted(&store, root, 1.0);
    let child = store.derive(root, data, record).unwrap();
    store.retire(child, "redo").unwrap();

    save_store(&store, &path).unwrap();
    let loaded = load_store(&path).unwrap();

    assert_eq!(loaded.history(child).unwrap(), store.history(child).unwrap());
    assert!(loaded.is_retired(child).unwrap());
    assert!(
        loaded
            .get(child)
            .unwrap()
            .data()
            .bit_identical(store.get(child).unwrap().data())
    );
}

#[test]
fn tampered_store_file_is_detected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lab.ssa");
    let store = InMemoryStore::new();
    raw(&store, "A1");
    save_store(&store, &path).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 2;
    bytes[last] ^= 0x01;
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(
        load_store(&path),
        Err(PersistenceError::ChecksumMismatch { .. })
    ));
}

proptest! {
    #[test]
    fn history_order_is_append_order(offsets in prop::collection::vec(0.0f64..10.0, 1..8)) {
        let store = InMemoryStore::new();
        let mut current = raw(&store, "P");
        for offset in offsets {
            let (data, record) = shifted(&store, current, offset);
            current = store.derive(current, data, record).unwrap();
        }
        let ids: Vec<u64> = store.history(current).unwrap().iter().map(|e| e.id.get()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        prop_assert_eq!(ids, sorted);
    }
}
