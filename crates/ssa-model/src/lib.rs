//! Data model shared by every stage of the sample analysis engine.
//!
//! Values stored in these types are always in canonical internal units
//! (see `ssa-units`). Nothing in this crate performs I/O.

#![deny(unsafe_code)]

pub mod audit;
pub mod dataset;
pub mod error;
pub mod ids;
pub mod operation;
pub mod options;
pub mod sample;
pub mod validation;

pub use audit::{AuditEntry, AuditEvent, AuditKind};
pub use dataset::{DataPoint, Dataset, PointFlag};
pub use error::{EngineError, ErrorClass, LineageBreak, Result};
pub use ids::{EntryId, GroupName, SampleId};
pub use operation::{
    FitModel, FlaggedPoint, OperationKind, OperationParams, OperationRecord, OutlierParams,
    OutlierRule, ResidualScale, RoundingCorrection, StressStrainParams, ZeroReference,
    ZeroingParams,
};
pub use options::{
    AnalysisOptions, BatchOptions, DisplayOptions, OutlierOptions, StandardSelector,
    ZeroingOptions,
};
pub use sample::{
    AssumptionOverride, FieldValue, Sample, SampleGroup, SampleMetadata, StandardRef,
    TestProcedure,
};
pub use validation::{ValidationResult, Violation, ViolationKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_result_counts() {
        let result = ValidationResult::from_violations(
            StandardRef::new("generic", "1"),
            vec![
                Violation {
                    field: "width".to_string(),
                    kind: ViolationKind::Missing,
                    expected_rule: "required".to_string(),
                    actual: None,
                },
                Violation {
                    field: "gauge_length".to_string(),
                    kind: ViolationKind::OutOfTolerance,
                    expected_rule: "10 <= value <= 100".to_string(),
                    actual: Some("4".to_string()),
                },
            ],
        );
        assert!(!result.passed);
        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.count(ViolationKind::Missing), 1);
    }

    #[test]
    fn audit_entry_serializes() {
        let entry = AuditEntry {
            id: EntryId::new(1),
            timestamp: chrono::Utc::now(),
            sample: SampleId::new(7),
            event: AuditEvent::Retired {
                reason: "superseded".to_string(),
            },
        };
        let json = serde_json::to_string(&entry).expect("serialize entry");
        let round: AuditEntry = serde_json::from_str(&json).expect("deserialize entry");
        assert_eq!(round.sample, SampleId::new(7));
        assert_eq!(round.kind(), AuditKind::Retired);
    }
}
