//! Audit trail entries.
//!
//! Every transformation, assumption override and validation outcome tied
//! to a sample is one [`AuditEntry`]. Entries are owned by the recorder;
//! samples never hold them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EntryId, SampleId};
use crate::operation::OperationRecord;
use crate::sample::{AssumptionOverride, StandardRef};
use crate::validation::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    RawCreated,
    Derived,
    Validated,
    AssumptionOverridden,
    Retired,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RawCreated => "raw_created",
            Self::Derived => "derived",
            Self::Validated => "validated",
            Self::AssumptionOverridden => "assumption_overridden",
            Self::Retired => "retired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    RawCreated {
        standard: StandardRef,
        points: usize,
        digest: String,
    },
    Derived {
        parent: SampleId,
        operation: OperationRecord,
    },
    Validated {
        result: ValidationResult,
    },
    AssumptionOverridden {
        key: String,
        #[serde(flatten)]
        value: AssumptionOverride,
    },
    Retired {
        reason: String,
    },
}

impl AuditEvent {
    pub fn kind(&self) -> AuditKind {
        match self {
            Self::RawCreated { .. } => AuditKind::RawCreated,
            Self::Derived { .. } => AuditKind::Derived,
            Self::Validated { .. } => AuditKind::Validated,
            Self::AssumptionOverridden { .. } => AuditKind::AssumptionOverridden,
            Self::Retired { .. } => AuditKind::Retired,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,
    /// Sample the entry is about.
    pub sample: SampleId,
    pub event: AuditEvent,
}

impl AuditEntry {
    pub fn kind(&self) -> AuditKind {
        self.event.kind()
    }

    pub fn operation(&self) -> Option<&OperationRecord> {
        match &self.event {
            AuditEvent::Derived { operation, .. } => Some(operation),
            _ => None,
        }
    }
}
