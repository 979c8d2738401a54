use serde::{Deserialize, Serialize};

use crate::sample::StandardRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required field absent.
    Missing,
    /// Field present but outside its numeric tolerance.
    OutOfTolerance,
    /// Field present but not in the enumerated set.
    NotAllowed,
    /// Field has the wrong type (text where a number is expected, ...).
    WrongType,
    /// Measurement data does not meet a data requirement.
    Data,
}

/// A single standards non-compliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
    pub expected_rule: String,
    pub actual: Option<String>,
}

/// Outcome of checking a sample against a standard. This is data, not an
/// error: the caller decides whether to block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub standard: StandardRef,
    pub passed: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn from_violations(standard: StandardRef, violations: Vec<Violation>) -> Self {
        Self {
            standard,
            passed: violations.is_empty(),
            violations,
        }
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }
}
