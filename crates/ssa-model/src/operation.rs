//! Serializable records of cleaning operations.
//!
//! A record carries everything needed to replay the operation on the parent
//! dataset and reproduce the derived dataset bit for bit.

use serde::{Deserialize, Serialize};

/// Baseline used by a zeroing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ZeroReference {
    /// Dependent value at one point (by index).
    Point { index: usize },
    /// Mean dependent value of all active points with `x_min <= x <= x_max`.
    Window { x_min: f64, x_max: f64 },
}

impl Default for ZeroReference {
    fn default() -> Self {
        Self::Point { index: 0 }
    }
}

/// Exact original value for a point where `(y - offset) + offset != y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundingCorrection {
    pub index: usize,
    pub original: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroingParams {
    pub reference: ZeroReference,
    /// Amount subtracted from every dependent value.
    pub offset: f64,
    /// Standard uncertainty of the offset itself.
    pub offset_uncertainty: f64,
    /// Points the inverse cannot restore by addition alone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<RoundingCorrection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FitModel {
    Linear,
    Polynomial { degree: usize },
}

impl FitModel {
    pub fn parameter_count(self) -> usize {
        match self {
            Self::Linear => 2,
            Self::Polynomial { degree } => degree + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualScale {
    /// Residual standard error, `sqrt(SSE / (n - p))`.
    #[default]
    StandardError,
    /// `1.4826 * median(|r - median(r)|)`.
    MedianAbsoluteDeviation,
}

/// Statistical rule that decides which points are outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum OutlierRule {
    /// Flag points whose standardized residual against `model` exceeds `threshold`.
    ResidualThreshold {
        model: FitModel,
        threshold: f64,
        #[serde(default)]
        scale: ResidualScale,
    },
    /// Explicit selection made by an analyst.
    Manual { indices: Vec<usize>, reason: String },
}

impl OutlierRule {
    /// Short label stored on every flagged point.
    pub fn label(&self) -> String {
        match self {
            Self::ResidualThreshold {
                model,
                threshold,
                scale,
            } => {
                let model = match model {
                    FitModel::Linear => "linear".to_string(),
                    FitModel::Polynomial { degree } => format!("poly{degree}"),
                };
                let scale = match scale {
                    ResidualScale::StandardError => "se",
                    ResidualScale::MedianAbsoluteDeviation => "mad",
                };
                format!("residual[{model},{scale}]>{threshold}")
            }
            Self::Manual { reason, .. } => format!("manual: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedPoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub u: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierParams {
    pub rule: OutlierRule,
    pub flagged: Vec<FlaggedPoint>,
}

/// Force/displacement to stress/strain conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressStrainParams {
    /// Cross-sectional area, mm².
    pub area: f64,
    pub area_uncertainty: f64,
    /// Initial gauge length, mm.
    pub gauge_length: f64,
    pub gauge_length_uncertainty: f64,
    /// Uncertainty of the displacement channel, mm.
    pub displacement_uncertainty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "parameters", rename_all = "snake_case")]
pub enum OperationParams {
    Zeroing(ZeroingParams),
    /// Inverse of a recorded zeroing.
    Unzeroing(ZeroingParams),
    OutlierFlagging(OutlierParams),
    StressStrain(StressStrainParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Zeroing,
    Unzeroing,
    OutlierFlagging,
    StressStrain,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zeroing => "zeroing",
            Self::Unzeroing => "unzeroing",
            Self::OutlierFlagging => "outlier_flagging",
            Self::StressStrain => "stress_strain",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OperationParams {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Zeroing(_) => OperationKind::Zeroing,
            Self::Unzeroing(_) => OperationKind::Unzeroing,
            Self::OutlierFlagging(_) => OperationKind::OutlierFlagging,
            Self::StressStrain(_) => OperationKind::StressStrain,
        }
    }
}

/// One applied cleaning step: parameters plus digests of input and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub params: OperationParams,
    pub input_digest: String,
    pub output_digest: String,
}

impl OperationRecord {
    pub fn kind(&self) -> OperationKind {
        self.params.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_labels_are_descriptive() {
        let rule = OutlierRule::ResidualThreshold {
            model: FitModel::Polynomial { degree: 2 },
            threshold: 3.0,
            scale: ResidualScale::MedianAbsoluteDeviation,
        };
        assert_eq!(rule.label(), "residual[poly2,mad]>3");
        let manual = OutlierRule::Manual {
            indices: vec![1],
            reason: "slipped grip".to_string(),
        };
        assert_eq!(manual.label(), "manual: slipped grip");
    }

    #[test]
    fn params_report_kind() {
        let params = OperationParams::Zeroing(ZeroingParams {
            reference: ZeroReference::default(),
            offset: 0.0,
            offset_uncertainty: 0.01,
            corrections: Vec::new(),
        });
        assert_eq!(params.kind(), OperationKind::Zeroing);
        assert_eq!(params.kind().to_string(), "zeroing");
    }
}
