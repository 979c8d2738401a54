//! Zeroing and its exact inverse.
//!
//! The offset is subtracted from every dependent value; per-point
//! uncertainties are left as they are. The offset and its own uncertainty
//! are kept in the record. Where floating-point subtraction cannot be
//! undone by addition the original value is recorded, so unzeroing always
//! restores the parent bit for bit.

use ssa_model::{
    DataPoint, Dataset, OperationKind, OperationParams, OperationRecord, RoundingCorrection,
    ZeroReference, ZeroingParams,
};
use ssa_uncertainty::{Operation, propagate, stats};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::operation::{CleaningOperation, record};

#[derive(Debug, Clone, PartialEq)]
pub struct Zeroing {
    pub reference: ZeroReference,
}

impl Zeroing {
    pub fn new(reference: ZeroReference) -> Self {
        Self { reference }
    }

    /// Offset and its standard uncertainty for `input`.
    pub fn offset(&self, input: &Dataset) -> Result<(f64, f64)> {
        const OP: OperationKind = OperationKind::Zeroing;
        let points = input.points();
        match self.reference {
            ZeroReference::Point { index } => {
                let point = points.get(index).ok_or(TransformError::IndexOutOfBounds {
                    operation: OP,
                    index,
                    len: points.len(),
                })?;
                if point.is_excluded() {
                    return Err(TransformError::invalid(
                        OP,
                        format!("reference point {index} is flagged as an outlier"),
                    ));
                }
                Ok((point.y, point.u))
            }
            ZeroReference::Window { x_min, x_max } => {
                if !(x_min.is_finite() && x_max.is_finite()) || x_min > x_max {
                    return Err(TransformError::invalid(
                        OP,
                        format!("invalid reference window [{x_min}, {x_max}]"),
                    ));
                }
                let Some((first, last)) = input.x_range() else {
                    return Err(TransformError::invalid(OP, "dataset is empty"));
                };
                if x_min < first || x_max > last {
                    return Err(TransformError::WindowOutOfRange {
                        operation: OP,
                        x_min,
                        x_max,
                        first,
                        last,
                    });
                }
                let inside: Vec<(f64, f64)> = input
                    .active()
                    .filter(|p| (x_min..=x_max).contains(&p.x))
                    .map(|p| (p.y, p.u))
                    .collect();
                if inside.is_empty() {
                    return Err(TransformError::invalid(
                        OP,
                        format!("no active point inside [{x_min}, {x_max}]"),
                    ));
                }
                let values: Vec<f64> = inside.iter().map(|(y, _)| *y).collect();
                let mean = stats::mean(&values).unwrap_or_default();
                let (_, sum_u) =
                    propagate(&inside, &Operation::Sum).map_err(TransformError::uncertainty(OP))?;
                Ok((mean, sum_u / inside.len() as f64))
            }
        }
    }
}

impl CleaningOperation for Zeroing {
    fn kind(&self) -> OperationKind {
        OperationKind::Zeroing
    }

    fn apply(&self, input: &Dataset) -> Result<(Dataset, OperationRecord)> {
        let (offset, offset_uncertainty) = self.offset(input)?;
        let mut corrections = Vec::new();
        let output: Dataset = input
            .points()
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let y = point.y - offset;
                if (y + offset).to_bits() != point.y.to_bits() {
                    corrections.push(RoundingCorrection {
                        index,
                        original: point.y,
                    });
                }
                DataPoint { y, ..point.clone() }
            })
            .collect();
        debug!(
            offset,
            offset_uncertainty,
            corrections = corrections.len(),
            "zeroing"
        );
        let params = OperationParams::Zeroing(ZeroingParams {
            reference: self.reference.clone(),
            offset,
            offset_uncertainty,
            corrections,
        });
        let record = record(params, input, &output);
        Ok((output, record))
    }
}

/// Re-derives the pre-zeroing dataset from a zeroing record.
#[derive(Debug, Clone, PartialEq)]
pub struct Unzeroing {
    pub params: ZeroingParams,
}

impl Unzeroing {
    pub fn new(params: ZeroingParams) -> Self {
        Self { params }
    }
}

impl CleaningOperation for Unzeroing {
    fn kind(&self) -> OperationKind {
        OperationKind::Unzeroing
    }

    fn apply(&self, input: &Dataset) -> Result<(Dataset, OperationRecord)> {
        let mut points: Vec<DataPoint> = input
            .points()
            .iter()
            .map(|point| DataPoint {
                y: point.y + self.params.offset,
                ..point.clone()
            })
            .collect();
        for correction in &self.params.corrections {
            let len = points.len();
            let point = points
                .get_mut(correction.index)
                .ok_or(TransformError::IndexOutOfBounds {
                    operation: OperationKind::Unzeroing,
                    index: correction.index,
                    len,
                })?;
            point.y = correction.original;
        }
        let output = Dataset::new(points);
        let record = record(
            OperationParams::Unzeroing(self.params.clone()),
            input,
            &output,
        );
        Ok((output, record))
    }
}
