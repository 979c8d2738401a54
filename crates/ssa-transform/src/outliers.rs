//! Outlier flagging.
//!
//! Flagged points stay in the derived dataset, marked with the rule that
//! excluded them; every calculation downstream skips them.

use std::collections::BTreeSet;

use ssa_model::{
    DataPoint, Dataset, FitModel, FlaggedPoint, OperationKind, OperationParams, OperationRecord,
    OutlierParams, OutlierRule, PointFlag, ResidualScale,
};
use ssa_uncertainty::{fit_line, fit_polynomial, stats};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::operation::{CleaningOperation, record};

const OP: OperationKind = OperationKind::OutlierFlagging;

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierFlagging {
    pub rule: OutlierRule,
}

impl OutlierFlagging {
    pub fn new(rule: OutlierRule) -> Self {
        Self { rule }
    }

    pub fn manual(indices: impl IntoIterator<Item = usize>, reason: impl Into<String>) -> Self {
        Self::new(OutlierRule::Manual {
            indices: indices.into_iter().collect(),
            reason: reason.into(),
        })
    }

    /// Indices to flag with their residuals, ascending.
    fn select(&self, input: &Dataset) -> Result<Vec<(usize, Option<f64>)>> {
        match &self.rule {
            OutlierRule::Manual { indices, .. } => {
                let len = input.len();
                let unique: BTreeSet<usize> = indices.iter().copied().collect();
                if let Some(&index) = unique.iter().find(|&&i| i >= len) {
                    return Err(TransformError::IndexOutOfBounds {
                        operation: OP,
                        index,
                        len,
                    });
                }
                Ok(unique
                    .into_iter()
                    .filter(|&i| !input.points()[i].is_excluded())
                    .map(|i| (i, None))
                    .collect())
            }
            OutlierRule::ResidualThreshold {
                model,
                threshold,
                scale,
            } => residual_outliers(input, *model, *threshold, *scale),
        }
    }
}

fn residual_outliers(
    input: &Dataset,
    model: FitModel,
    threshold: f64,
    scale: ResidualScale,
) -> Result<Vec<(usize, Option<f64>)>> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(TransformError::invalid(
            OP,
            format!("threshold must be positive, got {threshold}"),
        ));
    }
    let active: Vec<(usize, &DataPoint)> = input
        .points()
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_excluded())
        .collect();
    let parameters = model.parameter_count();
    if active.len() <= parameters {
        return Err(TransformError::invalid(
            OP,
            format!(
                "{} active point(s) cannot support a fit with {parameters} parameters",
                active.len()
            ),
        ));
    }

    let xs: Vec<f64> = active.iter().map(|(_, p)| p.x).collect();
    let ys: Vec<f64> = active.iter().map(|(_, p)| p.y).collect();
    let residuals: Vec<f64> = match model {
        FitModel::Linear => {
            // Unweighted so that a single noisy point cannot dominate the fit.
            let unit = vec![0.0; xs.len()];
            let fit = fit_line(&xs, &ys, &unit).map_err(TransformError::uncertainty(OP))?;
            xs.iter().zip(&ys).map(|(x, y)| y - fit.predict(*x)).collect()
        }
        FitModel::Polynomial { degree } => fit_polynomial(&xs, &ys, degree)
            .map_err(TransformError::uncertainty(OP))?
            .residuals(&xs, &ys),
    };

    let (center, sigma) = match scale {
        ResidualScale::StandardError => {
            let sse: f64 = residuals.iter().map(|r| r * r).sum();
            (0.0, (sse / (residuals.len() - parameters) as f64).sqrt())
        }
        ResidualScale::MedianAbsoluteDeviation => (
            stats::median(&residuals).unwrap_or_default(),
            stats::mad_sigma(&residuals).unwrap_or_default(),
        ),
    };
    debug!(points = residuals.len(), sigma, threshold, "residual scale");
    // Residuals below this are fitting noise, not deviations.
    let tolerance = f64::EPSILON.sqrt() * ys.iter().fold(1.0f64, |m, y| m.max(y.abs()));
    let exceeds = |r: f64| {
        let deviation = (r - center).abs();
        if sigma > tolerance {
            deviation / sigma > threshold
        } else {
            deviation > tolerance
        }
    };

    Ok(active
        .iter()
        .zip(&residuals)
        .filter(|(_, r)| exceeds(**r))
        .map(|((index, _), r)| (*index, Some(*r)))
        .collect())
}

impl CleaningOperation for OutlierFlagging {
    fn kind(&self) -> OperationKind {
        OP
    }

    fn apply(&self, input: &Dataset) -> Result<(Dataset, OperationRecord)> {
        let selected = self.select(input)?;
        let label = self.rule.label();
        let mut points = input.points().to_vec();
        let mut flagged = Vec::with_capacity(selected.len());
        for (index, residual) in selected {
            let point = &mut points[index];
            point.flag = Some(PointFlag {
                rule: label.clone(),
                residual,
            });
            flagged.push(FlaggedPoint {
                index,
                x: point.x,
                y: point.y,
                u: point.u,
                residual,
            });
        }
        debug!(rule = %label, flagged = flagged.len(), "outlier flagging");

        let output = Dataset::new(points);
        let params = OperationParams::OutlierFlagging(OutlierParams {
            rule: self.rule.clone(),
            flagged,
        });
        let record = record(params, input, &output);
        Ok((output, record))
    }
}
