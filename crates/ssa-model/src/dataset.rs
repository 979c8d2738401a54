//! Measurement sequences.
//!
//! A [`Dataset`] is an ordered sequence of `(x, y, u)` triples where `x` is
//! the independent variable, `y` the dependent variable and `u` the standard
//! uncertainty of `y`. Points excluded by an outlier rule stay in the
//! sequence with a [`PointFlag`] so they remain retrievable.
//!
//! Once a transform gives `x` its own uncertainty (strain after the
//! stress-strain conversion), each point also carries `ux`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, Result};

/// Marks a point excluded from aggregate calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFlag {
    /// Label of the rule that excluded the point (e.g. "residual>3.0σ").
    pub rule: String,
    /// Residual against the fitted model, when the rule uses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    pub u: f64,
    /// Standard uncertainty of `x`, absent while `x` is taken as exact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ux: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<PointFlag>,
}

impl DataPoint {
    pub fn new(x: f64, y: f64, u: f64) -> Self {
        Self {
            x,
            y,
            u,
            ux: None,
            flag: None,
        }
    }

    pub fn with_x_uncertainty(mut self, ux: f64) -> Self {
        self.ux = Some(ux);
        self
    }

    /// `ux`, or zero when `x` is exact.
    pub fn x_uncertainty(&self) -> f64 {
        self.ux.unwrap_or(0.0)
    }

    pub fn is_excluded(&self) -> bool {
        self.flag.is_some()
    }
}

impl From<(f64, f64, f64)> for DataPoint {
    fn from((x, y, u): (f64, f64, f64)) -> Self {
        Self::new(x, y, u)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    points: Vec<DataPoint>,
}

impl Dataset {
    pub fn new(points: Vec<DataPoint>) -> Self {
        Self { points }
    }

    pub fn from_triples(triples: impl IntoIterator<Item = (f64, f64, f64)>) -> Self {
        Self::new(triples.into_iter().map(DataPoint::from).collect())
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<DataPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points that take part in aggregate calculations.
    pub fn active(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter().filter(|p| !p.is_excluded())
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Indices of flagged points, in sequence order.
    pub fn excluded_indices(&self) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_excluded())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Active points as parallel `(x, y, u)` vectors.
    pub fn active_columns(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut us = Vec::new();
        for point in self.active() {
            xs.push(point.x);
            ys.push(point.y);
            us.push(point.u);
        }
        (xs, ys, us)
    }

    /// Standard uncertainties of the active `x` values, zero where exact.
    pub fn active_x_uncertainties(&self) -> Vec<f64> {
        self.active().map(DataPoint::x_uncertainty).collect()
    }

    /// Range of the independent variable over all points.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some((first.x, last.x))
    }

    /// Checks the ingestion contract for raw measurements.
    ///
    /// Rejects empty input, non-finite values, negative uncertainties and any
    /// independent-variable point that does not strictly increase. Points are
    /// never re-sorted.
    pub fn validate_raw(&self) -> Result<()> {
        if self.points.is_empty() {
            return Err(EngineError::validation("measurements must not be empty"));
        }
        for (idx, point) in self.points.iter().enumerate() {
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(EngineError::validation(format!(
                    "point {idx} has a non-finite value ({}, {})",
                    point.x, point.y
                )));
            }
            if !point.u.is_finite() || point.u < 0.0 {
                return Err(EngineError::validation(format!(
                    "point {idx} has an invalid uncertainty {}",
                    point.u
                )));
            }
            if let Some(ux) = point.ux
                && (!ux.is_finite() || ux < 0.0)
            {
                return Err(EngineError::validation(format!(
                    "point {idx} has an invalid independent-variable uncertainty {ux}"
                )));
            }
            if point.is_excluded() {
                return Err(EngineError::validation(format!(
                    "point {idx} is flagged; raw measurements cannot carry flags"
                )));
            }
        }
        for (idx, pair) in self.points.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.x == prev.x {
                return Err(EngineError::validation(format!(
                    "duplicate independent value {} at points {} and {}",
                    next.x,
                    idx,
                    idx + 1
                )));
            }
            if next.x < prev.x {
                return Err(EngineError::validation(format!(
                    "independent variable decreases from {} to {} at point {}",
                    prev.x,
                    next.x,
                    idx + 1
                )));
            }
        }
        Ok(())
    }

    /// Fails fast when any point carries an unpropagated uncertainty.
    pub fn ensure_uncertainties(&self, operation: &str) -> Result<()> {
        for (idx, point) in self.points.iter().enumerate() {
            if !point.u.is_finite() || point.u < 0.0 {
                return Err(EngineError::missing_uncertainty(
                    format!("point {idx}"),
                    operation,
                ));
            }
        }
        Ok(())
    }

    /// SHA-256 over the exact bit patterns of every point, including `ux`
    /// and flag state.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.points.len() as u64).to_le_bytes());
        for point in &self.points {
            hasher.update(point.x.to_bits().to_le_bytes());
            hasher.update(point.y.to_bits().to_le_bytes());
            hasher.update(point.u.to_bits().to_le_bytes());
            match point.ux {
                Some(ux) => {
                    hasher.update([1u8]);
                    hasher.update(ux.to_bits().to_le_bytes());
                }
                None => hasher.update([0u8]),
            }
            match &point.flag {
                Some(flag) => {
                    hasher.update([1u8]);
                    hasher.update((flag.rule.len() as u64).to_le_bytes());
                    hasher.update(flag.rule.as_bytes());
                }
                None => hasher.update([0u8]),
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Bit-level equality, including `-0.0` vs `0.0` and flag state.
    pub fn bit_identical(&self, other: &Dataset) -> bool {
        self.points.len() == other.points.len()
            && self.points.iter().zip(&other.points).all(|(a, b)| {
                a.x.to_bits() == b.x.to_bits()
                    && a.y.to_bits() == b.y.to_bits()
                    && a.u.to_bits() == b.u.to_bits()
                    && a.ux.map(f64::to_bits) == b.ux.map(f64::to_bits)
                    && a.flag == b.flag
            })
    }
}

impl FromIterator<DataPoint> for Dataset {
    fn from_iter<T: IntoIterator<Item = DataPoint>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_measurements() {
        let err = Dataset::default().validate_raw().unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn rejects_duplicate_independent_values() {
        let data = Dataset::from_triples([(0.0, 0.0, 0.1), (1.0, 1.0, 0.1), (1.0, 2.0, 0.1)]);
        let err = data.validate_raw().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_decreasing_independent_values_without_sorting() {
        let data = Dataset::from_triples([(0.0, 0.0, 0.1), (2.0, 1.0, 0.1), (1.0, 2.0, 0.1)]);
        let err = data.validate_raw().unwrap_err();
        assert!(err.to_string().contains("decreases"));
        assert_eq!(data.points()[1].x, 2.0);
    }

    #[test]
    fn rejects_negative_uncertainty() {
        let data = Dataset::from_triples([(0.0, 0.0, -0.1)]);
        assert!(data.validate_raw().is_err());
    }

    #[test]
    fn digest_changes_with_flags() {
        let plain = Dataset::from_triples([(0.0, 0.0, 0.1), (1.0, 1.0, 0.1)]);
        let mut points = plain.points().to_vec();
        points[1].flag = Some(PointFlag {
            rule: "manual".to_string(),
            residual: None,
        });
        let flagged = Dataset::new(points);
        assert_ne!(plain.digest(), flagged.digest());
        assert_eq!(flagged.active_count(), 1);
        assert_eq!(flagged.excluded_indices(), vec![1]);
    }

    #[test]
    fn x_uncertainty_is_part_of_the_digest() {
        let exact = Dataset::from_triples([(0.0, 0.0, 0.1), (0.01, 1.0, 0.1)]);
        let points = exact
            .points()
            .iter()
            .map(|p| p.clone().with_x_uncertainty(2e-4))
            .collect();
        let uncertain = Dataset::new(points);
        assert_ne!(exact.digest(), uncertain.digest());
        assert!(!exact.bit_identical(&uncertain));
        assert_eq!(exact.active_x_uncertainties(), vec![0.0, 0.0]);
        assert_eq!(uncertain.active_x_uncertainties(), vec![2e-4, 2e-4]);
    }

    #[test]
    fn rejects_negative_x_uncertainty() {
        let data = Dataset::new(vec![DataPoint::new(0.0, 0.0, 0.1).with_x_uncertainty(-1.0)]);
        assert!(data.validate_raw().is_err());
    }

    #[test]
    fn nan_uncertainty_is_missing() {
        let data = Dataset::from_triples([(0.0, 1.0, f64::NAN)]);
        let err = data.ensure_uncertainties("zeroing").unwrap_err();
        assert!(matches!(err, EngineError::MissingUncertainty { .. }));
    }
}
