//! Normalization of imported measurement channels.
//!
//! The file reader hands over values in declared units. This is the single
//! place they are converted; everything downstream is canonical.

use serde::{Deserialize, Serialize};
use ssa_model::{DataPoint, Dataset, FieldValue};
use tracing::debug;

use crate::error::Result;
use crate::quantity::QuantityKind;
use crate::registry::{normalize, normalize_uncertainty, resolve};
use crate::uncertainty::UncertaintySpec;

/// Quantity and declared unit of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub quantity: QuantityKind,
    pub unit: String,
}

impl Channel {
    pub fn new(quantity: QuantityKind, unit: impl Into<String>) -> Self {
        Self {
            quantity,
            unit: unit.into(),
        }
    }

    pub fn canonical(quantity: QuantityKind) -> Self {
        Self::new(quantity, quantity.canonical_unit())
    }
}

/// A raw point straight from the reader, in declared units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPoint {
    pub x: f64,
    pub y: f64,
    pub u: UncertaintySpec,
}

impl RawPoint {
    pub fn new(x: f64, y: f64, u: UncertaintySpec) -> Self {
        Self { x, y, u }
    }
}

/// Converts raw points to a canonical [`Dataset`].
///
/// Units are resolved once up front so a bad header fails before any point
/// is touched. The ingestion contract (ordering, duplicates) is checked by
/// the store, not here.
pub fn normalize_points(points: &[RawPoint], x: &Channel, y: &Channel) -> Result<Dataset> {
    resolve(&x.unit, x.quantity)?;
    resolve(&y.unit, y.quantity)?;
    debug!(
        points = points.len(),
        x_unit = %x.unit,
        y_unit = %y.unit,
        "normalizing measurement channels"
    );
    points
        .iter()
        .map(|point| -> Result<DataPoint> {
            let u = point.u.resolve(point.y);
            Ok(DataPoint::new(
                normalize(point.x, &x.unit, x.quantity)?,
                normalize(point.y, &y.unit, y.quantity)?,
                normalize_uncertainty(u, &y.unit, y.quantity)?,
            ))
        })
        .collect()
}

/// Normalizes a specimen metadata quantity such as width or mass.
pub fn normalize_field(
    value: f64,
    uncertainty: UncertaintySpec,
    unit: &str,
    quantity: QuantityKind,
) -> Result<FieldValue> {
    Ok(FieldValue::Quantity {
        value: normalize(value, unit, quantity)?,
        uncertainty: normalize_uncertainty(uncertainty.resolve(value), unit, quantity)?,
    })
}
