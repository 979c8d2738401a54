//! Specimen geometry from metadata fields.

use std::f64::consts::PI;

use ssa_model::{FieldValue, OperationKind, SampleMetadata};
use ssa_standards::field;
use ssa_uncertainty::Measured;

use crate::error::{Result, TransformError};

const OP: OperationKind = OperationKind::StressStrain;

/// A dimensional field with its uncertainty. Plain numbers carry none and
/// are rejected rather than treated as exact.
pub fn quantity(metadata: &SampleMetadata, name: &'static str) -> Result<Measured> {
    match metadata.field(name) {
        None => Err(TransformError::MissingField {
            operation: OP,
            field: name,
        }),
        Some(FieldValue::Quantity { value, uncertainty }) => {
            let measured = Measured {
                value: *value,
                uncertainty: *uncertainty,
            };
            measured
                .check(name, "specimen geometry")
                .map_err(TransformError::uncertainty(OP))?;
            Ok(measured)
        }
        Some(FieldValue::Number(_)) => Err(TransformError::Uncertainty {
            operation: OP,
            source: ssa_uncertainty::UncertaintyError::Missing {
                quantity: name.to_string(),
                operation: "specimen geometry",
            },
        }),
        Some(FieldValue::Text(text)) => Err(TransformError::invalid(
            OP,
            format!("field '{name}' is text ('{text}'), expected a dimension"),
        )),
    }
}

/// Cross-sectional area in mm²: `width × thickness`, or `π d² / 4` for round
/// specimens that only declare a diameter.
pub fn cross_section(metadata: &SampleMetadata) -> Result<Measured> {
    if metadata.field(field::WIDTH).is_none() && metadata.field(field::DIAMETER).is_some() {
        let d = quantity(metadata, field::DIAMETER)?;
        // d is fully correlated with itself: u(d²) = 2 d u(d).
        return Ok(Measured {
            value: PI / 4.0 * d.value * d.value,
            uncertainty: PI / 2.0 * d.value.abs() * d.uncertainty,
        });
    }
    let width = quantity(metadata, field::WIDTH)?;
    let thickness = quantity(metadata, field::THICKNESS)?;
    Ok(width * thickness)
}

/// Specimen volume in mm³.
pub fn volume(metadata: &SampleMetadata) -> Result<Measured> {
    Ok(cross_section(metadata)? * quantity(metadata, field::GAUGE_LENGTH)?)
}

/// Density in g/cm³, from the `mass` field (g) and the specimen volume.
pub fn density(metadata: &SampleMetadata) -> Result<Measured> {
    let mass = quantity(metadata, field::MASS)?;
    mass.checked_div(volume(metadata)?)
        .map(|per_mm3| per_mm3.scale(1000.0))
        .map_err(TransformError::uncertainty(OP))
}
