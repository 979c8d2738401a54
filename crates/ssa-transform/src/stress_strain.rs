use ssa_model::{
    DataPoint, Dataset, OperationKind, OperationParams, OperationRecord, SampleMetadata,
    StressStrainParams,
};
use ssa_standards::field;
use ssa_uncertainty::Measured;
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::operation::{CleaningOperation, record};
use crate::specimen;

const OP: OperationKind = OperationKind::StressStrain;

/// Converts force/displacement (N, mm) into engineering stress/strain
/// (MPa, mm/mm). Stress uncertainty combines the force uncertainty of each
/// point with the area uncertainty. Each strain carries its own uncertainty
/// from the displacement and gauge-length uncertainties.
#[derive(Debug, Clone, PartialEq)]
pub struct StressStrain {
    pub params: StressStrainParams,
}

impl StressStrain {
    pub fn new(params: StressStrainParams) -> Self {
        Self { params }
    }

    /// Reads area and gauge length from the specimen fields.
    pub fn from_metadata(metadata: &SampleMetadata, displacement_uncertainty: f64) -> Result<Self> {
        let area = specimen::cross_section(metadata)?;
        let gauge = specimen::quantity(metadata, field::GAUGE_LENGTH)?;
        Ok(Self::new(StressStrainParams {
            area: area.value,
            area_uncertainty: area.uncertainty,
            gauge_length: gauge.value,
            gauge_length_uncertainty: gauge.uncertainty,
            displacement_uncertainty,
        }))
    }

    /// Standard uncertainty of the strain at `displacement`.
    pub fn strain_uncertainty(&self, displacement: f64) -> Result<f64> {
        let p = &self.params;
        Measured {
            value: displacement,
            uncertainty: p.displacement_uncertainty,
        }
        .checked_div(Measured {
            value: p.gauge_length,
            uncertainty: p.gauge_length_uncertainty,
        })
        .map(|m| m.uncertainty)
        .map_err(TransformError::uncertainty(OP))
    }
}

impl CleaningOperation for StressStrain {
    fn kind(&self) -> OperationKind {
        OP
    }

    fn apply(&self, input: &Dataset) -> Result<(Dataset, OperationRecord)> {
        let p = &self.params;
        if !(p.area.is_finite() && p.area > 0.0) {
            return Err(TransformError::invalid(
                OP,
                format!("area must be positive, got {}", p.area),
            ));
        }
        if !(p.gauge_length.is_finite() && p.gauge_length > 0.0) {
            return Err(TransformError::invalid(
                OP,
                format!("gauge length must be positive, got {}", p.gauge_length),
            ));
        }
        let area =
            Measured::new(p.area, p.area_uncertainty).map_err(TransformError::uncertainty(OP))?;

        let points = input
            .points()
            .iter()
            .map(|point| {
                let stress = Measured::new(point.y, point.u)
                    .and_then(|force| force.checked_div(area))
                    .map_err(TransformError::uncertainty(OP))?;
                Ok(DataPoint {
                    x: point.x / p.gauge_length,
                    y: stress.value,
                    u: stress.uncertainty,
                    ux: Some(self.strain_uncertainty(point.x)?),
                    flag: point.flag.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(area = p.area, gauge_length = p.gauge_length, "stress/strain conversion");

        let output = Dataset::new(points);
        let record = record(OperationParams::StressStrain(p.clone()), input, &output);
        Ok((output, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_and_propagates() {
        let op = StressStrain::new(StressStrainParams {
            area: 40.0,
            area_uncertainty: 0.4,
            gauge_length: 50.0,
            gauge_length_uncertainty: 0.0,
            displacement_uncertainty: 0.01,
        });
        let input = Dataset::from_triples([(0.0, 0.0, 1.0), (0.5, 400.0, 4.0)]);
        let (output, _) = op.apply(&input).unwrap();
        let last = &output.points()[1];
        assert_eq!(last.x, 0.01);
        assert_eq!(last.y, 10.0);
        // 1 % force and 1 % area combine to √2 %.
        assert!((last.u - 0.1 * 2f64.sqrt()).abs() < 1e-12);
        assert!((op.strain_uncertainty(0.5).unwrap() - 0.0002).abs() < 1e-15);
        assert_eq!(last.ux, Some(op.strain_uncertainty(0.5).unwrap()));
        assert!((output.points()[0].x_uncertainty() - 0.0002).abs() < 1e-15);
    }

    #[test]
    fn gauge_length_uncertainty_grows_with_strain() {
        let op = StressStrain::new(StressStrainParams {
            area: 10.0,
            area_uncertainty: 0.0,
            gauge_length: 100.0,
            gauge_length_uncertainty: 1.0,
            displacement_uncertainty: 0.0,
        });
        let input = Dataset::from_triples([(0.0, 0.0, 0.1), (4.0, 100.0, 0.1)]);
        let (output, _) = op.apply(&input).unwrap();
        assert_eq!(output.points()[0].ux, Some(0.0));
        // 1 % gauge length on a strain of 0.04.
        let ux = output.points()[1].x_uncertainty();
        assert!((ux - 0.0004).abs() < 1e-15);
    }
}
