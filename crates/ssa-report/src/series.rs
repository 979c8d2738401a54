//! Plot-ready point series.
//!
//! Points stay in canonical units. The attached conversions tell a renderer
//! how to label and scale each axis without the engine changing any value.

use serde::Serialize;
use ssa_model::{DisplayOptions, Result, Sample};
use ssa_transform::tangent_modulus;
use ssa_uncertainty::DifferenceScheme;
use ssa_units::{DisplayConversion, QuantityKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
    pub u: f64,
    /// Horizontal error bar, zero while `x` is exact.
    pub ux: f64,
    pub excluded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub x: DisplayConversion,
    pub y: DisplayConversion,
    pub points: Vec<SeriesPoint>,
}

impl PlotSeries {
    /// Builds the series for `sample`.
    ///
    /// Axes are strain/stress once the lineage went through the stress-strain
    /// conversion, displacement/force before.
    pub fn for_sample(sample: &Sample, stress_strain: bool, display: &DisplayOptions) -> Result<Self> {
        let (x, y) = if stress_strain {
            (
                DisplayConversion::new(QuantityKind::Strain, &display.strain)?,
                DisplayConversion::new(QuantityKind::Stress, &display.stress)?,
            )
        } else {
            (
                DisplayConversion::new(QuantityKind::Displacement, &display.displacement)?,
                DisplayConversion::new(QuantityKind::Force, &display.force)?,
            )
        };
        let points = sample
            .data()
            .points()
            .iter()
            .map(|p| SeriesPoint {
                x: p.x,
                y: p.y,
                u: p.u,
                ux: p.x_uncertainty(),
                excluded: p.is_excluded(),
            })
            .collect();
        Ok(Self { x, y, points })
    }

    /// Tangent modulus `dσ/dε` against strain over the active points of a
    /// stress/strain sample. The modulus axis uses the stress display unit.
    pub fn tangent_modulus(sample: &Sample, display: &DisplayOptions) -> Result<Self> {
        let x = DisplayConversion::new(QuantityKind::Strain, &display.strain)?;
        let y = DisplayConversion::new(QuantityKind::Stress, &display.stress)?;
        let uxs = sample.data().active_x_uncertainties();
        let points = tangent_modulus(sample.data(), DifferenceScheme::Central)?
            .into_iter()
            .zip(uxs)
            .map(|((strain, slope), ux)| SeriesPoint {
                x: strain,
                y: slope.value,
                u: slope.uncertainty,
                ux,
                excluded: false,
            })
            .collect();
        Ok(Self { x, y, points })
    }

    /// Points converted to the display units.
    pub fn display_points(&self) -> Vec<SeriesPoint> {
        self.points
            .iter()
            .map(|p| SeriesPoint {
                x: self.x.value(p.x),
                y: self.y.value(p.y),
                u: self.y.uncertainty(p.u),
                ux: self.x.uncertainty(p.ux),
                excluded: p.excluded,
            })
            .collect()
    }

    pub fn active(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter().filter(|p| !p.excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssa_model::{DataPoint, Dataset, SampleId, SampleMetadata, StandardRef};

    fn sample(data: Dataset) -> Sample {
        Sample::raw(
            SampleId::new(1),
            SampleMetadata::new("A1", StandardRef::new("generic", "1")),
            data,
        )
    }

    #[test]
    fn raw_series_uses_force_axes() {
        let raw = sample(Dataset::from_triples([(0.0, 1000.0, 5.0), (1.0, 2000.0, 10.0)]));
        let display = DisplayOptions {
            force: "kN".to_string(),
            ..DisplayOptions::default()
        };
        let series = PlotSeries::for_sample(&raw, false, &display).unwrap();
        assert_eq!(series.x.quantity, QuantityKind::Displacement);
        assert_eq!(series.y.display_unit, "kN");
        let shown = series.display_points();
        assert_eq!(shown[1].y, 2.0);
        assert_eq!(shown[1].u, 0.01);
        assert_eq!(series.points[1].y, 2000.0);
    }

    #[test]
    fn strain_error_bars_follow_the_display_unit() {
        let data = Dataset::new(vec![
            DataPoint::new(0.0, 0.0, 0.1).with_x_uncertainty(1e-4),
            DataPoint::new(0.01, 10.0, 0.1).with_x_uncertainty(2e-4),
        ]);
        let series = PlotSeries::for_sample(&sample(data), true, &DisplayOptions::default()).unwrap();
        assert_eq!(series.points[1].ux, 2e-4);
        let shown = series.display_points();
        assert!((shown[1].ux - 0.02).abs() < 1e-12);
        assert!((shown[1].x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tangent_series_tracks_the_local_slope() {
        let mut points: Vec<DataPoint> = (0..=10)
            .map(|i| {
                let strain = f64::from(i) * 0.001;
                DataPoint::new(strain, 1000.0 * strain, 0.05)
            })
            .collect();
        points[5].y = 999.0;
        points[5].flag = Some(ssa_model::PointFlag {
            rule: "manual: spike".to_string(),
            residual: None,
        });
        let series =
            PlotSeries::tangent_modulus(&sample(Dataset::new(points)), &DisplayOptions::default())
                .unwrap();
        assert_eq!(series.points.len(), 10);
        assert_eq!(series.y.display_unit, "MPa");
        for point in &series.points {
            assert!((point.y - 1000.0).abs() < 1e-6);
            assert!(point.u > 0.0);
        }
    }

    #[test]
    fn unknown_display_unit_is_a_unit_mismatch() {
        let display = DisplayOptions {
            stress: "furlong".to_string(),
            ..DisplayOptions::default()
        };
        let data = Dataset::from_triples([(0.0, 1.0, 0.1)]);
        let err = PlotSeries::for_sample(&sample(data), true, &display).unwrap_err();
        assert!(matches!(err, ssa_model::EngineError::UnitMismatch { .. }));
    }
}
