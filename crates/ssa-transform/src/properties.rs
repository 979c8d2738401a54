//! Mechanical properties of a stress/strain curve.
//!
//! Inputs are a dataset in canonical units (strain mm/mm on x, stress MPa on
//! y) and the standard's formula parameters. Flagged points never
//! contribute. Every result carries a propagated standard uncertainty.
//!
//! Strain values read off the curve (strain at peak, ductility) get a
//! sampling uncertainty of `h / (2√3)`, where `h` is the larger adjacent
//! point spacing: the true location is only known to within one interval.
//! The strain's own uncertainty, when the points carry one, is added in
//! quadrature.

use serde::{Deserialize, Serialize};
use ssa_model::{Dataset, OperationKind};
use ssa_standards::{Formulas, StrainWindow};
use ssa_uncertainty::{
    DifferenceScheme, Measured, Operation, derivative, fit_line, propagate, stats, trapezoid,
};

use crate::error::{Result, TransformError};

const OP: OperationKind = OperationKind::StressStrain;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanicalProperties {
    /// Elastic modulus, MPa.
    pub modulus: Option<Measured>,
    /// Peak stress, MPa.
    pub ultimate_strength: Measured,
    pub strain_at_ultimate: Measured,
    /// Offset yield strength, MPa.
    pub yield_strength: Option<Measured>,
    pub yield_strain: Option<Measured>,
    /// Area under the curve, MJ/m³.
    pub toughness: Measured,
    /// `½ σ_y ε_y`, MJ/m³.
    pub resilience: Option<Measured>,
    /// Largest strain reached.
    pub ductility: Measured,
    /// Mean stress inside the plateau window, MPa.
    pub plateau_stress: Option<Measured>,
}

impl MechanicalProperties {
    /// `(name, unit, value)` for every property that could be computed.
    pub fn entries(&self) -> Vec<(&'static str, &'static str, Measured)> {
        [
            ("modulus", "MPa", self.modulus),
            ("ultimate_strength", "MPa", Some(self.ultimate_strength)),
            ("strain_at_ultimate", "mm/mm", Some(self.strain_at_ultimate)),
            ("yield_strength", "MPa", self.yield_strength),
            ("yield_strain", "mm/mm", self.yield_strain),
            ("toughness", "MJ/m³", Some(self.toughness)),
            ("resilience", "MJ/m³", self.resilience),
            ("ductility", "mm/mm", Some(self.ductility)),
            ("plateau_stress", "MPa", self.plateau_stress),
        ]
        .into_iter()
        .filter_map(|(name, unit, value)| value.map(|v| (name, unit, v)))
        .collect()
    }
}

struct Curve {
    xs: Vec<f64>,
    ys: Vec<f64>,
    us: Vec<f64>,
    uxs: Vec<f64>,
}

impl Curve {
    fn sampling(&self, i: usize) -> f64 {
        let left = if i > 0 { self.xs[i] - self.xs[i - 1] } else { 0.0 };
        let right = self.xs.get(i + 1).map_or(0.0, |next| next - self.xs[i]);
        left.max(right) / (2.0 * 3f64.sqrt())
    }

    fn at(&self, i: usize) -> Measured {
        Measured {
            value: self.xs[i],
            uncertainty: self.sampling(i).hypot(self.uxs[i]),
        }
    }

    fn window(&self, window: StrainWindow) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut out = (Vec::new(), Vec::new(), Vec::new());
        for ((x, y), u) in self.xs.iter().zip(&self.ys).zip(&self.us) {
            if window.contains(*x) {
                out.0.push(*x);
                out.1.push(*y);
                out.2.push(*u);
            }
        }
        out
    }
}

pub fn compute(dataset: &Dataset, formulas: &Formulas) -> Result<MechanicalProperties> {
    let (xs, ys, us) = dataset.active_columns();
    if xs.len() < 2 {
        return Err(TransformError::invalid(
            OP,
            format!("a curve needs at least 2 active points, got {}", xs.len()),
        ));
    }
    let curve = Curve {
        xs,
        ys,
        us,
        uxs: dataset.active_x_uncertainties(),
    };
    let wrap = TransformError::uncertainty;

    let peak = curve
        .ys
        .iter()
        .enumerate()
        .fold(0, |best, (i, y)| if *y > curve.ys[best] { i } else { best });
    let ultimate_strength = Measured::new(curve.ys[peak], curve.us[peak]).map_err(wrap(OP))?;

    let modulus = modulus(&curve, formulas.modulus_window)?;
    let yield_point = match modulus {
        Some(e) if e.value > 0.0 => offset_yield(&curve, e, formulas.yield_offset),
        _ => None,
    };
    let resilience = yield_point.map(|(stress, strain)| (stress * strain).scale(0.5));

    let toughness = trapezoid(&curve.xs, &curve.ys, &curve.us).map_err(wrap(OP))?;

    let last = curve.xs.len() - 1;
    let plateau_stress = match formulas.plateau_window {
        Some(window) => plateau(&curve, window)?,
        None => None,
    };

    Ok(MechanicalProperties {
        modulus,
        ultimate_strength,
        strain_at_ultimate: curve.at(peak),
        yield_strength: yield_point.map(|(stress, _)| stress),
        yield_strain: yield_point.map(|(_, strain)| strain),
        toughness,
        resilience,
        ductility: curve.at(last),
        plateau_stress,
    })
}

/// Slope of the weighted fit inside the modulus window; `None` with fewer
/// than three points in the window.
fn modulus(curve: &Curve, window: StrainWindow) -> Result<Option<Measured>> {
    let (xs, ys, us) = curve.window(window);
    if xs.len() < 3 {
        return Ok(None);
    }
    let fit = fit_line(&xs, &ys, &us).map_err(TransformError::uncertainty(OP))?;
    Ok(Some(Measured {
        value: fit.slope,
        uncertainty: fit.slope_uncertainty,
    }))
}

/// First crossing of the curve with `σ = E (ε − offset)`, linearly
/// interpolated between the bracketing points.
fn offset_yield(curve: &Curve, e: Measured, offset: f64) -> Option<(Measured, Measured)> {
    let h = |i: usize| curve.ys[i] - e.value * (curve.xs[i] - offset);
    let i = (1..curve.xs.len()).find(|&i| curve.xs[i] > offset && h(i - 1) > 0.0 && h(i) <= 0.0)?;

    let (h0, h1) = (h(i - 1), h(i));
    let t = h0 / (h0 - h1);
    let dx = curve.xs[i] - curve.xs[i - 1];
    let strain = curve.xs[i - 1] + t * dx;
    let stress = curve.ys[i - 1] + t * (curve.ys[i] - curve.ys[i - 1]);

    // Local curve slope minus the line slope; negative at a downward crossing.
    let secant = (curve.ys[i] - curve.ys[i - 1]) / dx;
    let gap = secant - e.value;
    let u_curve = ((1.0 - t) * curve.us[i - 1]).hypot(t * curve.us[i]);
    let u_strain = ((1.0 - t) * curve.uxs[i - 1]).hypot(t * curve.uxs[i]);
    let d_strain_d_e = (strain - offset) / gap;
    let d_stress_d_e = secant * d_strain_d_e;

    Some((
        Measured {
            value: stress,
            uncertainty: u_curve.hypot(d_stress_d_e * e.uncertainty),
        },
        Measured {
            value: strain,
            uncertainty: (u_curve / gap)
                .hypot(d_strain_d_e * e.uncertainty)
                .hypot(u_strain),
        },
    ))
}

fn plateau(curve: &Curve, window: StrainWindow) -> Result<Option<Measured>> {
    let (_, ys, us) = curve.window(window);
    let Some(mean) = stats::mean(&ys) else {
        return Ok(None);
    };
    let inputs: Vec<(f64, f64)> = ys.iter().copied().zip(us.iter().copied()).collect();
    let (_, sum_u) = propagate(&inputs, &Operation::Sum).map_err(TransformError::uncertainty(OP))?;
    Ok(Some(Measured {
        value: mean,
        uncertainty: sum_u / ys.len() as f64,
    }))
}

/// `dσ/dε` at every active point, for plotting the tangent modulus.
pub fn tangent_modulus(dataset: &Dataset, scheme: DifferenceScheme) -> Result<Vec<(f64, Measured)>> {
    let (xs, ys, us) = dataset.active_columns();
    let slopes = derivative(&xs, &ys, &us, scheme).map_err(TransformError::uncertainty(OP))?;
    Ok(xs.into_iter().zip(slopes).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bilinear curve: E = 1000 MPa up to 0.01, then 100 MPa.
    fn bilinear() -> Dataset {
        Dataset::from_triples((0..=40).map(|i| {
            let strain = f64::from(i) * 0.001;
            let stress = if strain <= 0.01 {
                1000.0 * strain
            } else {
                10.0 + 100.0 * (strain - 0.01)
            };
            (strain, stress, 0.05)
        }))
    }

    fn formulas() -> Formulas {
        Formulas {
            modulus_window: StrainWindow {
                start: 0.001,
                end: 0.008,
            },
            yield_offset: 0.002,
            plateau_window: Some(StrainWindow {
                start: 0.0195,
                end: 0.0305,
            }),
        }
    }

    #[test]
    fn bilinear_curve_properties() {
        let props = compute(&bilinear(), &formulas()).unwrap();
        let modulus = props.modulus.unwrap();
        assert!((modulus.value - 1000.0).abs() < 1e-6);
        assert!(modulus.uncertainty > 0.0);

        // offset line meets the second branch where 10 + 100 (ε − 0.01) = 1000 (ε − 0.002)
        let yield_strength = props.yield_strength.unwrap();
        let expected_strain = (10.0 - 1.0 + 2.0) / 900.0;
        assert!((props.yield_strain.unwrap().value - expected_strain).abs() < 1e-9);
        assert!((yield_strength.value - 1000.0 * (expected_strain - 0.002)).abs() < 1e-6);

        assert!((props.ultimate_strength.value - 13.0).abs() < 1e-9);
        assert!((props.ductility.value - 0.04).abs() < 1e-12);
        assert!((props.plateau_stress.unwrap().value - 11.5).abs() < 1e-9);
        assert!(props.toughness.uncertainty > 0.0);
        assert!(props.entries().iter().all(|(_, _, m)| m.uncertainty >= 0.0));
    }

    #[test]
    fn strain_uncertainty_reaches_strain_properties() {
        let exact = compute(&bilinear(), &formulas()).unwrap();
        let points = bilinear()
            .into_points()
            .into_iter()
            .map(|p| p.with_x_uncertainty(0.002))
            .collect();
        let props = compute(&Dataset::new(points), &formulas()).unwrap();

        let sampling = 0.001 / (2.0 * 3f64.sqrt());
        assert!((exact.ductility.uncertainty - sampling).abs() < 1e-15);
        assert!((props.ductility.uncertainty - sampling.hypot(0.002)).abs() < 1e-15);
        assert!((props.strain_at_ultimate.uncertainty - sampling.hypot(0.002)).abs() < 1e-15);
        assert!(
            props.yield_strain.unwrap().uncertainty > exact.yield_strain.unwrap().uncertainty
        );
        assert_eq!(props.ductility.value, exact.ductility.value);
    }

    #[test]
    fn flagged_points_do_not_move_the_peak() {
        let mut points = bilinear().into_points();
        points[20].y = 500.0;
        points[20].flag = Some(ssa_model::PointFlag {
            rule: "manual: spike".to_string(),
            residual: None,
        });
        let props = compute(&Dataset::new(points), &formulas()).unwrap();
        assert!((props.ultimate_strength.value - 13.0).abs() < 1e-9);
    }
}
