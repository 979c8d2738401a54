//! Finite differences and trapezoidal integration with propagated uncertainty.
//!
//! Only the dependent values carry uncertainty; abscissae are treated as exact.

use serde::{Deserialize, Serialize};
use u_numflow::stats::kahan_sum;

use crate::error::{Result, UncertaintyError};
use crate::measured::Measured;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceScheme {
    /// Central differences inside, one-sided at both ends.
    #[default]
    Central,
    Forward,
    Backward,
}

fn check_columns(xs: &[f64], ys: &[f64], us: &[f64], operation: &'static str) -> Result<()> {
    if ys.len() != xs.len() || us.len() != xs.len() {
        return Err(UncertaintyError::Arity {
            operation,
            expected: "equal column lengths",
            actual: ys.len().min(us.len()),
        });
    }
    if xs.len() < 2 {
        return Err(UncertaintyError::Arity {
            operation,
            expected: "at least 2 points",
            actual: xs.len(),
        });
    }
    for (idx, u) in us.iter().enumerate() {
        if !u.is_finite() || *u < 0.0 {
            return Err(UncertaintyError::Missing {
                quantity: format!("point {idx}"),
                operation,
            });
        }
    }
    Ok(())
}

fn difference(xs: &[f64], ys: &[f64], us: &[f64], lo: usize, hi: usize) -> Result<Measured> {
    let dx = xs[hi] - xs[lo];
    if dx == 0.0 {
        return Err(UncertaintyError::DivisionByZero {
            operation: "derivative",
        });
    }
    Ok(Measured {
        value: (ys[hi] - ys[lo]) / dx,
        uncertainty: us[hi].hypot(us[lo]) / dx.abs(),
    })
}

/// `dy/dx` at every point.
pub fn derivative(
    xs: &[f64],
    ys: &[f64],
    us: &[f64],
    scheme: DifferenceScheme,
) -> Result<Vec<Measured>> {
    check_columns(xs, ys, us, "derivative")?;
    let last = xs.len() - 1;
    (0..=last)
        .map(|i| {
            let (lo, hi) = match scheme {
                DifferenceScheme::Forward => {
                    if i < last {
                        (i, i + 1)
                    } else {
                        (i - 1, i)
                    }
                }
                DifferenceScheme::Backward => {
                    if i > 0 {
                        (i - 1, i)
                    } else {
                        (0, 1)
                    }
                }
                DifferenceScheme::Central => (i.saturating_sub(1), (i + 1).min(last)),
            };
            difference(xs, ys, us, lo, hi)
        })
        .collect()
}

/// `∫ y dx` by the trapezoid rule.
///
/// The integral is linear in the `yᵢ`, so its sensitivity to each point is
/// half the width of the adjacent intervals.
pub fn trapezoid(xs: &[f64], ys: &[f64], us: &[f64]) -> Result<Measured> {
    check_columns(xs, ys, us, "trapezoid")?;
    let areas: Vec<f64> = xs
        .windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .collect();
    let last = xs.len() - 1;
    let contributions: Vec<f64> = (0..=last)
        .map(|i| {
            let left = if i > 0 { xs[i] - xs[i - 1] } else { 0.0 };
            let right = if i < last { xs[i + 1] - xs[i] } else { 0.0 };
            let g = (left + right) / 2.0;
            (g * us[i]) * (g * us[i])
        })
        .collect();
    let value = kahan_sum(&areas);
    let variance = kahan_sum(&contributions);
    Ok(Measured {
        value,
        uncertainty: variance.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_derivative_of_a_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 2.0, 4.0, 6.0];
        let us = [0.1; 4];
        let d = derivative(&xs, &ys, &us, DifferenceScheme::Central).unwrap();
        assert!(d.iter().all(|m| (m.value - 2.0).abs() < 1e-12));
        // interior points span two intervals
        assert!((d[1].uncertainty - 0.1f64.hypot(0.1) / 2.0).abs() < 1e-12);
        assert!((d[0].uncertainty - 0.1f64.hypot(0.1)).abs() < 1e-12);
    }

    #[test]
    fn one_sided_schemes() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 1.0, 5.0];
        let us = [0.0; 3];
        let forward = derivative(&xs, &ys, &us, DifferenceScheme::Forward).unwrap();
        let backward = derivative(&xs, &ys, &us, DifferenceScheme::Backward).unwrap();
        assert_eq!(forward[0].value, 1.0);
        assert_eq!(forward[2].value, 2.0);
        assert_eq!(backward[0].value, 1.0);
        assert_eq!(backward[2].value, 2.0);
    }

    #[test]
    fn trapezoid_area_of_triangle() {
        let area = trapezoid(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0], &[0.1, 0.1, 0.1]).unwrap();
        assert_eq!(area.value, 1.0);
        let expected = (0.05f64.powi(2) + 0.1f64.powi(2) + 0.05f64.powi(2)).sqrt();
        assert!((area.uncertainty - expected).abs() < 1e-12);
    }

    #[test]
    fn single_point_is_rejected() {
        assert!(trapezoid(&[0.0], &[1.0], &[0.1]).is_err());
    }
}
