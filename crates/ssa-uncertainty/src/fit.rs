//! Least-squares fits with parameter uncertainties.
//!
//! Straight lines use weighted least squares when every point has a
//! non-zero uncertainty (weights `1/uᵢ²`) and ordinary least squares with
//! the residual standard error otherwise. Polynomials are fitted by
//! ordinary least squares on a centred and scaled abscissa, solving the
//! normal equations by Cholesky factorisation.

use serde::{Deserialize, Serialize};
use u_numflow::matrix::Matrix;

use crate::error::{Result, UncertaintyError};
use crate::propagate::{polynomial_derivative, polynomial_value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub slope_uncertainty: f64,
    pub intercept_uncertainty: f64,
    /// `√(SSE / (n − 2))`, zero when `n = 2`.
    pub residual_se: f64,
    pub n: usize,
    /// True when per-point weights were used.
    pub weighted: bool,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

struct WeightedMoments {
    total_weight: f64,
    x_mean: f64,
    y_mean: f64,
    sxx: f64,
    sxy: f64,
}

fn moments(xs: &[f64], ys: &[f64], weights: &[f64]) -> Result<WeightedMoments> {
    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0.0 {
        return Err(UncertaintyError::degenerate("weights sum to zero"));
    }
    let x_mean = xs.iter().zip(weights).map(|(x, w)| w * x).sum::<f64>() / total_weight;
    let y_mean = ys.iter().zip(weights).map(|(y, w)| w * y).sum::<f64>() / total_weight;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for ((x, y), w) in xs.iter().zip(ys).zip(weights) {
        let dx = x - x_mean;
        sxx += w * dx * dx;
        sxy += w * dx * (y - y_mean);
    }
    if sxx <= 0.0 {
        return Err(UncertaintyError::degenerate(
            "all points share the same independent value",
        ));
    }
    Ok(WeightedMoments {
        total_weight,
        x_mean,
        y_mean,
        sxx,
        sxy,
    })
}

/// Partial derivatives of the fitted slope with respect to each `yᵢ`.
pub(crate) fn slope_sensitivities(xs: &[f64], weights: Option<&[f64]>) -> Result<Vec<f64>> {
    if xs.len() < 2 {
        return Err(UncertaintyError::degenerate(format!(
            "a slope needs at least 2 points, got {}",
            xs.len()
        )));
    }
    let unit = vec![1.0; xs.len()];
    let weights = weights.unwrap_or(&unit);
    let m = moments(xs, &unit, weights)?;
    Ok(xs
        .iter()
        .zip(weights)
        .map(|(x, w)| w * (x - m.x_mean) / m.sxx)
        .collect())
}

/// Fits `y = intercept + slope · x`.
pub fn fit_line(xs: &[f64], ys: &[f64], us: &[f64]) -> Result<LinearFit> {
    let n = xs.len();
    if ys.len() != n || us.len() != n {
        return Err(UncertaintyError::degenerate("column lengths differ"));
    }
    if n < 2 {
        return Err(UncertaintyError::degenerate(format!(
            "a line needs at least 2 points, got {n}"
        )));
    }
    for (idx, u) in us.iter().enumerate() {
        if !u.is_finite() || *u < 0.0 {
            return Err(UncertaintyError::Missing {
                quantity: format!("point {idx}"),
                operation: "linear_fit_slope",
            });
        }
    }
    let weighted = us.iter().all(|u| *u > 0.0);
    let weights: Vec<f64> = if weighted {
        us.iter().map(|u| 1.0 / (u * u)).collect()
    } else {
        vec![1.0; n]
    };
    let m = moments(xs, ys, &weights)?;
    let slope = m.sxy / m.sxx;
    let intercept = m.y_mean - slope * m.x_mean;

    let sse: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| {
            let r = y - (intercept + slope * x);
            r * r
        })
        .sum();
    let residual_se = if n > 2 {
        (sse / (n - 2) as f64).sqrt()
    } else {
        0.0
    };

    let (slope_uncertainty, intercept_uncertainty) = if weighted {
        (
            (1.0 / m.sxx).sqrt(),
            (1.0 / m.total_weight + m.x_mean * m.x_mean / m.sxx).sqrt(),
        )
    } else {
        if n < 3 {
            return Err(UncertaintyError::degenerate(
                "without per-point uncertainties a slope uncertainty needs at least 3 points",
            ));
        }
        (
            residual_se / m.sxx.sqrt(),
            residual_se * (1.0 / n as f64 + m.x_mean * m.x_mean / m.sxx).sqrt(),
        )
    };

    Ok(LinearFit {
        slope,
        intercept,
        slope_uncertainty,
        intercept_uncertainty,
        residual_se,
        n,
        weighted,
    })
}

/// Least-squares polynomial in `t = (x − center) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialFit {
    pub center: f64,
    pub scale: f64,
    /// Coefficients of `t⁰, t¹, …`.
    pub coefficients: Vec<f64>,
}

impl PolynomialFit {
    fn t(&self, x: f64) -> f64 {
        (x - self.center) / self.scale
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        polynomial_value(&self.coefficients, self.t(x))
    }

    pub fn slope_at(&self, x: f64) -> f64 {
        polynomial_derivative(&self.coefficients, self.t(x)) / self.scale
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn residuals(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        xs.iter().zip(ys).map(|(x, y)| y - self.evaluate(*x)).collect()
    }
}

pub fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Result<PolynomialFit> {
    let n = xs.len();
    let p = degree + 1;
    if ys.len() != n {
        return Err(UncertaintyError::degenerate("column lengths differ"));
    }
    if n < p {
        return Err(UncertaintyError::degenerate(format!(
            "degree {degree} needs at least {p} points, got {n}"
        )));
    }
    let (min, max) = xs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(*x), hi.max(*x))
        });
    let center = (min + max) / 2.0;
    let scale = if max > min { (max - min) / 2.0 } else { 1.0 };

    // Vandermonde design matrix in t (n × p, row-major).
    let mut design = Vec::with_capacity(n * p);
    for x in xs {
        let t = (x - center) / scale;
        let mut power = 1.0;
        for _ in 0..p {
            design.push(power);
            power *= t;
        }
    }
    let singular = || {
        UncertaintyError::degenerate("too few distinct independent values for the requested degree")
    };
    let v = Matrix::new(n, p, design).map_err(|_| singular())?;
    let vt = v.transpose();
    let vtv = vt.mul_mat(&v).map_err(|_| singular())?;
    let vty = vt.mul_vec(ys).map_err(|_| singular())?;
    let coefficients = vtv.cholesky_solve(&vty).map_err(|_| singular())?;
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(singular());
    }
    Ok(PolynomialFit {
        center,
        scale,
        coefficients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_line_through_exact_points() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        let us = [0.1; 4];
        let fit = fit_line(&xs, &ys, &us).unwrap();
        assert!(fit.weighted);
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        // 1/Sxx_w with Sxx = 5 and w = 100
        assert!((fit.slope_uncertainty - (1.0f64 / 500.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn unweighted_line_uses_residual_error() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 1.1, 1.9, 3.0];
        let fit = fit_line(&xs, &ys, &[0.0; 4]).unwrap();
        assert!(!fit.weighted);
        assert!(fit.slope_uncertainty > 0.0);
        assert!(fit_line(&xs[..2], &ys[..2], &[0.0; 2]).is_err());
    }

    #[test]
    fn constant_x_is_degenerate() {
        assert!(fit_line(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0], &[0.1; 3]).is_err());
    }

    #[test]
    fn cubic_is_recovered() {
        let xs: Vec<f64> = (0..20).map(|i| f64::from(i) * 0.01).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 + 3.0 * x - 50.0 * x * x * x).collect();
        let fit = fit_polynomial(&xs, &ys, 3).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert!((fit.evaluate(*x) - y).abs() < 1e-9);
        }
        assert!((fit.slope_at(0.0) - 3.0).abs() < 1e-6);
        assert_eq!(fit.degree(), 3);
    }

    #[test]
    fn first_degree_polynomial_matches_line_fit() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = [0.1, 0.9, 2.2, 2.8, 4.1];
        let line = fit_line(&xs, &ys, &[0.0; 5]).unwrap();
        let poly = fit_polynomial(&xs, &ys, 1).unwrap();
        assert!((poly.slope_at(2.0) - line.slope).abs() < 1e-12);
        assert!((poly.evaluate(0.0) - line.intercept).abs() < 1e-12);
    }

    #[test]
    fn polynomial_needs_enough_points() {
        assert!(fit_polynomial(&[0.0, 1.0], &[0.0, 1.0], 2).is_err());
        assert!(fit_polynomial(&[1.0, 1.0, 1.0], &[0.0, 1.0, 2.0], 2).is_err());
    }
}
