//! Declared propagation rules.
//!
//! Every rule is first order: the combined variance is `gᵀ Σ g` where `g`
//! holds the partial derivatives of the result with respect to each input
//! and `Σᵢⱼ = ρᵢⱼ uᵢ uⱼ`. Inputs are independent unless a correlation
//! matrix is supplied.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, UncertaintyError};
use crate::fit::{fit_line, slope_sensitivities};
use crate::measured::Measured;

/// Version of the rule set below. Recorded by standards and reports.
pub const PROPAGATION_RULES_VERSION: &str = "first-order/1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// `Σ vᵢ`.
    Sum,
    /// `v₀ − Σ vᵢ` for `i ≥ 1`.
    Difference,
    /// `Π vᵢ`.
    Product,
    /// `v₀ / v₁`.
    Quotient,
    /// Slope of the line fitted to `(xᵢ, vᵢ)`. The inputs are the dependent
    /// values; the fit is weighted by `1/uᵢ²` when every `uᵢ > 0`. Otherwise
    /// the slope uncertainty is the residual standard error of the slope and
    /// any correlation matrix is ignored.
    LinearFitSlope { x: Vec<f64> },
    /// `p(x) = Σ aᵢ xⁱ` with inputs `[x, a₀, a₁, …]`.
    PolynomialEvaluation,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Difference => "difference",
            Self::Product => "product",
            Self::Quotient => "quotient",
            Self::LinearFitSlope { .. } => "linear_fit_slope",
            Self::PolynomialEvaluation => "polynomial_evaluation",
        }
    }
}

/// Result value, its uncertainty and the sensitivity coefficient of every input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propagation {
    pub value: f64,
    pub uncertainty: f64,
    pub sensitivities: Vec<f64>,
}

impl Propagation {
    pub fn measured(&self) -> Measured {
        Measured {
            value: self.value,
            uncertainty: self.uncertainty,
        }
    }
}

/// Symmetric correlation coefficients between inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    size: usize,
    /// Row-major `size × size` coefficients.
    values: Vec<f64>,
}

impl CorrelationMatrix {
    pub fn identity(size: usize) -> Self {
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            values[i * size + i] = 1.0;
        }
        Self { size, values }
    }

    pub fn new(size: usize, values: Vec<f64>) -> Result<Self> {
        let invalid = |reason: String| UncertaintyError::Correlation { reason };
        if values.len() != size * size {
            return Err(invalid(format!(
                "expected {} coefficients, got {}",
                size * size,
                values.len()
            )));
        }
        for i in 0..size {
            if values[i * size + i] != 1.0 {
                return Err(invalid(format!("diagonal entry {i} is not 1")));
            }
            for j in 0..size {
                let rho = values[i * size + j];
                if !(-1.0..=1.0).contains(&rho) {
                    return Err(invalid(format!("coefficient ({i}, {j}) = {rho} out of [-1, 1]")));
                }
                if rho != values[j * size + i] {
                    return Err(invalid(format!("coefficient ({i}, {j}) is not symmetric")));
                }
            }
        }
        Ok(Self { size, values })
    }

    /// Sets `ρᵢⱼ = ρⱼᵢ = rho`.
    pub fn with(mut self, i: usize, j: usize, rho: f64) -> Result<Self> {
        if i >= self.size || j >= self.size || i == j || !(-1.0..=1.0).contains(&rho) {
            return Err(UncertaintyError::Correlation {
                reason: format!("cannot set coefficient ({i}, {j}) to {rho}"),
            });
        }
        self.values[i * self.size + j] = rho;
        self.values[j * self.size + i] = rho;
        Ok(self)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }
}

/// Propagates independent inputs through `operation`.
pub fn propagate(inputs: &[(f64, f64)], operation: &Operation) -> Result<(f64, f64)> {
    propagate_detailed(inputs, operation, None).map(|p| (p.value, p.uncertainty))
}

/// Propagates correlated inputs through `operation`.
pub fn propagate_correlated(
    inputs: &[(f64, f64)],
    operation: &Operation,
    correlation: &CorrelationMatrix,
) -> Result<(f64, f64)> {
    propagate_detailed(inputs, operation, Some(correlation)).map(|p| (p.value, p.uncertainty))
}

pub fn propagate_detailed(
    inputs: &[(f64, f64)],
    operation: &Operation,
    correlation: Option<&CorrelationMatrix>,
) -> Result<Propagation> {
    let name = operation.name();
    for (idx, &(value, uncertainty)) in inputs.iter().enumerate() {
        Measured { value, uncertainty }.check(&format!("input {idx}"), name)?;
    }
    if let Some(matrix) = correlation
        && matrix.size() != inputs.len()
    {
        return Err(UncertaintyError::Correlation {
            reason: format!(
                "matrix covers {} inputs but {} were supplied",
                matrix.size(),
                inputs.len()
            ),
        });
    }

    let values: Vec<f64> = inputs.iter().map(|(v, _)| *v).collect();
    let weights: Option<Vec<f64>> = inputs
        .iter()
        .all(|(_, u)| *u > 0.0)
        .then(|| inputs.iter().map(|(_, u)| 1.0 / (u * u)).collect());
    let (value, sensitivities) = evaluate(&values, weights.as_deref(), operation)?;

    let mut variance = 0.0;
    for (i, (&gi, &(_, ui))) in sensitivities.iter().zip(inputs).enumerate() {
        match correlation {
            None => variance += (gi * ui) * (gi * ui),
            Some(matrix) => {
                for (j, (&gj, &(_, uj))) in sensitivities.iter().zip(inputs).enumerate() {
                    variance += gi * gj * matrix.get(i, j) * ui * uj;
                }
            }
        }
    }
    // Strong negative correlation can round a zero variance below zero.
    let mut uncertainty = variance.max(0.0).sqrt();
    if let Operation::LinearFitSlope { x } = operation
        && weights.is_none()
    {
        // Residual standard error of the slope, as in `fit_line`.
        let us: Vec<f64> = inputs.iter().map(|(_, u)| *u).collect();
        uncertainty = fit_line(x, &values, &us)?.slope_uncertainty;
    }

    let result = Measured { value, uncertainty };
    result.check("result", name)?;
    trace!(operation = name, value, uncertainty, "propagated");
    Ok(Propagation {
        value,
        uncertainty,
        sensitivities,
    })
}

fn arity(operation: &Operation, expected: &'static str, actual: usize) -> UncertaintyError {
    UncertaintyError::Arity {
        operation: operation.name(),
        expected,
        actual,
    }
}

/// Result value and partial derivatives for each input.
///
/// `weights` are `1/uᵢ²` when every input has a non-zero uncertainty; only
/// the fitted slope uses them.
fn evaluate(
    values: &[f64],
    weights: Option<&[f64]>,
    operation: &Operation,
) -> Result<(f64, Vec<f64>)> {
    let n = values.len();
    match operation {
        Operation::Sum => {
            if n == 0 {
                return Err(arity(operation, "at least 1", n));
            }
            Ok((values.iter().sum(), vec![1.0; n]))
        }
        Operation::Difference => {
            let Some((first, rest)) = values.split_first() else {
                return Err(arity(operation, "at least 1", n));
            };
            let mut g = vec![-1.0; n];
            g[0] = 1.0;
            Ok((first - rest.iter().sum::<f64>(), g))
        }
        Operation::Product => {
            if n == 0 {
                return Err(arity(operation, "at least 1", n));
            }
            let g = (0..n)
                .map(|i| {
                    values
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, v)| v)
                        .product::<f64>()
                })
                .collect();
            Ok((values.iter().product(), g))
        }
        Operation::Quotient => {
            let [a, b] = values else {
                return Err(arity(operation, "2", n));
            };
            if *b == 0.0 {
                return Err(UncertaintyError::DivisionByZero {
                    operation: operation.name(),
                });
            }
            Ok((a / b, vec![1.0 / b, -a / (b * b)]))
        }
        Operation::LinearFitSlope { x } => {
            if x.len() != n {
                return Err(arity(operation, "one per x value", n));
            }
            let g = slope_sensitivities(x, weights)?;
            let slope = g.iter().zip(values).map(|(gi, yi)| gi * yi).sum();
            Ok((slope, g))
        }
        Operation::PolynomialEvaluation => {
            let Some((&x, coefficients)) = values.split_first() else {
                return Err(arity(operation, "x plus at least 1 coefficient", n));
            };
            if coefficients.is_empty() {
                return Err(arity(operation, "x plus at least 1 coefficient", n));
            }
            let mut g = Vec::with_capacity(n);
            g.push(polynomial_derivative(coefficients, x));
            let mut power = 1.0;
            for _ in coefficients {
                g.push(power);
                power *= x;
            }
            Ok((polynomial_value(coefficients, x), g))
        }
    }
}

/// Horner evaluation of `Σ aᵢ xⁱ`.
pub fn polynomial_value(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, a| acc * x + a)
}

pub fn polynomial_derivative(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .skip(1)
        .rev()
        .fold(0.0, |acc, (i, a)| acc * x + i as f64 * a)
}
