//! Descriptive statistics used for Type A evaluations and group summaries.
//!
//! Thin layer over `u_numflow::stats`. Inputs holding a NaN or infinity
//! are rejected up front so a single bad reading never turns into a
//! silently infinite summary.

use u_numflow::stats as numflow;

fn finite(data: &[f64]) -> Option<&[f64]> {
    data.iter().all(|x| x.is_finite()).then_some(data)
}

/// Arithmetic mean. `None` for empty or non-finite input.
pub fn mean(data: &[f64]) -> Option<f64> {
    numflow::mean(finite(data)?)
}

/// Sample variance with Bessel's correction. `None` below two values.
pub fn variance(data: &[f64]) -> Option<f64> {
    numflow::variance(finite(data)?)
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    numflow::std_dev(finite(data)?)
}

/// Median. `None` for empty or non-finite input.
pub fn median(data: &[f64]) -> Option<f64> {
    numflow::median(finite(data)?)
}

/// Scaled median absolute deviation, a robust estimate of σ.
pub fn mad_sigma(data: &[f64]) -> Option<f64> {
    let center = median(data)?;
    let deviations: Vec<f64> = data.iter().map(|x| (x - center).abs()).collect();
    median(&deviations).map(|mad| 1.4826 * mad)
}
