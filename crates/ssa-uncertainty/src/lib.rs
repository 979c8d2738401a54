//! Uncertainty propagation for derived quantities.
//!
//! Every derived value in the engine is produced through this crate so that
//! it always carries a standard uncertainty. A NaN or negative uncertainty
//! anywhere in the inputs fails immediately instead of defaulting to zero.

#![deny(unsafe_code)]

mod budget;
mod calculus;
mod error;
mod fit;
mod measured;
mod propagate;
pub mod stats;

pub use budget::{DefaultUncertainties, EvaluationType, UncertaintyBudget, UncertaintyComponent};
pub use calculus::{DifferenceScheme, derivative, trapezoid};
pub use error::{Result, UncertaintyError};
pub use fit::{LinearFit, PolynomialFit, fit_line, fit_polynomial};
pub use measured::Measured;
pub use propagate::{
    CorrelationMatrix, Operation, PROPAGATION_RULES_VERSION, Propagation, polynomial_derivative,
    polynomial_value, propagate, propagate_correlated, propagate_detailed,
};
