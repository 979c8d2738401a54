//! Data cleaning pipeline.
//!
//! Every operation is a pure function from a dataset to a new dataset plus
//! an [`ssa_model::OperationRecord`]. Operations never mutate their input;
//! storing the result as a derived sample is a separate, atomic step
//! ([`apply_to_store`]).

#![deny(unsafe_code)]

mod batch;
mod error;
pub mod grouping;
mod operation;
mod outliers;
mod pipeline;
pub mod properties;
mod registry;
pub mod specimen;
mod stress_strain;
mod zeroing;

pub use batch::{BatchJob, BatchProgress, BatchReport, CancellationToken};
pub use error::{Result, TransformError};
pub use operation::CleaningOperation;
pub use outliers::OutlierFlagging;
pub use pipeline::{Pipeline, apply_to_store, verify_reproducible};
pub use properties::{MechanicalProperties, compute as compute_properties, tangent_modulus};
pub use registry::{OperationBuilder, OperationRegistry};
pub use stress_strain::StressStrain;
pub use zeroing::{Unzeroing, Zeroing};
