//! Report assembly for analysed samples.
//!
//! A [`ReportPayload`] carries everything a document writer needs: values
//! with uncertainties, the standard and its fingerprint, the full lineage
//! and audit history, excluded points and plot series. Rendering to PDF or
//! any other format happens outside the engine.

#![deny(unsafe_code)]

mod aggregate;
mod assemble;
mod payload;
mod series;

pub use aggregate::aggregate;
pub use assemble::{ReportOptions, Selection, assemble};
pub use payload::{
    AggregateValue, AssumptionReport, AssumptionSource, ExcludedPoint, GroupReport, PropertyValue,
    ReportPayload, SampleReport, StandardSummary,
};
pub use series::{PlotSeries, SeriesPoint};
