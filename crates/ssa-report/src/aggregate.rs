//! Group aggregation of per-sample properties.

use std::collections::BTreeMap;

use ssa_model::Result;
use ssa_uncertainty::{EvaluationType, UncertaintyBudget, UncertaintyComponent, stats};

use crate::payload::{AggregateValue, SampleReport};

/// Aggregates every property reported by at least one member.
///
/// The uncertainty of the mean combines the members' scatter (Type A,
/// standard error of the mean) with their own propagated uncertainties
/// (Type B, `sqrt(sum u^2) / n`).
pub fn aggregate(members: &[&SampleReport]) -> Result<Vec<AggregateValue>> {
    let mut by_name: BTreeMap<&str, (&str, Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for report in members {
        for property in &report.properties {
            let entry = by_name
                .entry(property.name.as_str())
                .or_insert_with(|| (property.unit.as_str(), Vec::new(), Vec::new()));
            entry.1.push(property.value);
            entry.2.push(property.uncertainty);
        }
    }

    let mut aggregates = Vec::with_capacity(by_name.len());
    for (name, (unit, values, uncertainties)) in by_name {
        let Some(mean) = stats::mean(&values) else {
            continue;
        };
        let n = values.len();
        let std_dev = stats::std_dev(&values);
        let propagated = uncertainties.iter().map(|u| u * u).sum::<f64>().sqrt() / n as f64;
        let mut budget = UncertaintyBudget::new().with(UncertaintyComponent {
            name: format!("{name} member uncertainty"),
            evaluation: EvaluationType::B,
            standard_uncertainty: propagated,
        });
        if n >= 2 {
            budget = budget.with(UncertaintyComponent::repeatability(
                format!("{name} repeatability"),
                &values,
            )?);
        }
        aggregates.push(AggregateValue {
            name: name.to_string(),
            unit: unit.to_string(),
            n,
            mean,
            std_dev,
            combined_uncertainty: budget.combined(),
        });
    }
    Ok(aggregates)
}
