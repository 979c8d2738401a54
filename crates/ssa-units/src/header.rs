//! Column header parsing: "Force (kN)", "Displacement [mm]", "Time s".

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::quantity::QuantityKind;
use crate::registry::lookup;

static BRACKETED_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)\s*[\(\[](?P<unit>[^\)\]]{0,12})[\)\]]\s*$")
        .expect("Invalid bracketed header unit regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnHeader {
    pub name: String,
    /// Unit symbol as written in the header, if any.
    pub unit: Option<String>,
    pub quantity: Option<QuantityKind>,
}

impl ColumnHeader {
    /// Unit to use for conversion: the declared one or the canonical default.
    pub fn unit_or_canonical(&self) -> Option<&str> {
        match (&self.unit, self.quantity) {
            (Some(unit), _) => Some(unit),
            (None, Some(kind)) => Some(kind.canonical_unit()),
            (None, None) => None,
        }
    }
}

pub fn parse_header(raw: &str) -> ColumnHeader {
    let raw = raw.trim();
    let (name, unit) = match BRACKETED_UNIT.captures(raw) {
        Some(caps) => (
            caps["name"].trim().to_string(),
            Some(caps["unit"].trim().to_string()),
        ),
        None => split_trailing_unit(raw),
    };
    let quantity = QuantityKind::from_column_name(&name);
    ColumnHeader {
        name,
        unit,
        quantity,
    }
}

/// "Time s" style headers: the last word is a unit only if the table knows it.
fn split_trailing_unit(raw: &str) -> (String, Option<String>) {
    if let Some((name, last)) = raw.rsplit_once(char::is_whitespace)
        && !name.trim().is_empty()
        && lookup(last).is_some()
        && QuantityKind::from_column_name(last).is_none()
    {
        return (name.trim().to_string(), Some(last.to_string()));
    }
    (raw.to_string(), None)
}
