//! Unit table and the canonical conversion.
//!
//! A declared value converts to canonical units as `value * scale + offset`.
//! Only temperature units carry a non-zero offset.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnitError};
use crate::quantity::{Dimension, QuantityKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub symbol: &'static str,
    pub dimension: Dimension,
    pub scale: f64,
    pub offset: f64,
    aliases: &'static [&'static str],
}

impl UnitDef {
    const fn linear(
        symbol: &'static str,
        dimension: Dimension,
        scale: f64,
        aliases: &'static [&'static str],
    ) -> Self {
        Self {
            symbol,
            dimension,
            scale,
            offset: 0.0,
            aliases,
        }
    }

    /// Aliases are stored lower-case. Symbols are compared exactly: SI
    /// prefixes are case-significant (`MN` is not `mN`).
    fn matches_alias(&self, lowered: &str) -> bool {
        self.aliases.contains(&lowered)
    }

    pub fn to_canonical(&self, value: f64) -> f64 {
        if self.offset == 0.0 {
            value * self.scale
        } else {
            value * self.scale + self.offset
        }
    }

    pub fn from_canonical(&self, value: f64) -> f64 {
        if self.offset == 0.0 {
            value / self.scale
        } else {
            (value - self.offset) / self.scale
        }
    }
}

const LBF_IN_N: f64 = 4.448_221_615_260_5;
const PSI_IN_MPA: f64 = 0.006_894_757_293_168_361;

static UNITS: &[UnitDef] = &[
    // force
    UnitDef::linear("N", Dimension::Force, 1.0, &["n", "newton", "newtons"]),
    UnitDef::linear("kN", Dimension::Force, 1e3, &["kn", "kilonewton"]),
    UnitDef::linear("mN", Dimension::Force, 1e-3, &[]),
    UnitDef::linear("lbf", Dimension::Force, LBF_IN_N, &["lb"]),
    // length
    UnitDef::linear("mm", Dimension::Length, 1.0, &["millimeter", "millimetre"]),
    UnitDef::linear("µm", Dimension::Length, 1e-3, &["um"]),
    UnitDef::linear("cm", Dimension::Length, 10.0, &[]),
    UnitDef::linear("m", Dimension::Length, 1e3, &["meter", "metre"]),
    UnitDef::linear("in", Dimension::Length, 25.4, &["inch", "\""]),
    // pressure
    UnitDef::linear("MPa", Dimension::Pressure, 1.0, &["n/mm2", "n/mm²", "n/mm^2"]),
    UnitDef::linear("Pa", Dimension::Pressure, 1e-6, &[]),
    UnitDef::linear("kPa", Dimension::Pressure, 1e-3, &["kpa"]),
    UnitDef::linear("GPa", Dimension::Pressure, 1e3, &["gpa"]),
    UnitDef::linear("psi", Dimension::Pressure, PSI_IN_MPA, &[]),
    UnitDef::linear("ksi", Dimension::Pressure, PSI_IN_MPA * 1e3, &[]),
    // dimensionless strain
    UnitDef::linear("mm/mm", Dimension::Ratio, 1.0, &["in/in", "m/m", "-", "1", ""]),
    UnitDef::linear("%", Dimension::Ratio, 1e-2, &["percent", "pct"]),
    UnitDef::linear("µε", Dimension::Ratio, 1e-6, &["ue", "microstrain"]),
    // time
    UnitDef::linear("s", Dimension::Time, 1.0, &["sec", "second", "seconds"]),
    UnitDef::linear("ms", Dimension::Time, 1e-3, &[]),
    UnitDef::linear("min", Dimension::Time, 60.0, &[]),
    UnitDef::linear("h", Dimension::Time, 3600.0, &["hr", "hour"]),
    // area
    UnitDef::linear("mm²", Dimension::Area, 1.0, &["mm2", "mm^2"]),
    UnitDef::linear("cm²", Dimension::Area, 1e2, &["cm2", "cm^2"]),
    UnitDef::linear("m²", Dimension::Area, 1e6, &["m2", "m^2"]),
    UnitDef::linear("in²", Dimension::Area, 645.16, &["in2", "in^2"]),
    // mass
    UnitDef::linear("g", Dimension::Mass, 1.0, &["gram"]),
    UnitDef::linear("mg", Dimension::Mass, 1e-3, &[]),
    UnitDef::linear("kg", Dimension::Mass, 1e3, &[]),
    // temperature
    UnitDef::linear("°C", Dimension::Temperature, 1.0, &["degc", "c", "celsius"]),
    UnitDef {
        symbol: "K",
        dimension: Dimension::Temperature,
        scale: 1.0,
        offset: -273.15,
        aliases: &["kelvin"],
    },
    UnitDef {
        symbol: "°F",
        dimension: Dimension::Temperature,
        scale: 5.0 / 9.0,
        offset: -32.0 * 5.0 / 9.0,
        aliases: &["degf", "f", "fahrenheit"],
    },
];

/// Finds a unit by exact symbol, or by alias ignoring case.
pub fn lookup(symbol: &str) -> Option<&'static UnitDef> {
    let symbol = symbol.trim();
    let lowered = symbol.to_lowercase();
    UNITS
        .iter()
        .find(|unit| unit.symbol == symbol)
        .or_else(|| UNITS.iter().find(|unit| unit.matches_alias(&lowered)))
}

/// Resolves `declared_unit` for `quantity`, rejecting units of another dimension.
pub fn resolve(declared_unit: &str, quantity: QuantityKind) -> Result<&'static UnitDef> {
    let unit = lookup(declared_unit).ok_or_else(|| UnitError::UnknownUnit {
        unit: declared_unit.to_string(),
        quantity,
    })?;
    if unit.dimension != quantity.dimension() {
        return Err(UnitError::Incompatible {
            unit: declared_unit.to_string(),
            quantity,
            canonical: quantity.canonical_unit(),
        });
    }
    Ok(unit)
}

/// Converts a declared value to the canonical unit of `quantity`.
pub fn normalize(value: f64, declared_unit: &str, quantity: QuantityKind) -> Result<f64> {
    if !value.is_finite() {
        return Err(UnitError::NonFinite { value, quantity });
    }
    Ok(resolve(declared_unit, quantity)?.to_canonical(value))
}

/// Converts a standard uncertainty. Offsets do not apply to differences.
pub fn normalize_uncertainty(
    uncertainty: f64,
    declared_unit: &str,
    quantity: QuantityKind,
) -> Result<f64> {
    if !uncertainty.is_finite() || uncertainty < 0.0 {
        return Err(UnitError::InvalidUncertainty {
            spec: uncertainty.to_string(),
            reason: "must be finite and non-negative",
        });
    }
    Ok(uncertainty * resolve(declared_unit, quantity)?.scale)
}

/// Conversion from canonical values to a display unit.
///
/// Lives at the presentation boundary: the engine never stores display values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConversion {
    pub quantity: QuantityKind,
    pub canonical_unit: String,
    pub display_unit: String,
    /// Display value = (canonical - offset) / scale.
    pub scale: f64,
    pub offset: f64,
}

impl DisplayConversion {
    pub fn new(quantity: QuantityKind, display_unit: &str) -> Result<Self> {
        let unit = resolve(display_unit, quantity)?;
        Ok(Self {
            quantity,
            canonical_unit: quantity.canonical_unit().to_string(),
            display_unit: unit.symbol.to_string(),
            scale: unit.scale,
            offset: unit.offset,
        })
    }

    pub fn identity(quantity: QuantityKind) -> Self {
        Self {
            quantity,
            canonical_unit: quantity.canonical_unit().to_string(),
            display_unit: quantity.canonical_unit().to_string(),
            scale: 1.0,
            offset: 0.0,
        }
    }

    pub fn value(&self, canonical: f64) -> f64 {
        (canonical - self.offset) / self.scale
    }

    pub fn uncertainty(&self, canonical: f64) -> f64 {
        canonical / self.scale
    }
}

/// Inverse of [`normalize`] for a single value.
pub fn to_display(canonical: f64, display_unit: &str, quantity: QuantityKind) -> Result<f64> {
    Ok(resolve(display_unit, quantity)?.from_canonical(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kilonewtons_become_newtons() {
        assert_eq!(normalize(2.5, "kN", QuantityKind::Force).unwrap(), 2500.0);
        assert_eq!(normalize(3.0, "N", QuantityKind::Force).unwrap(), 3.0);
    }

    #[test]
    fn percent_strain_is_dimensionless() {
        let strain = normalize(0.2, "%", QuantityKind::Strain).unwrap();
        assert!((strain - 0.002).abs() < 1e-15);
    }

    #[test]
    fn kelvin_is_affine() {
        let celsius = normalize(293.15, "K", QuantityKind::Temperature).unwrap();
        assert!((celsius - 20.0).abs() < 1e-9);
        let u = normalize_uncertainty(0.5, "K", QuantityKind::Temperature).unwrap();
        assert_eq!(u, 0.5);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let err = normalize(1.0, "mm", QuantityKind::Force).unwrap_err();
        assert_eq!(
            err,
            UnitError::Incompatible {
                unit: "mm".to_string(),
                quantity: QuantityKind::Force,
                canonical: "N",
            }
        );
    }

    #[test]
    fn unknown_unit_is_rejected() {
        assert!(matches!(
            normalize(1.0, "furlong", QuantityKind::Length),
            Err(UnitError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn display_conversion_inverts_normalization() {
        let conversion = DisplayConversion::new(QuantityKind::Stress, "GPa").unwrap();
        assert_eq!(conversion.display_unit, "GPa");
        assert_eq!(conversion.value(2000.0), 2.0);
        assert_eq!(conversion.uncertainty(10.0), 0.01);
    }

    #[test]
    fn pressure_aliases() {
        assert_eq!(lookup("N/mm2").map(|u| u.symbol), Some("MPa"));
        assert_eq!(lookup("KN").map(|u| u.symbol), Some("kN"));
        assert_eq!(lookup("gpa").map(|u| u.symbol), Some("GPa"));
        // Could be MPa or mPa.
        assert!(lookup("mpa").is_none());
    }

    #[test]
    fn prefixes_are_case_significant() {
        for (unit, kind) in [
            ("MN", QuantityKind::Force),
            ("Mg", QuantityKind::Mass),
            ("Mm", QuantityKind::Length),
            ("MS", QuantityKind::Time),
        ] {
            assert!(
                matches!(normalize(1.0, unit, kind), Err(UnitError::UnknownUnit { .. })),
                "{unit} must not fold onto a milli unit"
            );
        }
        assert_eq!(normalize(1.0, "mN", QuantityKind::Force).unwrap(), 1e-3);
        assert_eq!(normalize(1.0, "mg", QuantityKind::Mass).unwrap(), 1e-3);
    }
}
