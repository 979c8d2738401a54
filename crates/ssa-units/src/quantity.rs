use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical dimension a unit measures. Several quantity kinds may share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Force,
    Length,
    Pressure,
    Ratio,
    Time,
    Area,
    Mass,
    Temperature,
}

/// Kind of quantity a value represents. Each kind has exactly one canonical unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    Force,
    Displacement,
    Length,
    Stress,
    Strain,
    Time,
    Area,
    Mass,
    Temperature,
}

impl QuantityKind {
    pub const ALL: [QuantityKind; 9] = [
        Self::Force,
        Self::Displacement,
        Self::Length,
        Self::Stress,
        Self::Strain,
        Self::Time,
        Self::Area,
        Self::Mass,
        Self::Temperature,
    ];

    pub fn dimension(self) -> Dimension {
        match self {
            Self::Force => Dimension::Force,
            Self::Displacement | Self::Length => Dimension::Length,
            Self::Stress => Dimension::Pressure,
            Self::Strain => Dimension::Ratio,
            Self::Time => Dimension::Time,
            Self::Area => Dimension::Area,
            Self::Mass => Dimension::Mass,
            Self::Temperature => Dimension::Temperature,
        }
    }

    /// Symbol of the internal unit every value of this kind is stored in.
    pub fn canonical_unit(self) -> &'static str {
        match self.dimension() {
            Dimension::Force => "N",
            Dimension::Length => "mm",
            Dimension::Pressure => "MPa",
            Dimension::Ratio => "mm/mm",
            Dimension::Time => "s",
            Dimension::Area => "mm²",
            Dimension::Mass => "g",
            Dimension::Temperature => "°C",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Force => "force",
            Self::Displacement => "displacement",
            Self::Length => "length",
            Self::Stress => "stress",
            Self::Strain => "strain",
            Self::Time => "time",
            Self::Area => "area",
            Self::Mass => "mass",
            Self::Temperature => "temperature",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Maps a column name such as "Standard force" or "Elongation" to a kind.
    pub fn from_column_name(name: &str) -> Option<Self> {
        let lowered = name.to_lowercase();
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .find_map(|token| {
                COLUMN_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == token)
                    .map(|(_, kind)| *kind)
            })
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const COLUMN_ALIASES: &[(&str, QuantityKind)] = &[
    ("force", QuantityKind::Force),
    ("load", QuantityKind::Force),
    ("charge", QuantityKind::Force),
    ("kraft", QuantityKind::Force),
    ("displacement", QuantityKind::Displacement),
    ("elongation", QuantityKind::Displacement),
    ("extension", QuantityKind::Displacement),
    ("position", QuantityKind::Displacement),
    ("deplacement", QuantityKind::Displacement),
    ("déplacement", QuantityKind::Displacement),
    ("stress", QuantityKind::Stress),
    ("contrainte", QuantityKind::Stress),
    ("strain", QuantityKind::Strain),
    ("deformation", QuantityKind::Strain),
    ("déformation", QuantityKind::Strain),
    ("time", QuantityKind::Time),
    ("temps", QuantityKind::Time),
    ("temperature", QuantityKind::Temperature),
    ("température", QuantityKind::Temperature),
    ("area", QuantityKind::Area),
    ("mass", QuantityKind::Mass),
    ("length", QuantityKind::Length),
    ("width", QuantityKind::Length),
    ("thickness", QuantityKind::Length),
    ("diameter", QuantityKind::Length),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_aliases_resolve() {
        assert_eq!(
            QuantityKind::from_column_name("Standard force"),
            Some(QuantityKind::Force)
        );
        assert_eq!(
            QuantityKind::from_column_name("Elongation"),
            Some(QuantityKind::Displacement)
        );
        assert_eq!(
            QuantityKind::from_column_name("Contrainte"),
            Some(QuantityKind::Stress)
        );
        assert_eq!(QuantityKind::from_column_name("Comment"), None);
    }

    #[test]
    fn displacement_and_length_share_millimetres() {
        assert_eq!(QuantityKind::Displacement.canonical_unit(), "mm");
        assert_eq!(QuantityKind::Length.canonical_unit(), "mm");
        assert_eq!(QuantityKind::parse(" Stress "), Some(QuantityKind::Stress));
    }
}
