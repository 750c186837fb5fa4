use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named quantity carried by a prediction or target batch.
///
/// The vocabulary is closed: every tensor that flows through evaluation is
/// keyed by one of these variants, and the snake_case wire names are the
/// ones used in configuration files and batch records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    Energy,
    Forces,
    Positions,
    Natoms,
    Cell,
    Pbc,
    Stress,
    IsotropicStress,
    AnisotropicStress,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown property name: '{0}'")]
pub struct ParsePropertyError(pub String);

impl Property {
    pub const ALL: [Property; 9] = [
        Property::Energy,
        Property::Forces,
        Property::Positions,
        Property::Natoms,
        Property::Cell,
        Property::Pbc,
        Property::Stress,
        Property::IsotropicStress,
        Property::AnisotropicStress,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Property::Energy => "energy",
            Property::Forces => "forces",
            Property::Positions => "positions",
            Property::Natoms => "natoms",
            Property::Cell => "cell",
            Property::Pbc => "pbc",
            Property::Stress => "stress",
            Property::IsotropicStress => "isotropic_stress",
            Property::AnisotropicStress => "anisotropic_stress",
        }
    }
}

impl FromStr for Property {
    type Err = ParsePropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| ParsePropertyError(s.to_string()))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_parses_every_wire_name() {
        for property in Property::ALL {
            assert_eq!(property.name().parse::<Property>(), Ok(property));
        }
    }

    #[test]
    fn from_str_trims_surrounding_whitespace() {
        assert_eq!(" forces ".parse::<Property>(), Ok(Property::Forces));
    }

    #[test]
    fn from_str_rejects_unknown_name() {
        let err = "charges".parse::<Property>().unwrap_err();
        assert_eq!(err, ParsePropertyError("charges".to_string()));
    }

    #[test]
    fn from_str_is_case_sensitive() {
        assert!("Energy".parse::<Property>().is_err());
    }

    #[test]
    fn display_uses_snake_case_name() {
        assert_eq!(Property::AnisotropicStress.to_string(), "anisotropic_stress");
    }
}
