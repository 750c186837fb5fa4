use crate::core::models::property::Property;
use std::fmt;
use thiserror::Error;

/// Which half of an evaluation pair a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Prediction,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Prediction => f.write_str("prediction"),
            Side::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("Property '{property}' is missing from the {side} batch")]
    MissingKey { property: Property, side: Side },

    #[error("Shape mismatch for '{property}': expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        property: Property,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Count mismatch in {context}: expected {expected}, found {found}")]
    CountMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid shape for '{property}': {reason}")]
    InvalidShape { property: Property, reason: String },

    #[error("Invalid value for '{property}': {reason}")]
    InvalidValue { property: Property, reason: String },

    #[error("Unit cell of structure {structure} is singular")]
    SingularCell { structure: usize },
}
