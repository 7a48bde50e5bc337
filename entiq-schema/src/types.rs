//! Scalar type definitions for the entiq metamodel.

use serde::{Deserialize, Serialize};

/// Scalar types an attribute can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Integer type (maps to INT/INTEGER).
    Int,
    /// Big integer type (maps to BIGINT).
    BigInt,
    /// Floating point type (maps to FLOAT/REAL).
    Float,
    /// Decimal type for precise calculations (maps to DECIMAL/NUMERIC).
    Decimal,
    /// String type (maps to VARCHAR/TEXT).
    String,
    /// Boolean type.
    Boolean,
    /// Date and time type.
    DateTime,
    /// JSON type.
    Json,
    /// Binary/bytes type.
    Bytes,
}

impl ScalarType {
    /// Check if this type is numeric (usable in arithmetic and SUM/AVG).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::BigInt | Self::Float | Self::Decimal
        )
    }

    /// Get a display name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::BigInt => "BigInt",
            Self::Float => "Float",
            Self::Decimal => "Decimal",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::Json => "Json",
            Self::Bytes => "Bytes",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric() {
        assert!(ScalarType::Int.is_numeric());
        assert!(ScalarType::Decimal.is_numeric());
        assert!(!ScalarType::String.is_numeric());
        assert!(!ScalarType::Boolean.is_numeric());
    }

    #[test]
    fn test_display() {
        assert_eq!(ScalarType::DateTime.to_string(), "DateTime");
    }
}
