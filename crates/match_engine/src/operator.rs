//! The ten comparison operators a leaf condition may use.

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    In,
    NotIn,
}

impl Operator {
    pub fn parse(s: &str) -> Result<Self, MatchError> {
        match s {
            "equals" => Ok(Self::Equals),
            "not_equals" => Ok(Self::NotEquals),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            "in" => Ok(Self::In),
            "not_in" => Ok(Self::NotIn),
            other => Err(MatchError::UnknownOperator(other.to_string())),
        }
    }

    /// Whether this operator requires both sides to be numeric.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::GreaterThan | Self::LessThan)
    }

    /// Whether this operator expects an array value.
    pub fn is_set_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}
