//! Field value types used for attribute lookups and equality filters

use serde::{Deserialize, Serialize};

/// A polymorphic attribute value read from a stored record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Exact-match comparison against the textual form of a filter value.
    ///
    /// Strings compare byte for byte (no case folding, no prefix match);
    /// integers match when the filter parses to the same number.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            FieldValue::String(s) => s == value,
            FieldValue::Integer(i) => value.parse::<i64>().is_ok_and(|v| v == *i),
            FieldValue::Null => false,
        }
    }
}
