//! Typed key/value settings stored alongside the ledger data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a parameter as authored in the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `true` / `false`
    Bool(bool),
    /// Numeric setting
    Number(f64),
    /// Anything else, including numbers typed as text
    Text(String),
}

impl ParamValue {
    /// Truthiness: `true`, `"true"`, `1` and `"1"` are on, everything else is off.
    #[must_use]
    pub fn as_flag(&self) -> bool {
        match self {
            Self::Bool(flag) => *flag,
            Self::Number(n) => (*n - 1.0).abs() < f64::EPSILON,
            Self::Text(text) => matches!(text.trim(), "true" | "TRUE" | "True" | "1"),
        }
    }

    /// Numeric reading; text is parsed, booleans are not numbers.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(text) => text
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A named setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Grouping label, e.g. "Système"
    #[serde(default)]
    pub category: String,
    /// Setting name, e.g. `Mode_Strict_Allocations`
    pub parameter: String,
    /// Setting value
    pub value: ParamValue,
    /// What the setting controls
    #[serde(default)]
    pub description: String,
}
