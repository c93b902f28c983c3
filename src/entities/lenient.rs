//! Forgiving serde readers for hand-edited spreadsheets and legacy exports.
//!
//! Amounts arrive as numbers, numeric strings, placeholder text or null; ids
//! arrive as strings or bare numbers. These readers never fail on such input.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error as _};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
    Flag(bool),
}

/// Reads a number, a numeric string, or anything else as `0.0`.
pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Scalar::Number(n)) if n.is_finite() => n,
        Some(Scalar::Text(text)) => text
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Reads an id given as a string or a number; null and blanks read as `None`.
pub fn optional_key<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Scalar::Text(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Some(Scalar::Number(n)) => Some(format_number_key(n)),
        _ => None,
    })
}

/// Reads a required id given as a string or a number.
pub fn key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    optional_key(deserializer).map(Option::unwrap_or_default)
}

/// Reads free text, accepting numbers and null.
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Scalar::Text(text)) => text,
        Some(Scalar::Number(n)) => format_number_key(n),
        Some(Scalar::Flag(flag)) => flag.to_string(),
        None => String::new(),
    })
}

/// Parses an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS` or plain
/// date taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads a timestamp accepted by [`parse_timestamp`].
pub fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
}

// Whole numbers print without a trailing ".0" so `12` stays "12".
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
