//! Loosely-validated calendar dates.
//!
//! Imported data carries dates typed by hand. A date that does not parse is kept
//! verbatim so it survives export and so period filtering can include it rather
//! than hide it.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar date, or the raw text of a value that failed to parse as one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LooseDate {
    /// A well-formed date
    Valid(NaiveDate),
    /// Raw text that is not a date
    Malformed(String),
}

impl LooseDate {
    /// Parses user or file input. Blank input means "no date".
    ///
    /// Accepts `YYYY-MM-DD` and RFC 3339 timestamps (truncated to their date).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return Some(Self::Valid(date));
        }
        if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(Self::Valid(stamp.date_naive()));
        }
        // "2025-09-01T10:30:00" without an offset
        if let Some(date) = trimmed
            .get(..10)
            .filter(|_| trimmed.as_bytes().get(10) == Some(&b'T'))
            .and_then(|head| NaiveDate::parse_from_str(head, DATE_FORMAT).ok())
        {
            return Some(Self::Valid(date));
        }
        Some(Self::Malformed(trimmed.to_string()))
    }

    /// The parsed date, if well-formed.
    #[must_use]
    pub const fn valid(&self) -> Option<NaiveDate> {
        match self {
            Self::Valid(date) => Some(*date),
            Self::Malformed(_) => None,
        }
    }

    /// `YYYY-MM` bucket used for allocation months.
    #[must_use]
    pub fn month_key(&self) -> Option<String> {
        match self {
            Self::Valid(date) => Some(date.format("%Y-%m").to_string()),
            Self::Malformed(raw) => raw.get(..7).map(str::to_string),
        }
    }
}

impl From<NaiveDate> for LooseDate {
    fn from(date: NaiveDate) -> Self {
        Self::Valid(date)
    }
}

impl fmt::Display for LooseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Self::Malformed(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for LooseDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Serde adapter for `Option<LooseDate>` fields: null, missing and blank all read as `None`.
pub mod optional {
    use super::LooseDate;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Writes the date string, or null.
    pub fn serialize<S: Serializer>(
        value: &Option<LooseDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.collect_str(date),
            None => serializer.serialize_none(),
        }
    }

    /// Reads a date string, tolerating null and blanks.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<LooseDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(LooseDate::parse))
    }
}

impl<'de> Deserialize<'de> for LooseDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw).unwrap_or(Self::Malformed(raw)))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_variants() {
        let d = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(LooseDate::parse("2025-09-01"), Some(LooseDate::Valid(d)));
        assert_eq!(
            LooseDate::parse("2025-09-01T19:55:10.147Z"),
            Some(LooseDate::Valid(d))
        );
        assert_eq!(
            LooseDate::parse("2025-09-01T10:30:00"),
            Some(LooseDate::Valid(d))
        );
        assert_eq!(LooseDate::parse("   "), None);
        assert_eq!(
            LooseDate::parse("fin septembre"),
            Some(LooseDate::Malformed("fin septembre".to_string()))
        );
    }

    #[test]
    fn test_month_key() {
        assert_eq!(
            LooseDate::parse("2025-03-14").unwrap().month_key().as_deref(),
            Some("2025-03")
        );
        assert_eq!(LooseDate::Malformed("2025".into()).month_key(), None);
    }

    #[test]
    fn test_malformed_round_trips_verbatim() {
        let json = serde_json::to_string(&LooseDate::Malformed("31/02/2025".into())).unwrap();
        assert_eq!(json, "\"31/02/2025\"");
        let back: LooseDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LooseDate::Malformed("31/02/2025".into()));
    }
}
