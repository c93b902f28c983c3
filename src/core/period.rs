//! Period filtering.
//!
//! A filter selection (month, year or explicit range) resolves to a closed date
//! window. Membership tests fail open: records with no date or an unreadable
//! date are kept, so bad legacy data shows up instead of silently vanishing.

use crate::{
    entities::{Allocation, LooseDate},
    errors::{Error, Result},
};
use chrono::{Datelike, Months, NaiveDate};
use serde::Deserialize;
use std::str::FromStr;

/// Closed date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First day included
    pub start: NaiveDate,
    /// Last day included
    pub end: NaiveDate,
}

impl Window {
    /// Builds a window, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::validation(format!(
                "period start {start} is after its end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month containing `year`/`month`.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| Error::validation(format!("invalid month {year}-{month:02}")))?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| Error::validation(format!("month {year}-{month:02} out of range")))?;
        Ok(Self { start, end })
    }

    /// January 1 to December 31 of `year`.
    pub fn year(year: i32) -> Result<Self> {
        match (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(Error::validation(format!("year {year} out of range"))),
        }
    }

    /// The quarter (1-4) of `year`.
    fn quarter(year: i32, quarter: u32) -> Result<Self> {
        let first = Self::month(year, (quarter - 1) * 3 + 1)?;
        let last = Self::month(year, quarter * 3)?;
        Ok(Self {
            start: first.start,
            end: last.end,
        })
    }

    /// Whether `date` falls inside the window.
    #[must_use]
    pub fn includes(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// What the user picked in the filter bar. Blank fields count as unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FilterSelection {
    /// `YYYY-MM`
    #[serde(default)]
    pub month: Option<String>,
    /// `YYYY`
    #[serde(default)]
    pub year: Option<String>,
    /// Explicit range start, `YYYY-MM-DD`
    #[serde(default)]
    pub start_date: Option<String>,
    /// Explicit range end, `YYYY-MM-DD`
    #[serde(default)]
    pub end_date: Option<String>,
}

fn present(field: Option<&String>) -> Option<&str> {
    field.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

fn parse_month(raw: &str) -> Result<Window> {
    let invalid = || Error::validation(format!("invalid month '{raw}', expected YYYY-MM"));
    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    Window::month(year, month).map_err(|_| invalid())
}

fn parse_year(raw: &str) -> Result<Window> {
    let invalid = || Error::validation(format!("invalid year '{raw}', expected YYYY"));
    if raw.len() != 4 {
        return Err(invalid());
    }
    let year = raw.parse::<i32>().map_err(|_| invalid())?;
    Window::year(year)
}

impl FilterSelection {
    /// Resolves the selection to a window; `None` means "no filtering".
    ///
    /// An explicit range wins over a month, which wins over a year. A range
    /// needs both ends.
    pub fn window(&self) -> Result<Option<Window>> {
        match (
            present(self.start_date.as_ref()),
            present(self.end_date.as_ref()),
        ) {
            (Some(start), Some(end)) => {
                return Window::new(parse_day(start)?, parse_day(end)?).map(Some);
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::validation(
                    "a date range needs both a start and an end date",
                ));
            }
            (None, None) => {}
        }
        if let Some(month) = present(self.month.as_ref()) {
            return parse_month(month).map(Some);
        }
        if let Some(year) = present(self.year.as_ref()) {
            return parse_year(year).map(Some);
        }
        Ok(None)
    }
}

/// Preset ranges relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickRange {
    /// Current calendar month
    ThisMonth,
    /// Previous calendar month
    LastMonth,
    /// Current calendar quarter
    ThisQuarter,
    /// Previous calendar quarter, Q4 of last year when in Q1
    LastQuarter,
    /// Current calendar year
    ThisYear,
    /// Previous calendar year
    LastYear,
}

impl QuickRange {
    /// The window this preset covers as of `today`.
    pub fn window(self, today: NaiveDate) -> Result<Window> {
        let year = today.year();
        let quarter = (today.month() - 1) / 3 + 1;
        match self {
            Self::ThisMonth => Window::month(year, today.month()),
            Self::LastMonth => {
                let previous = today
                    .with_day(1)
                    .and_then(|first| first.checked_sub_months(Months::new(1)))
                    .ok_or_else(|| Error::validation("no month before the first supported date"))?;
                Window::month(previous.year(), previous.month())
            }
            Self::ThisQuarter => Window::quarter(year, quarter),
            Self::LastQuarter if quarter == 1 => Window::quarter(year - 1, 4),
            Self::LastQuarter => Window::quarter(year, quarter - 1),
            Self::ThisYear => Window::year(year),
            Self::LastYear => Window::year(year - 1),
        }
    }
}

impl FromStr for QuickRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "this-month" => Ok(Self::ThisMonth),
            "last-month" => Ok(Self::LastMonth),
            "this-quarter" => Ok(Self::ThisQuarter),
            "last-quarter" => Ok(Self::LastQuarter),
            "this-year" => Ok(Self::ThisYear),
            "last-year" => Ok(Self::LastYear),
            other => Err(Error::validation(format!("unknown quick range '{other}'"))),
        }
    }
}

/// Interval overlap with fail-open rules.
///
/// A missing bound takes the other bound's value; with both missing, or with
/// any unreadable date, the record is included.
#[must_use]
pub fn overlaps(start: Option<&LooseDate>, end: Option<&LooseDate>, window: &Window) -> bool {
    let (start, end) = match (start, end) {
        (None, None) => return true,
        (Some(s), None) => (s, s),
        (None, Some(e)) => (e, e),
        (Some(s), Some(e)) => (s, e),
    };
    match (start.valid(), end.valid()) {
        (Some(start), Some(end)) => start <= window.end && end >= window.start,
        _ => true,
    }
}

/// Point membership with the same fail-open rules as [`overlaps`].
#[must_use]
pub fn contains(date: Option<&LooseDate>, window: &Window) -> bool {
    match date.map(LooseDate::valid) {
        Some(Some(date)) => window.includes(date),
        _ => true,
    }
}

/// Date placing an allocation in a period: planned, else actual, else the
/// first day of its month.
#[must_use]
pub fn allocation_date(allocation: &Allocation) -> Option<LooseDate> {
    allocation.effective_date().cloned().or_else(|| {
        allocation
            .month
            .as_deref()
            .and_then(|month| LooseDate::parse(&format!("{month}-01")))
    })
}

/// Whether an allocation belongs to the window, failing open.
#[must_use]
pub fn allocation_in_window(allocation: &Allocation, window: &Window) -> bool {
    contains(allocation_date(allocation).as_ref(), window)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn selection(month: &str, year: &str, start: &str, end: &str) -> FilterSelection {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        FilterSelection {
            month: opt(month),
            year: opt(year),
            start_date: opt(start),
            end_date: opt(end),
        }
    }

    #[test]
    fn test_precedence() -> Result<()> {
        let w = selection("2025-02", "2024", "2025-05-01", "2025-05-10").window()?;
        assert_eq!(w, Some(Window::new(day("2025-05-01"), day("2025-05-10"))?));

        let w = selection("2024-02", "2023", "", "").window()?.unwrap();
        assert_eq!(w.start, day("2024-02-01"));
        assert_eq!(w.end, day("2024-02-29"));

        let w = selection("", "2023", "", "").window()?.unwrap();
        assert_eq!(w.end, day("2023-12-31"));

        assert_eq!(FilterSelection::default().window()?, None);
        assert_eq!(selection(" ", "", "", "").window()?, None);
        Ok(())
    }

    #[test]
    fn test_invalid_selections() {
        assert!(selection("2025-13", "", "", "").window().is_err());
        assert!(selection("25-01", "", "", "").window().is_err());
        assert!(selection("", "twenty", "", "").window().is_err());
        assert!(selection("", "", "2025-05-10", "2025-05-01").window().is_err());
        assert!(selection("", "", "2025-05-10", "").window().is_err());
        assert!(selection("", "", "10/05/2025", "2025-06-01").window().is_err());
    }

    #[test]
    fn test_quick_ranges() -> Result<()> {
        let today = day("2025-02-14");
        assert_eq!(
            QuickRange::LastMonth.window(today)?,
            Window::new(day("2025-01-01"), day("2025-01-31"))?
        );
        assert_eq!(
            QuickRange::ThisQuarter.window(today)?,
            Window::new(day("2025-01-01"), day("2025-03-31"))?
        );
        assert_eq!(
            QuickRange::LastQuarter.window(today)?,
            Window::new(day("2024-10-01"), day("2024-12-31"))?
        );
        assert_eq!(
            QuickRange::LastQuarter.window(day("2025-08-01"))?,
            Window::new(day("2025-04-01"), day("2025-06-30"))?
        );
        assert_eq!(
            QuickRange::LastMonth.window(day("2025-01-31"))?,
            Window::new(day("2024-12-01"), day("2024-12-31"))?
        );
        assert_eq!("last-year".parse::<QuickRange>()?, QuickRange::LastYear);
        Ok(())
    }

    #[test]
    fn test_overlap_rules() -> Result<()> {
        let window = Window::new(day("2025-03-01"), day("2025-03-31"))?;
        let d = |raw: &str| LooseDate::parse(raw);

        assert!(overlaps(None, None, &window));
        assert!(overlaps(d("2025-02-01").as_ref(), d("2025-03-01").as_ref(), &window));
        assert!(!overlaps(d("2025-01-01").as_ref(), d("2025-02-28").as_ref(), &window));
        assert!(overlaps(None, d("2025-03-15").as_ref(), &window));
        assert!(!overlaps(d("2025-04-01").as_ref(), None, &window));
        assert!(overlaps(d("someday").as_ref(), d("2024-01-01").as_ref(), &window));
        Ok(())
    }

    #[test]
    fn test_september_window_overlap() -> Result<()> {
        let window = selection("2025-09", "", "", "").window()?.unwrap();
        let d = |raw: &str| LooseDate::parse(raw);
        assert!(overlaps(d("2025-08-15").as_ref(), d("2025-09-05").as_ref(), &window));
        assert!(!overlaps(d("2025-10-01").as_ref(), d("2025-10-31").as_ref(), &window));
        Ok(())
    }

    #[test]
    fn test_contains_fails_open() -> Result<()> {
        let window = Window::new(day("2025-03-01"), day("2025-03-31"))?;
        assert!(contains(None, &window));
        assert!(contains(LooseDate::parse("n/a").as_ref(), &window));
        assert!(contains(LooseDate::parse("2025-03-31").as_ref(), &window));
        assert!(!contains(LooseDate::parse("2025-04-01").as_ref(), &window));
        Ok(())
    }
}
