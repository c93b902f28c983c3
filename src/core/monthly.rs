//! Monthly series and the gauges derived from the latest month.
//!
//! The series is reference data imported with the snapshot; nothing here
//! mutates the ledger.

use crate::{
    core::{kpi::percent, parameters, period::Window},
    entities::MonthlyData,
    store::Ledger,
};
use chrono::NaiveDate;

/// How many months of net needs the cash on hand covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunwayLevel {
    /// Under 3 months
    Critical,
    /// Under 6 months
    Warning,
    /// 6 months or more
    Healthy,
}

impl RunwayLevel {
    /// Classifies a runway in months.
    #[must_use]
    pub fn of(months: f64) -> Self {
        if months < 3.0 {
            Self::Critical
        } else if months < 6.0 {
            Self::Warning
        } else {
            Self::Healthy
        }
    }
}

/// Gauges shown next to the KPIs.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyGauges {
    /// Month the gauges were computed from
    pub month: String,
    /// Planned allocations over needs, in percent
    pub coverage: f64,
    /// Share of revenues not spent, in percent
    pub savings_rate: f64,
    /// Savings target parameter
    pub savings_target: f64,
    /// Months of net needs covered by the cash on hand
    pub runway_months: f64,
    /// Classification of `runway_months`
    pub runway_level: RunwayLevel,
}

fn month_start(month: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d").ok()
}

/// Monthly records sorted by month, restricted to those whose first day falls
/// in the window.
///
/// With a window, months that do not parse are left out.
#[must_use]
pub fn monthly_series<'a>(ledger: &'a Ledger, window: Option<&Window>) -> Vec<&'a MonthlyData> {
    let mut series: Vec<&MonthlyData> = ledger
        .monthly_data
        .iter()
        .filter(|m| window.is_none_or(|w| month_start(&m.month).is_some_and(|d| w.includes(d))))
        .collect();
    series.sort_by(|a, b| a.month.cmp(&b.month));
    series
}

/// Computes the gauges from the most recent month, `None` without monthly data.
///
/// # Arguments
/// * `ledger` - The ledger to read; cash on hand and the savings target come
///   from its parameters
#[must_use]
pub fn monthly_gauges(ledger: &Ledger) -> Option<MonthlyGauges> {
    let latest = monthly_series(ledger, None).pop()?;
    let spend = latest.spend();
    let cash = parameters::cash_on_hand(ledger);
    let runway_months = if cash > 0.0 {
        cash / (latest.needs - spend).max(1.0)
    } else {
        0.0
    };

    Some(MonthlyGauges {
        month: latest.month.clone(),
        coverage: percent(latest.allocations, latest.needs),
        savings_rate: percent(latest.revenues - spend, latest.revenues),
        savings_target: parameters::savings_target(ledger),
        runway_months,
        runway_level: RunwayLevel::of(runway_months),
    })
}
