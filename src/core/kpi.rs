//! Dashboard indicators.
//!
//! Everything here is a pure function of the ledger and an optional period
//! window. Ratios and means report 0 when their denominator is 0.

use crate::{
    core::period::{self, Window},
    entities::{Allocation, LooseDate, Project, Source, Status, Task},
    store::Ledger,
};
use chrono::NaiveDate;

/// Headline indicators of the dashboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KpiSnapshot {
    /// Tasks planned or in progress
    pub active_projects: usize,
    /// Sum of project budgets
    pub total_budget: f64,
    /// Sum of `max(planned, actual)` over the allocations in the period
    pub total_used: f64,
    /// Simple mean of task progress
    pub average_progress: f64,
    /// Available funds minus what was used
    pub net_cash_flow: f64,
    /// Sum of available funds
    pub net_worth: f64,
    /// Tasks past their end date and not done
    pub overdue_tasks: usize,
    /// Used over available, in percent
    pub savings_rate: f64,
    /// Used over total budget, in percent
    pub debt_to_income: f64,
    /// Mean project ROI
    pub avg_roi: f64,
    /// Mean task probability
    pub avg_probability: f64,
    /// Projects marked done
    pub project_velocity: usize,
}

/// Funding totals over the sources in the period.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceTotals {
    /// Sum of available funds
    pub available: f64,
    /// Allocations drawn on those sources in the period
    pub allocated: f64,
    /// `available - allocated`
    pub remaining: f64,
    /// `allocated / available * 100`
    pub rate: f64,
    /// Split between the period and what came before it, when filtering
    pub breakdown: Option<PeriodBreakdown>,
}

/// Funds dated inside the window versus before it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodBreakdown {
    /// Available funds dated inside the window
    pub available_this_period: f64,
    /// Allocations dated inside the window
    pub allocated_this_period: f64,
    /// `available - allocated` inside the window, floored at 0
    pub remaining_this_period: f64,
    /// Available funds dated before the window
    pub available_previous: f64,
    /// Allocations dated before the window
    pub allocated_previous: f64,
    /// `available - allocated` before the window, floored at 0
    pub remaining_previous: f64,
}

/// The records that fall in a window.
pub(crate) struct View<'a> {
    pub(crate) projects: Vec<&'a Project>,
    pub(crate) tasks: Vec<&'a Task>,
    pub(crate) sources: Vec<&'a Source>,
    pub(crate) allocations: Vec<&'a Allocation>,
}

impl<'a> View<'a> {
    pub(crate) fn new(ledger: &'a Ledger, window: Option<&Window>) -> Self {
        let Some(window) = window else {
            return Self {
                projects: ledger.projects.iter().collect(),
                tasks: ledger.tasks.iter().collect(),
                sources: ledger.sources.iter().collect(),
                allocations: ledger.allocations.iter().collect(),
            };
        };
        Self {
            projects: ledger
                .projects
                .iter()
                .filter(|p| period::overlaps(p.start_date.as_ref(), p.end_date.as_ref(), window))
                .collect(),
            tasks: ledger
                .tasks
                .iter()
                .filter(|t| period::overlaps(t.start_date.as_ref(), t.end_date.as_ref(), window))
                .collect(),
            sources: ledger
                .sources
                .iter()
                .filter(|s| period::contains(s.availability_date.as_ref(), window))
                .collect(),
            allocations: ledger
                .allocations
                .iter()
                .filter(|a| period::allocation_in_window(a, window))
                .collect(),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let count = values.len();
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}

pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Computes the dashboard indicators.
///
/// # Arguments
/// * `ledger` - The ledger to read
/// * `window` - Period to restrict to, `None` for everything
/// * `today` - Reference date for overdue tasks
#[must_use]
pub fn compute_kpis(ledger: &Ledger, window: Option<&Window>, today: NaiveDate) -> KpiSnapshot {
    let view = View::new(ledger, window);

    let total_budget: f64 = view.projects.iter().map(|p| p.budget).sum();
    let total_used: f64 = view.allocations.iter().map(|a| a.amount()).sum();
    let total_available: f64 = view.sources.iter().map(|s| s.available).sum();

    KpiSnapshot {
        active_projects: view.tasks.iter().filter(|t| t.status.is_active()).count(),
        total_budget,
        total_used,
        average_progress: mean(view.tasks.iter().map(|t| t.progress)),
        net_cash_flow: total_available - total_used,
        net_worth: total_available,
        overdue_tasks: view
            .tasks
            .iter()
            .filter(|t| {
                t.status != Status::Done
                    && t.end_date
                        .as_ref()
                        .and_then(LooseDate::valid)
                        .is_some_and(|end| end < today)
            })
            .count(),
        savings_rate: percent(total_used, total_available),
        debt_to_income: percent(total_used, total_budget),
        avg_roi: mean(view.projects.iter().map(|p| p.roi)),
        avg_probability: mean(view.tasks.iter().map(|t| t.probability)),
        project_velocity: view
            .projects
            .iter()
            .filter(|p| p.status == Status::Done)
            .count(),
    }
}

/// Computes funding totals over the sources available in the period.
///
/// Only allocations that fall in the period and draw on an included source are
/// counted. With a window, the breakdown compares the period with everything
/// dated before it.
#[must_use]
pub fn compute_source_totals(ledger: &Ledger, window: Option<&Window>) -> SourceTotals {
    let view = View::new(ledger, window);
    let available: f64 = view.sources.iter().map(|s| s.available).sum();
    let allocated: f64 = view
        .allocations
        .iter()
        .filter(|a| view.sources.iter().any(|s| s.id == a.source_id))
        .map(|a| a.amount())
        .sum();

    SourceTotals {
        available,
        allocated,
        remaining: available - allocated,
        rate: percent(allocated, available),
        breakdown: window.map(|w| breakdown(ledger, w)),
    }
}

fn breakdown(ledger: &Ledger, window: &Window) -> PeriodBreakdown {
    let mut split = PeriodBreakdown::default();
    for source in &ledger.sources {
        if let Some(date) = source.availability_date.as_ref().and_then(LooseDate::valid) {
            if window.includes(date) {
                split.available_this_period += source.available;
            } else if date < window.start {
                split.available_previous += source.available;
            }
        }
    }
    for allocation in &ledger.allocations {
        if let Some(date) = period::allocation_date(allocation).and_then(|d| d.valid()) {
            if window.includes(date) {
                split.allocated_this_period += allocation.amount();
            } else if date < window.start {
                split.allocated_previous += allocation.amount();
            }
        }
    }
    split.remaining_this_period =
        (split.available_this_period - split.allocated_this_period).max(0.0);
    split.remaining_previous = (split.available_previous - split.allocated_previous).max(0.0);
    split
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::errors::Result;
    use crate::test_utils::*;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_empty_ledger_reports_zeros() {
        let ledger = setup_ledger();
        let kpis = compute_kpis(&ledger, None, day("2025-01-01"));
        assert_eq!(kpis, KpiSnapshot::default());
        let totals = compute_source_totals(&ledger, None);
        assert_eq!(totals.rate, 0.0);
    }

    #[test]
    fn test_unfiltered_kpis() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(1_000_000.0, 500_000.0)?;
        create_test_allocation(&mut ledger, source, task, 200_000.0, 0.0)?;
        ledger.task_mut(task)?.progress = 40.0;
        ledger.task_mut(task)?.end_date = LooseDate::parse("2024-12-31");

        let kpis = compute_kpis(&ledger, None, day("2025-01-01"));
        assert_eq!(kpis.active_projects, 1);
        assert_eq!(kpis.total_budget, 500_000.0);
        assert_eq!(kpis.total_used, 200_000.0);
        assert_eq!(kpis.net_cash_flow, 800_000.0);
        assert_eq!(kpis.net_worth, 1_000_000.0);
        assert_eq!(kpis.savings_rate, 20.0);
        assert_eq!(kpis.debt_to_income, 40.0);
        assert_eq!(kpis.average_progress, 40.0);
        assert_eq!(kpis.avg_probability, 40.0);
        assert_eq!(kpis.overdue_tasks, 1);
        assert_eq!(kpis.project_velocity, 0);
        Ok(())
    }

    #[test]
    fn test_window_filters_allocations_and_sources() -> Result<()> {
        let (mut ledger, salary, task) = setup_funded_task(1_000.0, 10_000.0)?;
        ledger.source_mut(salary)?.availability_date = LooseDate::parse("2025-03-01");
        let bonus = create_test_source(&mut ledger, "Prime", 4_000.0)?.id;
        ledger.source_mut(bonus)?.availability_date = LooseDate::parse("2025-01-10");

        let march = create_test_allocation(&mut ledger, salary, task, 300.0, 0.0)?;
        let january = create_test_allocation(&mut ledger, bonus, task, 1_000.0, 0.0)?;
        let undated = create_test_allocation(&mut ledger, salary, task, 50.0, 0.0)?;
        for (id, date) in [(march.id, "2025-03-05"), (january.id, "2025-01-12")] {
            let a = ledger.allocations.iter_mut().find(|a| a.id == id).unwrap();
            a.planned_date = LooseDate::parse(date);
            a.refresh_derived();
        }
        assert!(ledger.allocation(undated.id).unwrap().planned_date.is_none());

        let window = Window::new(day("2025-03-01"), day("2025-03-31"))?;
        let kpis = compute_kpis(&ledger, Some(&window), day("2025-03-15"));
        // the undated allocation is kept
        assert_eq!(kpis.total_used, 350.0);
        assert_eq!(kpis.net_worth, 1_000.0);

        let totals = compute_source_totals(&ledger, Some(&window));
        assert_eq!(totals.available, 1_000.0);
        assert_eq!(totals.allocated, 350.0);
        assert_eq!(totals.remaining, 650.0);
        let split = totals.breakdown.unwrap();
        assert_eq!(split.available_this_period, 1_000.0);
        assert_eq!(split.allocated_this_period, 300.0);
        assert_eq!(split.available_previous, 4_000.0);
        assert_eq!(split.allocated_previous, 1_000.0);
        assert_eq!(split.remaining_previous, 3_000.0);
        Ok(())
    }

    #[test]
    fn test_window_filters_tasks_by_overlap() -> Result<()> {
        let mut ledger = setup_ledger();
        let project = create_test_project(&mut ledger, "Maison")?;
        let inside = create_test_task(&mut ledger, project.id, "Dedans", 100.0)?;
        let outside = create_test_task(&mut ledger, project.id, "Dehors", 100.0)?;
        create_test_task(&mut ledger, project.id, "Sans date", 100.0)?;
        ledger.task_mut(inside.id)?.start_date = LooseDate::parse("2025-02-20");
        ledger.task_mut(inside.id)?.end_date = LooseDate::parse("2025-03-10");
        ledger.task_mut(outside.id)?.start_date = LooseDate::parse("2025-05-01");

        let window = Window::new(day("2025-03-01"), day("2025-03-31"))?;
        let kpis = compute_kpis(&ledger, Some(&window), day("2025-03-01"));
        assert_eq!(kpis.active_projects, 2);
        Ok(())
    }
}
