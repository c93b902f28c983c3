//! Project rollups derived from child tasks.
//!
//! [`aggregate`] is pure. [`aggregate_project`] writes the result back onto the
//! project, but only when the project has at least one task: a childless
//! project keeps its authored values.

use crate::{
    entities::{LooseDate, Project, ProjectId, Task, project::priority_rank},
    errors::{EntityKind, Error, Result},
    store::Ledger,
};
use chrono::NaiveDate;
use tracing::debug;

/// Fields of a project derived from its tasks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregates {
    /// Sum of task budgets
    pub budget: f64,
    /// Sum of task allocated totals
    pub allocated: f64,
    /// `budget - allocated`
    pub remaining: f64,
    /// Budget-weighted task progress
    pub progress: f64,
    /// Earliest valid task start date
    pub start_date: Option<NaiveDate>,
    /// Latest valid task end date
    pub end_date: Option<NaiveDate>,
    /// Most common non-empty task category
    pub category: Option<String>,
    /// Most common non-empty task beneficiary
    pub beneficiary: Option<String>,
    /// Most common non-empty task Kiyosaki type
    pub kiyosaki_type: Option<String>,
    /// Most severe task priority
    pub priority: Option<String>,
    /// Rounded mean task probability
    pub probability: f64,
    /// Mean task ROI, two decimals
    pub roi: f64,
    /// Number of tasks
    pub tasks_count: usize,
}

/// Most frequent non-empty value; ties go to the value seen first.
fn plurality<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

/// Highest-ranked known priority; ties go to the first found.
fn top_priority<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut best: Option<(&str, u8)> = None;
    for value in values {
        let rank = priority_rank(value.trim());
        if rank > 0 && best.is_none_or(|(_, top)| rank > top) {
            best = Some((value.trim(), rank));
        }
    }
    best.map(|(value, _)| value.to_string())
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes rollups over `tasks`; `stored_progress` is used when the total budget is 0.
#[must_use]
pub fn aggregate_tasks(tasks: &[&Task], stored_progress: f64) -> Aggregates {
    if tasks.is_empty() {
        return Aggregates::default();
    }
    let budget: f64 = tasks.iter().map(|t| t.budget).sum();
    let allocated: f64 = tasks.iter().map(|t| t.allocated).sum();
    let weighted: f64 = tasks.iter().map(|t| t.progress * t.budget).sum();
    let progress = if budget > 0.0 {
        weighted / budget
    } else {
        stored_progress
    };

    Aggregates {
        budget,
        allocated,
        remaining: budget - allocated,
        progress,
        start_date: tasks
            .iter()
            .filter_map(|t| t.start_date.as_ref().and_then(LooseDate::valid))
            .min(),
        end_date: tasks
            .iter()
            .filter_map(|t| t.end_date.as_ref().and_then(LooseDate::valid))
            .max(),
        category: plurality(tasks.iter().map(|t| t.category.as_str())),
        beneficiary: plurality(tasks.iter().map(|t| t.beneficiary.as_str())),
        kiyosaki_type: plurality(tasks.iter().map(|t| t.kiyosaki_type.as_str())),
        priority: top_priority(tasks.iter().map(|t| t.priority.as_str())),
        probability: mean(tasks.iter().map(|t| t.probability)).round(),
        roi: round2(mean(tasks.iter().map(|t| t.roi))),
        tasks_count: tasks.len(),
    }
}

/// Computes a project's rollups without touching the ledger.
///
/// # Arguments
/// * `ledger` - The ledger to read
/// * `project_id` - Project to aggregate
///
/// # Returns
/// Empty aggregates for a project without tasks
pub fn aggregate(ledger: &Ledger, project_id: ProjectId) -> Result<Aggregates> {
    let project = ledger
        .project(project_id)
        .ok_or_else(|| Error::not_found(EntityKind::Project, project_id))?;
    let tasks: Vec<&Task> = ledger.tasks_of(project_id).collect();
    Ok(aggregate_tasks(&tasks, project.progress))
}

/// Overwrites a project's derived fields.
pub(crate) fn apply(project: &mut Project, aggregates: &Aggregates) {
    project.budget = aggregates.budget;
    project.allocated = aggregates.allocated;
    project.remaining = aggregates.remaining;
    project.progress = aggregates.progress;
    project.start_date = aggregates.start_date.map(LooseDate::from);
    project.end_date = aggregates.end_date.map(LooseDate::from);
    project.category = aggregates.category.clone().unwrap_or_default();
    project.beneficiary = aggregates.beneficiary.clone().unwrap_or_default();
    project.kiyosaki_type = aggregates.kiyosaki_type.clone().unwrap_or_default();
    project.priority = aggregates.priority.clone().unwrap_or_default();
    project.probability = aggregates.probability;
    project.roi = aggregates.roi;
}

/// Computes a project's rollups and writes them back when it has tasks.
pub fn aggregate_project(ledger: &mut Ledger, project_id: ProjectId) -> Result<Aggregates> {
    let aggregates = aggregate(ledger, project_id)?;
    if aggregates.tasks_count > 0 {
        apply(ledger.project_mut(project_id)?, &aggregates);
        debug!(
            project = %project_id,
            budget = aggregates.budget,
            allocated = aggregates.allocated,
            "project aggregated"
        );
    }
    Ok(aggregates)
}

/// Resets a project that just lost its last task to empty rollups.
pub(crate) fn clear_rollup(ledger: &mut Ledger, project_id: ProjectId) -> Result<()> {
    if ledger.tasks_of(project_id).next().is_none() {
        apply(ledger.project_mut(project_id)?, &Aggregates::default());
        debug!(project = %project_id, "project rollup cleared");
    }
    Ok(())
}

/// Aggregates every project, in insertion order.
pub fn recalc_all(ledger: &mut Ledger) -> Result<()> {
    let ids: Vec<ProjectId> = ledger.projects.iter().map(|p| p.id).collect();
    for id in ids {
        aggregate_project(ledger, id)?;
    }
    Ok(())
}
