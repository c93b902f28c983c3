//! Task business logic - budget lines under a project.
//!
//! A task's `allocated` total belongs to the allocation engine: edits here
//! never write it, they only re-derive `remaining` and the status from it.
//! Every mutation re-aggregates the parent project.

use crate::{
    core::{aggregate, allocation},
    entities::{AuditAction, LooseDate, ProjectId, Status, Task, TaskId},
    errors::{EntityKind, Error, Result},
    store::Ledger,
};
use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use tracing::{debug, info};

/// User-supplied fields of a task.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDraft {
    /// Display name
    pub name: String,
    /// Budget category
    pub category: String,
    /// Kiyosaki classification
    pub kiyosaki_type: String,
    /// Who benefits
    pub beneficiary: String,
    /// Priority label
    pub priority: String,
    /// Budget for this line
    pub budget: f64,
    /// Completion percentage, 0-100
    pub progress: f64,
    /// Lifecycle status
    pub status: Status,
    /// Probability of success, 0-100
    pub probability: f64,
    /// Expected ROI in percent
    pub roi: f64,
    /// Planned start
    pub start_date: Option<LooseDate>,
    /// Planned end
    pub end_date: Option<LooseDate>,
    /// Person in charge
    pub responsible: String,
    /// Task this one waits on
    pub dependency: Option<String>,
    /// Free-form notes
    pub notes: String,
}

impl TaskDraft {
    /// A draft with a name and a budget.
    #[must_use]
    pub fn new(name: impl Into<String>, budget: f64) -> Self {
        Self {
            name: name.into(),
            budget,
            ..Self::default()
        }
    }
}

/// Checks the fields shared by projects and tasks.
pub(crate) fn validate_plan(name: &str, budget: f64, probability: f64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("name cannot be empty"));
    }
    if !budget.is_finite() || budget < 0.0 {
        return Err(Error::validation(format!(
            "budget must be a non-negative number, got {budget}"
        )));
    }
    if !(0.0..=100.0).contains(&probability) {
        return Err(Error::validation(format!(
            "probability must be between 0 and 100, got {probability}"
        )));
    }
    Ok(())
}

fn validate_draft(draft: &TaskDraft) -> Result<()> {
    validate_plan(&draft.name, draft.budget, draft.probability)?;
    if !(0.0..=100.0).contains(&draft.progress) {
        return Err(Error::validation(format!(
            "progress must be between 0 and 100, got {}",
            draft.progress
        )));
    }
    Ok(())
}

fn write_fields(task: &mut Task, draft: TaskDraft) {
    task.name = draft.name.trim().to_string();
    task.category = draft.category;
    task.kiyosaki_type = draft.kiyosaki_type;
    task.beneficiary = draft.beneficiary;
    task.priority = draft.priority;
    task.budget = draft.budget;
    task.progress = draft.progress;
    task.status = draft.status;
    task.probability = draft.probability;
    task.roi = draft.roi;
    task.start_date = draft.start_date;
    task.end_date = draft.end_date;
    task.responsible = draft.responsible;
    task.dependency = draft.dependency;
    task.notes = draft.notes;
}

/// Promotes the status from the funded ratio: fully funded is done, partly
/// funded and still planned is in progress.
fn promote_status(task: &mut Task) {
    if task.budget <= 0.0 {
        return;
    }
    let ratio = task.allocated / task.budget;
    if ratio >= 1.0 {
        task.status = Status::Done;
    } else if ratio > 0.0 && task.status == Status::Planned {
        task.status = Status::InProgress;
    }
}

/// Creates a task under `project_id` with nothing allocated.
///
/// # Arguments
/// * `ledger` - The ledger to update
/// * `project_id` - Parent project
/// * `draft` - Authored fields of the new task
pub fn create_task(ledger: &mut Ledger, project_id: ProjectId, draft: TaskDraft) -> Result<Task> {
    validate_draft(&draft)?;
    if ledger.project(project_id).is_none() {
        return Err(Error::not_found(EntityKind::Project, project_id));
    }

    let mut task = Task {
        id: ledger.next_task_id(project_id),
        name: String::new(),
        category: String::new(),
        kiyosaki_type: String::new(),
        beneficiary: String::new(),
        priority: String::new(),
        budget: 0.0,
        allocated: 0.0,
        remaining: 0.0,
        progress: 0.0,
        status: Status::Planned,
        probability: 0.0,
        roi: 0.0,
        start_date: None,
        end_date: None,
        realized_date: None,
        responsible: String::new(),
        dependency: None,
        notes: String::new(),
    };
    write_fields(&mut task, draft);
    task.refresh_remaining();
    ledger.tasks.push(task.clone());
    aggregate::aggregate_project(ledger, project_id)?;

    debug!(id = %task.id, project = %project_id, budget = task.budget, "task created");
    ledger.record(AuditAction::Create, EntityKind::Task, task.id, task.name.clone());
    Ok(task)
}

/// Overwrites a task's authored fields and re-derives remaining and status.
pub fn edit_task(ledger: &mut Ledger, id: TaskId, draft: TaskDraft) -> Result<Task> {
    validate_draft(&draft)?;
    let task = ledger.task_mut(id)?;
    write_fields(task, draft);
    task.refresh_remaining();
    promote_status(task);
    let task = task.clone();
    aggregate::aggregate_project(ledger, id.project_id())?;

    debug!(id = %id, "task edited");
    ledger.record(AuditAction::Update, EntityKind::Task, id, task.name.clone());
    Ok(task)
}

/// Deletes a task and its allocations, giving their amounts back to the sources.
pub fn delete_task(ledger: &mut Ledger, id: TaskId) -> Result<Task> {
    let index = ledger
        .tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| Error::not_found(EntityKind::Task, id))?;
    allocation::remove_allocations_where(ledger, |a| a.task_id == id)?;
    let task = ledger.tasks.remove(index);

    let parent = id.project_id();
    if ledger.project(parent).is_some() {
        aggregate::clear_rollup(ledger, parent)?;
        aggregate::aggregate_project(ledger, parent)?;
    }

    info!(id = %id, "task deleted");
    ledger.record(AuditAction::Delete, EntityKind::Task, id, task.name.clone());
    Ok(task)
}

/// Sum of realised amounts allocated to a task.
#[must_use]
pub fn actual_used(ledger: &Ledger, id: TaskId) -> f64 {
    ledger.allocations_of_task(id).map(|a| a.actual).sum()
}

/// Whole months from `from` to `to`, counting both ends, at least 1.
fn months_inclusive(from: NaiveDate, to: NaiveDate) -> i64 {
    let mut months = i64::from(to.year() - from.year()) * 12
        + i64::from(to.month()) - i64::from(from.month());
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) + 1
}

/// Amount still to spend each month to finish the task on time.
///
/// Spreads `budget - actual_used` (floored at 0) over the months left until
/// the task's end date, rounding up. Without a valid end date the whole
/// remainder is due this month.
///
/// # Arguments
/// * `task` - The task to plan
/// * `actual_used` - Realised spend so far, see [`actual_used`]
/// * `today` - Reference date
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn monthly_remaining(task: &Task, actual_used: f64, today: NaiveDate) -> f64 {
    let remaining = (task.budget - actual_used).max(0.0);
    let months = task
        .end_date
        .as_ref()
        .and_then(LooseDate::valid)
        .map_or(1, |end| months_inclusive(today, end));
    (remaining / months as f64).ceil()
}

/// Orders tasks for display: unfinished first, then most recent start date.
///
/// Tasks without a valid start date sort as the oldest.
pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        let a_done = a.status == Status::Done;
        let b_done = b.status == Status::Done;
        match (a_done, b_done) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => {
                let start = |t: &Task| t.start_date.as_ref().and_then(LooseDate::valid);
                start(b).cmp(&start(a))
            }
        }
    });
}
