//! Allocation business logic - moving funds from a source to a task.
//!
//! Every operation keeps `allocated` on both sides equal to the sum of
//! `max(planned, actual)` over their allocations. Capacity is checked against
//! the cached totals before anything is mutated, so a rejected call leaves the
//! ledger exactly as it was.

use crate::{
    core::{aggregate, parameters},
    entities::{
        Allocation, AllocationId, AllocationStatus, AuditAction, LooseDate, ProjectId, SourceId,
        Status, TaskId,
    },
    errors::{CapacitySide, EntityKind, Error, Result},
    store::Ledger,
};
use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

/// User-supplied fields of an allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationDraft {
    /// Funding source
    pub source_id: SourceId,
    /// Funded task
    pub task_id: TaskId,
    /// Planned amount
    pub planned: f64,
    /// Actual amount, 0 when not yet realised
    pub actual: f64,
    /// Planned transfer date
    pub planned_date: Option<LooseDate>,
    /// Actual transfer date
    pub actual_date: Option<LooseDate>,
    /// Person in charge
    pub responsible: String,
    /// Free-form notes
    pub notes: String,
}

impl AllocationDraft {
    /// Capacity the draft would consume.
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.planned.max(self.actual)
    }
}

/// Live impact of a prospective allocation, as shown next to the entry form.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityPreview {
    /// Source allocated total with the edited allocation backed out
    pub base_allocated: f64,
    /// Source allocated total after the allocation
    pub predicted_allocated: f64,
    /// Source remaining after the allocation, floored at 0
    pub predicted_remaining: f64,
    /// Source remaining before the allocation, floored at 0
    pub source_remaining: f64,
    /// Task remaining before the allocation, floored at 0
    pub task_remaining: f64,
    /// Task remaining after the allocation, floored at 0
    pub task_predicted_remaining: f64,
    /// Source allocation rate after the allocation
    pub predicted_rate: f64,
    /// The planned or actual amount exceeds a side's remaining capacity
    pub exceeds: bool,
}

fn validate_amounts(planned: f64, actual: f64) -> Result<()> {
    for (label, value) in [("planned", planned), ("actual", actual)] {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::validation(format!(
                "{label} amount must be a non-negative number, got {value}"
            )));
        }
    }
    Ok(())
}

/// Remaining capacity of the draft's source and task, with `backed_out` credited
/// back where it used the same source or task.
fn remaining_capacity(
    ledger: &Ledger,
    draft: &AllocationDraft,
    backed_out: Option<&Allocation>,
) -> Result<(f64, f64)> {
    let source = ledger
        .source(draft.source_id)
        .ok_or_else(|| Error::not_found(EntityKind::Source, draft.source_id))?;
    let task = ledger
        .task(draft.task_id)
        .ok_or_else(|| Error::not_found(EntityKind::Task, draft.task_id))?;

    let mut source_remaining = source.available - source.allocated;
    let mut task_remaining = task.budget - task.allocated;
    if let Some(old) = backed_out {
        if old.source_id == draft.source_id {
            source_remaining += old.amount();
        }
        if old.task_id == draft.task_id {
            task_remaining += old.amount();
        }
    }
    Ok((source_remaining, task_remaining))
}

/// Relative slack absorbing binary rounding of decimal amounts.
const CAPACITY_TOLERANCE: f64 = 1e-9;

/// Whether `requested` goes beyond `remaining` by more than rounding noise.
fn exceeds(requested: f64, remaining: f64) -> bool {
    requested - remaining > CAPACITY_TOLERANCE * requested.abs().max(1.0)
}

fn check_capacity(source_remaining: f64, task_remaining: f64, requested: f64) -> Result<()> {
    if exceeds(requested, source_remaining) {
        return Err(Error::CapacityExceeded {
            side: CapacitySide::Source,
            remaining: source_remaining,
            requested,
        });
    }
    if exceeds(requested, task_remaining) {
        return Err(Error::CapacityExceeded {
            side: CapacitySide::Task,
            remaining: task_remaining,
            requested,
        });
    }
    Ok(())
}

/// Extends `current` to `candidate` when `candidate` lies beyond it.
///
/// A malformed stored date is left alone.
fn widen(current: &mut Option<LooseDate>, candidate: NaiveDate, earlier: bool) {
    let replace = match current {
        None => true,
        Some(LooseDate::Valid(date)) => {
            if earlier {
                candidate < *date
            } else {
                candidate > *date
            }
        }
        Some(LooseDate::Malformed(_)) => false,
    };
    if replace {
        *current = Some(LooseDate::Valid(candidate));
    }
}

/// Adds an allocation's amount to its source and task, and updates the task's
/// probability, dates and status.
fn apply_forward(ledger: &mut Ledger, allocation: &Allocation) -> Result<()> {
    let amount = allocation.amount();
    let source = ledger.source_mut(allocation.source_id)?;
    source.allocated += amount;
    source.refresh_balance();

    let task = ledger.task_mut(allocation.task_id)?;
    task.allocated += amount;
    task.refresh_remaining();

    let financed = if task.budget > 0.0 {
        (task.allocated / task.budget).min(1.0)
    } else {
        0.0
    };
    task.probability = task.probability.max((financed * 100.0).round());

    for date in [&allocation.planned_date, &allocation.actual_date]
        .into_iter()
        .filter_map(|d| d.as_ref().and_then(LooseDate::valid))
    {
        widen(&mut task.start_date, date, true);
        widen(&mut task.end_date, date, false);
    }

    let realised = allocation.actual > 0.0 || allocation.actual_date.is_some();
    if realised {
        if task.allocated >= task.budget {
            task.status = Status::Done;
            task.realized_date.clone_from(&allocation.actual_date);
        } else if task.status == Status::Planned {
            task.status = Status::InProgress;
        }
    }
    Ok(())
}

/// Removes an allocation's amount from its source and task. Nothing is clamped.
pub(crate) fn reverse(ledger: &mut Ledger, allocation: &Allocation) -> Result<()> {
    let amount = allocation.amount();
    let source = ledger.source_mut(allocation.source_id)?;
    source.allocated -= amount;
    source.refresh_balance();

    let task = ledger.task_mut(allocation.task_id)?;
    task.allocated -= amount;
    task.refresh_remaining();
    Ok(())
}

/// Creates an allocation after checking both sides have room for it.
///
/// # Arguments
/// * `ledger` - The ledger to update
/// * `draft` - Source, task, amounts and dates of the new allocation
///
/// # Returns
/// The stored allocation, with its derived fields filled in
pub fn create_allocation(ledger: &mut Ledger, draft: AllocationDraft) -> Result<Allocation> {
    validate_amounts(draft.planned, draft.actual)?;
    let (source_remaining, task_remaining) = remaining_capacity(ledger, &draft, None)?;
    if parameters::is_strict(ledger) {
        check_capacity(source_remaining, task_remaining, draft.amount())?;
    }

    let now = Utc::now();
    let mut allocation = Allocation {
        id: ledger.next_allocation_id(),
        source_id: draft.source_id,
        task_id: draft.task_id,
        planned: draft.planned,
        actual: draft.actual,
        planned_date: draft.planned_date,
        actual_date: draft.actual_date,
        variance: 0.0,
        status: AllocationStatus::Planned,
        month: None,
        responsible: draft.responsible,
        notes: draft.notes,
        created_at: now,
        updated_at: now,
    };
    allocation.refresh_derived();

    apply_forward(ledger, &allocation)?;
    ledger.allocations.push(allocation.clone());
    aggregate::aggregate_project(ledger, allocation.task_id.project_id())?;

    debug!(
        id = %allocation.id,
        source = %allocation.source_id,
        task = %allocation.task_id,
        amount = allocation.amount(),
        "allocation created"
    );
    ledger.record(
        AuditAction::Create,
        EntityKind::Allocation,
        allocation.id,
        format!(
            "{} -> {}: {:.2}",
            allocation.source_id,
            allocation.task_id,
            allocation.amount()
        ),
    );
    Ok(allocation)
}

/// Replaces an allocation's fields, moving its amount between sources and tasks.
///
/// Capacity is checked first with the old amount credited back to the side it
/// already occupied. Only then is the old amount reversed and the new one
/// applied. `created_at` is kept.
pub fn edit_allocation(
    ledger: &mut Ledger,
    id: AllocationId,
    draft: AllocationDraft,
) -> Result<Allocation> {
    let old = ledger
        .allocation(id)
        .cloned()
        .ok_or_else(|| Error::not_found(EntityKind::Allocation, id))?;
    validate_amounts(draft.planned, draft.actual)?;
    let (source_remaining, task_remaining) = remaining_capacity(ledger, &draft, Some(&old))?;
    if parameters::is_strict(ledger) {
        check_capacity(source_remaining, task_remaining, draft.amount())?;
    }

    let mut updated = Allocation {
        id,
        source_id: draft.source_id,
        task_id: draft.task_id,
        planned: draft.planned,
        actual: draft.actual,
        planned_date: draft.planned_date,
        actual_date: draft.actual_date,
        variance: 0.0,
        status: old.status,
        month: None,
        responsible: draft.responsible,
        notes: draft.notes,
        created_at: old.created_at,
        updated_at: Utc::now(),
    };
    updated.refresh_derived();

    reverse(ledger, &old)?;
    apply_forward(ledger, &updated)?;
    if let Some(slot) = ledger.allocations.iter_mut().find(|a| a.id == id) {
        *slot = updated.clone();
    }

    let old_project = old.task_id.project_id();
    let new_project = updated.task_id.project_id();
    aggregate::aggregate_project(ledger, old_project)?;
    if new_project != old_project {
        aggregate::aggregate_project(ledger, new_project)?;
    }

    debug!(id = %id, amount = updated.amount(), "allocation edited");
    ledger.record(
        AuditAction::Update,
        EntityKind::Allocation,
        id,
        format!("{:.2} -> {:.2}", old.amount(), updated.amount()),
    );
    Ok(updated)
}

/// Deletes an allocation and gives its amount back to the source and task.
pub fn delete_allocation(ledger: &mut Ledger, id: AllocationId) -> Result<Allocation> {
    let index = ledger
        .allocations
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| Error::not_found(EntityKind::Allocation, id))?;
    let removed = ledger.allocations.remove(index);
    reverse(ledger, &removed)?;
    aggregate::aggregate_project(ledger, removed.task_id.project_id())?;

    info!(id = %id, amount = removed.amount(), "allocation deleted");
    ledger.record(
        AuditAction::Delete,
        EntityKind::Allocation,
        id,
        format!("{} -> {}", removed.source_id, removed.task_id),
    );
    Ok(removed)
}

/// Removes every allocation matching `doomed`, reversing each one.
///
/// Returns the projects whose tasks lost funding, without duplicates.
pub(crate) fn remove_allocations_where(
    ledger: &mut Ledger,
    doomed: impl Fn(&Allocation) -> bool,
) -> Result<Vec<ProjectId>> {
    let (removed, kept): (Vec<Allocation>, Vec<Allocation>) =
        std::mem::take(&mut ledger.allocations)
            .into_iter()
            .partition(|a| doomed(a));
    ledger.allocations = kept;

    let mut touched = Vec::new();
    for allocation in &removed {
        reverse(ledger, allocation)?;
        let project = allocation.task_id.project_id();
        if !touched.contains(&project) {
            touched.push(project);
        }
    }
    if !removed.is_empty() {
        debug!(count = removed.len(), "cascaded allocation removal");
    }
    Ok(touched)
}

/// Predicts the effect of an allocation without applying it.
///
/// # Arguments
/// * `ledger` - The ledger to read
/// * `source_id` - Source the allocation would draw on
/// * `task_id` - Task the allocation would fund
/// * `planned` - Planned amount being typed
/// * `actual` - Actual amount being typed
/// * `editing` - Allocation being edited, if any; its amount is backed out
pub fn capacity_preview(
    ledger: &Ledger,
    source_id: SourceId,
    task_id: TaskId,
    planned: f64,
    actual: f64,
    editing: Option<AllocationId>,
) -> Result<CapacityPreview> {
    let source = ledger
        .source(source_id)
        .ok_or_else(|| Error::not_found(EntityKind::Source, source_id))?;
    let task = ledger
        .task(task_id)
        .ok_or_else(|| Error::not_found(EntityKind::Task, task_id))?;
    let old = editing.and_then(|id| ledger.allocation(id));

    let current_allocated: f64 = ledger
        .allocations_of_source(source_id)
        .map(Allocation::amount)
        .sum();
    let base_allocated = match old {
        Some(old) if old.source_id == source_id => (current_allocated - old.amount()).max(0.0),
        _ => current_allocated,
    };
    let task_base = match old {
        Some(old) if old.task_id == task_id => (task.allocated - old.amount()).max(0.0),
        _ => task.allocated,
    };

    let predicted = planned.max(actual);
    let predicted_allocated = base_allocated + predicted;
    let source_remaining = (source.available - base_allocated).max(0.0);
    let task_remaining = (task.budget - task_base).max(0.0);
    let over_capacity = [planned, actual]
        .into_iter()
        .any(|amount| exceeds(amount, source_remaining) || exceeds(amount, task_remaining));

    Ok(CapacityPreview {
        base_allocated,
        predicted_allocated,
        predicted_remaining: (source.available - predicted_allocated).max(0.0),
        source_remaining,
        task_remaining,
        task_predicted_remaining: (task.budget - task_base - predicted).max(0.0),
        predicted_rate: if source.available > 0.0 {
            predicted_allocated / source.available * 100.0
        } else {
            0.0
        },
        exceeds: over_capacity,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::parameters::{STRICT_ALLOCATIONS, set_param};
    use crate::entities::ParamValue;
    use crate::test_utils::*;

    fn draft(source_id: SourceId, task_id: TaskId, planned: f64, actual: f64) -> AllocationDraft {
        AllocationDraft {
            source_id,
            task_id,
            planned,
            actual,
            planned_date: None,
            actual_date: None,
            responsible: String::new(),
            notes: String::new(),
        }
    }

    fn assert_capacity_invariant(ledger: &Ledger) {
        for source in &ledger.sources {
            let sum: f64 = ledger
                .allocations_of_source(source.id)
                .map(Allocation::amount)
                .sum();
            assert!((source.allocated - sum).abs() < 1e-9, "source {}", source.id);
        }
        for task in &ledger.tasks {
            let sum: f64 = ledger.allocations_of_task(task.id).map(Allocation::amount).sum();
            assert!((task.allocated - sum).abs() < 1e-9, "task {}", task.id);
        }
    }

    #[test]
    fn test_create_updates_both_sides() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(1_000_000.0, 500_000.0)?;
        let allocation = create_allocation(&mut ledger, draft(source, task, 200_000.0, 0.0))?;

        assert_eq!(allocation.status, AllocationStatus::Planned);
        assert_eq!(allocation.variance, -200_000.0);
        let s = ledger.source(source).unwrap();
        assert_eq!(s.allocated, 200_000.0);
        assert_eq!(s.remaining, 800_000.0);
        assert_eq!(s.allocation_rate, 20.0);
        let t = ledger.task(task).unwrap();
        assert_eq!(t.allocated, 200_000.0);
        assert_eq!(t.remaining, 300_000.0);
        assert_eq!(t.probability, 40.0);
        // planned-only allocations do not move the status
        assert_eq!(t.status, Status::Planned);

        let project = ledger.project(task.project_id()).unwrap();
        assert_eq!(project.allocated, 200_000.0);
        assert_capacity_invariant(&ledger);
        Ok(())
    }

    #[test]
    fn test_create_rejects_source_overrun_without_mutation() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 50_000.0)?;
        let before = ledger.clone();

        let result = create_allocation(&mut ledger, draft(source, task, 20_000.0, 0.0));
        assert!(matches!(
            result.unwrap_err(),
            Error::CapacityExceeded {
                side: CapacitySide::Source,
                remaining: 10_000.0,
                requested: 20_000.0,
            }
        ));
        assert_eq!(ledger, before);
        Ok(())
    }

    #[test]
    fn test_create_rejects_task_overrun() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(100_000.0, 5_000.0)?;
        let result = create_allocation(&mut ledger, draft(source, task, 1_000.0, 6_000.0));
        assert!(matches!(
            result.unwrap_err(),
            Error::CapacityExceeded {
                side: CapacitySide::Task,
                remaining: 5_000.0,
                requested: 6_000.0,
            }
        ));
        Ok(())
    }

    #[test]
    fn test_non_strict_allows_negative_balances() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 5_000.0)?;
        set_param(
            &mut ledger,
            STRICT_ALLOCATIONS,
            ParamValue::Bool(false),
            "ALLOCATION",
        );
        create_allocation(&mut ledger, draft(source, task, 20_000.0, 0.0))?;
        assert_eq!(ledger.source(source).unwrap().remaining, -10_000.0);
        assert_eq!(ledger.task(task).unwrap().remaining, -15_000.0);
        assert_capacity_invariant(&ledger);
        Ok(())
    }

    #[test]
    fn test_create_validation() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 5_000.0)?;
        for (planned, actual) in [(-1.0, 0.0), (f64::NAN, 0.0), (0.0, f64::INFINITY)] {
            let result = create_allocation(&mut ledger, draft(source, task, planned, actual));
            assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        }
        let result = create_allocation(&mut ledger, draft(SourceId(99), task, 1.0, 0.0));
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: EntityKind::Source,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_realised_allocation_completes_task() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(100_000.0, 5_000.0)?;
        let mut d = draft(source, task, 5_000.0, 5_000.0);
        d.planned_date = LooseDate::parse("2025-09-01");
        d.actual_date = LooseDate::parse("2025-09-15");
        create_allocation(&mut ledger, d)?;

        let t = ledger.task(task).unwrap();
        assert_eq!(t.status, Status::Done);
        assert_eq!(t.realized_date, LooseDate::parse("2025-09-15"));
        assert_eq!(t.probability, 100.0);
        assert_eq!(t.start_date, LooseDate::parse("2025-09-01"));
        assert_eq!(t.end_date, LooseDate::parse("2025-09-15"));
        Ok(())
    }

    #[test]
    fn test_decimal_amounts_fill_source_exactly() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(100.3, 1_000.0)?;
        create_allocation(&mut ledger, draft(source, task, 50.1, 0.0))?;
        create_allocation(&mut ledger, draft(source, task, 50.2, 0.0))?;
        assert!((ledger.source(source).unwrap().allocated - 100.3).abs() < 1e-9);

        let preview = capacity_preview(&ledger, source, task, 0.0, 0.0, None)?;
        assert!(!preview.exceeds);
        let result = create_allocation(&mut ledger, draft(source, task, 0.01, 0.0));
        assert!(matches!(
            result.unwrap_err(),
            Error::CapacityExceeded {
                side: CapacitySide::Source,
                ..
            }
        ));
        assert_capacity_invariant(&ledger);
        Ok(())
    }

    #[test]
    fn test_actual_date_alone_realises() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(100_000.0, 5_000.0)?;
        let mut d = draft(source, task, 1_000.0, 0.0);
        d.actual_date = LooseDate::parse("2025-04-02");
        create_allocation(&mut ledger, d)?;
        assert_eq!(ledger.task(task).unwrap().status, Status::InProgress);

        let mut d = draft(source, task, 4_000.0, 0.0);
        d.actual_date = LooseDate::parse("2025-04-30");
        create_allocation(&mut ledger, d)?;
        let t = ledger.task(task).unwrap();
        assert_eq!(t.status, Status::Done);
        assert_eq!(t.realized_date, LooseDate::parse("2025-04-30"));
        Ok(())
    }

    #[test]
    fn test_partial_realisation_starts_task() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(100_000.0, 5_000.0)?;
        create_allocation(&mut ledger, draft(source, task, 1_000.0, 1_000.0))?;
        assert_eq!(ledger.task(task).unwrap().status, Status::InProgress);
        Ok(())
    }

    #[test]
    fn test_widen_keeps_malformed_dates() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(100_000.0, 5_000.0)?;
        ledger.task_mut(task)?.start_date = LooseDate::parse("bientôt");
        ledger.task_mut(task)?.end_date = LooseDate::parse("2025-12-31");
        let mut d = draft(source, task, 1_000.0, 0.0);
        d.planned_date = LooseDate::parse("2025-06-01");
        create_allocation(&mut ledger, d)?;

        let t = ledger.task(task).unwrap();
        assert_eq!(t.start_date, LooseDate::parse("bientôt"));
        assert_eq!(t.end_date, LooseDate::parse("2025-12-31"));
        Ok(())
    }

    #[test]
    fn test_edit_backs_out_old_amount() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 10_000.0)?;
        let allocation = create_allocation(&mut ledger, draft(source, task, 8_000.0, 0.0))?;
        // 9k only fits because the existing 8k is credited back
        let edited =
            edit_allocation(&mut ledger, allocation.id, draft(source, task, 9_000.0, 0.0))?;

        assert_eq!(edited.created_at, allocation.created_at);
        assert_eq!(ledger.source(source).unwrap().allocated, 9_000.0);
        assert_eq!(ledger.task(task).unwrap().allocated, 9_000.0);
        assert_eq!(ledger.allocations.len(), 1);
        assert_capacity_invariant(&ledger);
        Ok(())
    }

    #[test]
    fn test_realising_full_budget_completes_task() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(1_000_000.0, 500_000.0)?;
        let allocation = create_allocation(&mut ledger, draft(source, task, 400_000.0, 0.0))?;
        assert_eq!(ledger.source(source).unwrap().allocated, 400_000.0);
        assert_eq!(ledger.task(task).unwrap().allocated, 400_000.0);
        assert_eq!(ledger.task(task).unwrap().status, Status::Planned);

        let realised = draft(source, task, 400_000.0, 500_000.0);
        let edited = edit_allocation(&mut ledger, allocation.id, realised)?;
        assert_eq!(edited.status, AllocationStatus::Realized);
        let t = ledger.task(task).unwrap();
        assert_eq!(t.allocated, 500_000.0);
        assert_eq!(t.remaining, 0.0);
        assert_eq!(t.status, Status::Done);
        assert_eq!(ledger.source(source).unwrap().allocated, 500_000.0);
        assert_capacity_invariant(&ledger);
        Ok(())
    }

    #[test]
    fn test_failed_edit_leaves_ledger_unchanged() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 10_000.0)?;
        let allocation = create_allocation(&mut ledger, draft(source, task, 8_000.0, 0.0))?;
        let before = ledger.clone();

        let result =
            edit_allocation(&mut ledger, allocation.id, draft(source, task, 12_000.0, 0.0));
        assert!(matches!(
            result.unwrap_err(),
            Error::CapacityExceeded {
                side: CapacitySide::Source,
                ..
            }
        ));
        assert_eq!(ledger, before);
        Ok(())
    }

    #[test]
    fn test_edit_moves_between_sources_and_projects() -> Result<()> {
        let (mut ledger, s1, t1) = setup_funded_task(10_000.0, 10_000.0)?;
        let s2 = create_test_source(&mut ledger, "Prime", 10_000.0)?.id;
        let p2 = create_test_project(&mut ledger, "Voiture")?.id;
        let t2 = create_test_task(&mut ledger, p2, "Pneus", 10_000.0)?.id;

        let allocation = create_allocation(&mut ledger, draft(s1, t1, 4_000.0, 0.0))?;
        edit_allocation(&mut ledger, allocation.id, draft(s2, t2, 4_000.0, 0.0))?;

        assert_eq!(ledger.source(s1).unwrap().allocated, 0.0);
        assert_eq!(ledger.source(s2).unwrap().allocated, 4_000.0);
        assert_eq!(ledger.project(t1.project_id()).unwrap().allocated, 0.0);
        assert_eq!(ledger.project(p2).unwrap().allocated, 4_000.0);
        assert_capacity_invariant(&ledger);
        Ok(())
    }

    #[test]
    fn test_delete_reverses_amounts() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 10_000.0)?;
        let a = create_allocation(&mut ledger, draft(source, task, 3_000.0, 0.0))?;
        create_allocation(&mut ledger, draft(source, task, 1_000.0, 2_000.0))?;
        delete_allocation(&mut ledger, a.id)?;

        assert_eq!(ledger.source(source).unwrap().allocated, 2_000.0);
        assert_eq!(ledger.task(task).unwrap().remaining, 8_000.0);
        assert!(matches!(
            delete_allocation(&mut ledger, a.id).unwrap_err(),
            Error::NotFound {
                entity: EntityKind::Allocation,
                ..
            }
        ));
        assert_capacity_invariant(&ledger);
        Ok(())
    }

    #[test]
    fn test_allocation_ids_not_reused() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 10_000.0)?;
        let a = create_allocation(&mut ledger, draft(source, task, 100.0, 0.0))?;
        let b = create_allocation(&mut ledger, draft(source, task, 100.0, 0.0))?;
        delete_allocation(&mut ledger, b.id)?;
        let c = create_allocation(&mut ledger, draft(source, task, 100.0, 0.0))?;
        assert_ne!(c.id, b.id);
        assert_ne!(c.id, a.id);
        Ok(())
    }

    #[test]
    fn test_capacity_preview() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 6_000.0)?;
        let a = create_allocation(&mut ledger, draft(source, task, 4_000.0, 0.0))?;

        let preview = capacity_preview(&ledger, source, task, 3_000.0, 0.0, None)?;
        assert_eq!(preview.base_allocated, 4_000.0);
        assert_eq!(preview.predicted_allocated, 7_000.0);
        assert_eq!(preview.predicted_remaining, 3_000.0);
        assert_eq!(preview.task_remaining, 2_000.0);
        assert!(preview.exceeds);

        let preview = capacity_preview(&ledger, source, task, 5_000.0, 0.0, Some(a.id))?;
        assert_eq!(preview.base_allocated, 0.0);
        assert_eq!(preview.task_remaining, 6_000.0);
        assert_eq!(preview.task_predicted_remaining, 1_000.0);
        assert_eq!(preview.predicted_rate, 50.0);
        assert!(!preview.exceeds);
        Ok(())
    }
}
