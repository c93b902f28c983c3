//! Shared test utilities for the ledger.
//!
//! This module provides common helpers for setting up an empty ledger and
//! creating test entities with sensible defaults through the regular
//! operations, so cached totals stay consistent.

use crate::{
    core::{
        allocation::{self, AllocationDraft},
        project::{self, ProjectDraft},
        source::{self, SourceDraft},
        task::{self, TaskDraft},
    },
    entities::{Allocation, Project, ProjectId, Source, SourceId, Task, TaskId},
    errors::Result,
    store::{Ledger, LedgerSettings},
};

/// Creates an empty ledger in strict mode, audited as "system".
/// This is the standard setup for all unit tests.
pub fn setup_ledger() -> Ledger {
    Ledger::new(LedgerSettings::default())
}

/// Creates a test project with only a name.
pub fn create_test_project(ledger: &mut Ledger, name: &str) -> Result<Project> {
    project::create_project(ledger, ProjectDraft::named(name))
}

/// Creates a test task under `project_id`.
///
/// # Defaults
/// * status: `Planifié`
/// * probability: 0
/// * no dates
pub fn create_test_task(
    ledger: &mut Ledger,
    project_id: ProjectId,
    name: &str,
    budget: f64,
) -> Result<Task> {
    task::create_task(ledger, project_id, TaskDraft::new(name, budget))
}

/// Creates a test source with nothing allocated.
pub fn create_test_source(ledger: &mut Ledger, name: &str, available: f64) -> Result<Source> {
    source::create_source(ledger, SourceDraft::new(name, available))
}

/// Creates a ledger holding one project with one task and one source.
///
/// # Returns
/// The ledger, the source id and the task id
pub fn setup_funded_task(
    source_available: f64,
    task_budget: f64,
) -> Result<(Ledger, SourceId, TaskId)> {
    let mut ledger = setup_ledger();
    let project = create_test_project(&mut ledger, "P1")?;
    let task = create_test_task(&mut ledger, project.id, "Tâche", task_budget)?;
    let source = create_test_source(&mut ledger, "Salaire", source_available)?;
    Ok((ledger, source.id, task.id))
}

/// Creates an undated test allocation.
pub fn create_test_allocation(
    ledger: &mut Ledger,
    source_id: SourceId,
    task_id: TaskId,
    planned: f64,
    actual: f64,
) -> Result<Allocation> {
    allocation::create_allocation(
        ledger,
        AllocationDraft {
            source_id,
            task_id,
            planned,
            actual,
            planned_date: None,
            actual_date: None,
            responsible: String::new(),
            notes: String::new(),
        },
    )
}
