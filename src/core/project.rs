//! Project business logic - creating, editing and deleting top-level projects.
//!
//! Once a project has tasks its rollup fields belong to the aggregation engine;
//! an edit still records the authored values but they are overwritten by the
//! next aggregation.

use crate::{
    core::{aggregate, allocation, task::validate_plan},
    entities::{AuditAction, LooseDate, Project, ProjectId, Status},
    errors::{EntityKind, Error, Result},
    store::Ledger,
};
use tracing::{debug, info};

/// User-supplied fields of a project.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectDraft {
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
    /// Budget, used only while the project has no tasks
    pub budget: f64,
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
    /// Free-form notes
    pub notes: String,
}

impl ProjectDraft {
    /// A draft with only a name; everything else empty.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

fn write_fields(project: &mut Project, draft: ProjectDraft) {
    project.name = draft.name.trim().to_string();
    project.category = draft.category;
    project.kiyosaki_type = draft.kiyosaki_type;
    project.beneficiary = draft.beneficiary;
    project.priority = draft.priority;
    project.budget = draft.budget;
    project.status = draft.status;
    project.probability = draft.probability;
    project.roi = draft.roi;
    project.start_date = draft.start_date;
    project.end_date = draft.end_date;
    project.responsible = draft.responsible;
    project.notes = draft.notes;
    project.refresh_remaining();
}

/// Creates a project with the next free `P<n>` id.
///
/// # Arguments
/// * `ledger` - The ledger to update
/// * `draft` - Authored fields of the new project
pub fn create_project(ledger: &mut Ledger, draft: ProjectDraft) -> Result<Project> {
    validate_plan(&draft.name, draft.budget, draft.probability)?;
    let mut project = Project {
        id: ledger.next_project_id(),
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
        responsible: String::new(),
        notes: String::new(),
    };
    write_fields(&mut project, draft);
    ledger.projects.push(project.clone());

    debug!(id = %project.id, name = %project.name, "project created");
    ledger.record(
        AuditAction::Create,
        EntityKind::Project,
        project.id,
        project.name.clone(),
    );
    Ok(project)
}

/// Overwrites a project's authored fields, then re-derives its rollups.
pub fn edit_project(ledger: &mut Ledger, id: ProjectId, draft: ProjectDraft) -> Result<Project> {
    validate_plan(&draft.name, draft.budget, draft.probability)?;
    write_fields(ledger.project_mut(id)?, draft);
    aggregate::aggregate_project(ledger, id)?;

    let project = ledger
        .project(id)
        .cloned()
        .ok_or_else(|| Error::not_found(EntityKind::Project, id))?;
    debug!(id = %id, "project edited");
    ledger.record(
        AuditAction::Update,
        EntityKind::Project,
        id,
        project.name.clone(),
    );
    Ok(project)
}

/// Deletes a project with its tasks and their allocations.
///
/// Allocations are reversed from their sources before the records go.
pub fn delete_project(ledger: &mut Ledger, id: ProjectId) -> Result<Project> {
    let index = ledger
        .projects
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| Error::not_found(EntityKind::Project, id))?;

    allocation::remove_allocations_where(ledger, |a| a.task_id.project_id() == id)?;
    let before = ledger.tasks.len();
    ledger.tasks.retain(|t| t.project_id() != id);
    let removed_tasks = before - ledger.tasks.len();
    let project = ledger.projects.remove(index);

    info!(id = %id, tasks = removed_tasks, "project deleted");
    ledger.record(
        AuditAction::Delete,
        EntityKind::Project,
        id,
        format!("{} ({removed_tasks} tasks)", project.name),
    );
    Ok(project)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_create_assigns_sequential_ids() -> Result<()> {
        let mut ledger = setup_ledger();
        let a = create_project(&mut ledger, ProjectDraft::named("  Maison  "))?;
        let b = create_project(&mut ledger, ProjectDraft::named("Voiture"))?;
        assert_eq!(a.id.to_string(), "P1");
        assert_eq!(a.name, "Maison");
        assert_eq!(b.id, ProjectId(2));
        Ok(())
    }

    #[test]
    fn test_create_validation() {
        let mut ledger = setup_ledger();
        let blank = create_project(&mut ledger, ProjectDraft::named("   "));
        assert!(matches!(blank.unwrap_err(), Error::Validation { .. }));

        let mut draft = ProjectDraft::named("Maison");
        draft.budget = -5.0;
        assert!(create_project(&mut ledger, draft).is_err());

        let mut draft = ProjectDraft::named("Maison");
        draft.probability = 120.0;
        assert!(create_project(&mut ledger, draft).is_err());
        assert!(ledger.projects.is_empty());
    }

    #[test]
    fn test_edit_of_parent_keeps_derived_fields() -> Result<()> {
        let mut ledger = setup_ledger();
        let project = create_test_project(&mut ledger, "Maison")?;
        create_test_task(&mut ledger, project.id, "Toit", 700.0)?;

        let mut draft = ProjectDraft::named("Maison familiale");
        draft.budget = 99.0;
        let edited = edit_project(&mut ledger, project.id, draft)?;
        assert_eq!(edited.name, "Maison familiale");
        assert_eq!(edited.budget, 700.0);
        Ok(())
    }

    #[test]
    fn test_delete_cascades_and_frees_sources() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 5_000.0)?;
        create_test_allocation(&mut ledger, source, task, 2_000.0, 0.0)?;
        let other = create_test_project(&mut ledger, "Autre")?;
        create_test_task(&mut ledger, other.id, "Reste", 100.0)?;

        delete_project(&mut ledger, task.project_id())?;
        assert!(ledger.allocations.is_empty());
        assert_eq!(ledger.tasks.len(), 1);
        assert_eq!(ledger.source(source).unwrap().allocated, 0.0);
        assert_eq!(ledger.source(source).unwrap().remaining, 10_000.0);
        assert!(ledger.project(task.project_id()).is_none());

        assert!(matches!(
            delete_project(&mut ledger, task.project_id()).unwrap_err(),
            Error::NotFound { .. }
        ));
        Ok(())
    }
}
