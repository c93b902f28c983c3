//! The ledger - the repository object that owns every collection.
//!
//! Collections are insertion-ordered `Vec`s with linear lookups. Engines in
//! [`crate::core`] receive the ledger by reference; nothing here is global.

use crate::entities::{
    Allocation, AllocationId, AuditAction, AuditEvent, MonthlyData, Parameter, Project, ProjectId,
    Source, SourceId, Task, TaskId, User,
};
use crate::errors::{EntityKind, Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

fn audited_ids(audit: &[AuditEvent], kind: EntityKind) -> impl Iterator<Item = &str> {
    let kind = kind.to_string();
    audit
        .iter()
        .filter(move |e| e.entity == kind)
        .map(|e| e.entity_id.trim())
}

/// Ledger-wide behaviour that does not live in the parameter sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Strict mode used when `Mode_Strict_Allocations` is absent
    pub strict_default: bool,
    /// User name recorded in the audit trail
    pub operator: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            strict_default: true,
            operator: "system".to_string(),
        }
    }
}

/// Highest source and allocation ids ever handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdCounters {
    /// Highest source number issued
    #[serde(default)]
    pub source: u32,
    /// Highest allocation number issued
    #[serde(default)]
    pub allocation: u64,
}

/// Number of cached totals `reconcile` had to correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// Sources whose allocated total was stale
    pub sources_corrected: usize,
    /// Tasks whose allocated total was stale
    pub tasks_corrected: usize,
}

impl ReconcileReport {
    /// True when nothing needed correcting.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.sources_corrected == 0 && self.tasks_corrected == 0
    }
}

/// In-memory store of projects, tasks, sources, allocations and reference data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ledger {
    /// Top-level projects
    pub projects: Vec<Project>,
    /// Tasks of every project
    pub tasks: Vec<Task>,
    /// Funding sources
    pub sources: Vec<Source>,
    /// Source-to-task allocations, the source of truth for allocated totals
    pub allocations: Vec<Allocation>,
    /// Household members
    pub users: Vec<User>,
    /// Parameter sheet
    pub parameters: Vec<Parameter>,
    /// Monthly reference series
    pub monthly_data: Vec<MonthlyData>,
    /// Audit trail, newest first
    pub audit: Vec<AuditEvent>,
    /// Behaviour settings
    pub settings: LedgerSettings,
    next_source: u32,
    next_allocation: u64,
    next_audit: u64,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(settings: LedgerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Looks up a project.
    #[must_use]
    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Looks up a project, failing with `NotFound`.
    pub fn project_mut(&mut self, id: ProjectId) -> Result<&mut Project> {
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found(EntityKind::Project, id))
    }

    /// Looks up a task.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Looks up a task, failing with `NotFound`.
    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::not_found(EntityKind::Task, id))
    }

    /// Looks up a source.
    #[must_use]
    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Looks up a source, failing with `NotFound`.
    pub fn source_mut(&mut self, id: SourceId) -> Result<&mut Source> {
        self.sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::not_found(EntityKind::Source, id))
    }

    /// Looks up an allocation.
    #[must_use]
    pub fn allocation(&self, id: AllocationId) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.id == id)
    }

    /// Tasks of one project, in insertion order.
    pub fn tasks_of(&self, project: ProjectId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.project_id() == project)
    }

    /// Allocations funding one task.
    pub fn allocations_of_task(&self, task: TaskId) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(move |a| a.task_id == task)
    }

    /// Allocations drawing on one source.
    pub fn allocations_of_source(&self, source: SourceId) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(move |a| a.source_id == source)
    }

    /// Next project id: one past the highest in use.
    #[must_use]
    pub fn next_project_id(&self) -> ProjectId {
        ProjectId(self.projects.iter().map(|p| p.id.0).max().unwrap_or(0) + 1)
    }

    /// Next task id under `project`.
    ///
    /// Starts one past the parent's highest sequence and keeps counting while
    /// the display form would collide with another task (`T112` is both
    /// `P1`/12 and `P11`/2).
    #[must_use]
    pub fn next_task_id(&self, project: ProjectId) -> TaskId {
        let mut seq = self.tasks_of(project).map(|t| t.id.seq).max().unwrap_or(0) + 1;
        loop {
            let candidate = TaskId::new(project, seq);
            let display = candidate.to_string();
            if !self.tasks.iter().any(|t| t.id.to_string() == display) {
                return candidate;
            }
            seq += 1;
        }
    }

    /// Next source id; ids of deleted sources are never handed out again.
    pub fn next_source_id(&mut self) -> SourceId {
        let floor = self.sources.iter().map(|s| s.id.0).max().unwrap_or(0);
        self.next_source = self.next_source.max(floor) + 1;
        SourceId(self.next_source)
    }

    /// Next allocation id; never reused.
    pub fn next_allocation_id(&mut self) -> AllocationId {
        let floor = self.allocations.iter().map(|a| a.id.0).max().unwrap_or(0);
        self.next_allocation = self.next_allocation.max(floor) + 1;
        AllocationId(self.next_allocation)
    }

    /// Highest ids issued so far, including those of deleted records.
    #[must_use]
    pub const fn id_counters(&self) -> IdCounters {
        IdCounters {
            source: self.next_source,
            allocation: self.next_allocation,
        }
    }

    /// Raises the id counters past `floor` and past every source or allocation
    /// id named in the audit trail, so ids of records deleted before a reload
    /// stay retired.
    pub fn seed_id_counters(&mut self, floor: IdCounters) {
        let audited_source = audited_ids(&self.audit, EntityKind::Source)
            .filter_map(|raw| raw.parse::<SourceId>().ok())
            .map(|id| id.0)
            .max()
            .unwrap_or(0);
        let audited_allocation = audited_ids(&self.audit, EntityKind::Allocation)
            .filter_map(|raw| raw.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        self.next_source = self.next_source.max(floor.source).max(audited_source);
        self.next_allocation = self
            .next_allocation
            .max(floor.allocation)
            .max(audited_allocation);
        debug!(
            source = self.next_source,
            allocation = self.next_allocation,
            "id counters seeded"
        );
    }

    /// Prepends an audit event stamped with the configured operator.
    pub fn record(
        &mut self,
        action: AuditAction,
        entity: impl fmt::Display,
        entity_id: impl fmt::Display,
        details: impl Into<String>,
    ) {
        let floor = self.audit.iter().map(|e| e.id).max().unwrap_or(0);
        self.next_audit = self.next_audit.max(floor) + 1;
        let event = AuditEvent {
            id: self.next_audit,
            action,
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
            user: self.settings.operator.clone(),
            timestamp: Utc::now(),
            details: details.into(),
            changes: serde_json::Value::Null,
        };
        debug!(action = %event.action, entity = %event.entity, id = %event.entity_id, "audit");
        self.audit.insert(0, event);
    }

    /// Recomputes every source's and task's allocated total from the allocations.
    ///
    /// Also refreshes `remaining` and the source allocation rate. Returns how many
    /// cached totals differed from the recomputed ones.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let mut by_source: HashMap<SourceId, f64> = HashMap::new();
        let mut by_task: HashMap<TaskId, f64> = HashMap::new();
        for allocation in &self.allocations {
            *by_source.entry(allocation.source_id).or_default() += allocation.amount();
            *by_task.entry(allocation.task_id).or_default() += allocation.amount();
        }

        let mut report = ReconcileReport::default();
        for source in &mut self.sources {
            let total = by_source.get(&source.id).copied().unwrap_or(0.0);
            if (source.allocated - total).abs() > 1e-6 {
                report.sources_corrected += 1;
            }
            source.allocated = total;
            source.refresh_balance();
        }
        for task in &mut self.tasks {
            let total = by_task.get(&task.id).copied().unwrap_or(0.0);
            if (task.allocated - total).abs() > 1e-6 {
                report.tasks_corrected += 1;
            }
            task.allocated = total;
            task.refresh_remaining();
        }
        if !report.is_clean() {
            debug!(
                sources = report.sources_corrected,
                tasks = report.tasks_corrected,
                "reconciled stale allocated totals"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_next_task_id_skips_display_collisions() -> Result<()> {
        let mut ledger = setup_ledger();
        for _ in 0..11 {
            create_test_project(&mut ledger, "Projet")?;
        }
        let p1 = ProjectId(1);
        let p11 = ProjectId(11);
        // T111 and T112 are taken by P11
        create_test_task(&mut ledger, p11, "A", 100.0)?;
        create_test_task(&mut ledger, p11, "B", 100.0)?;
        let mut created = Vec::new();
        for _ in 0..11 {
            created.push(create_test_task(&mut ledger, p1, "x", 10.0)?.id);
        }
        assert_eq!(created[9], TaskId::new(p1, 10));
        assert_eq!(created[10], TaskId::new(p1, 13));
        assert_eq!(ledger.next_task_id(p1), TaskId::new(p1, 14));

        let displays: std::collections::HashSet<String> =
            ledger.tasks.iter().map(|t| t.id.to_string()).collect();
        assert_eq!(displays.len(), ledger.tasks.len());
        Ok(())
    }

    #[test]
    fn test_source_ids_not_reused() -> Result<()> {
        let mut ledger = setup_ledger();
        let s1 = create_test_source(&mut ledger, "Salaire", 1_000.0)?;
        let s2 = create_test_source(&mut ledger, "Épargne", 1_000.0)?;
        crate::core::source::delete_source(&mut ledger, s2.id)?;
        let s3 = create_test_source(&mut ledger, "Prime", 1_000.0)?;
        assert_eq!(s1.id, SourceId(1));
        assert_eq!(s3.id, SourceId(3));
        Ok(())
    }

    #[test]
    fn test_seeded_counters_retire_audited_ids() -> Result<()> {
        let mut ledger = setup_ledger();
        ledger.record(AuditAction::Delete, EntityKind::Source, SourceId(7), "Prime");
        ledger.record(AuditAction::Delete, EntityKind::Allocation, AllocationId(12), "");
        ledger.record(AuditAction::Delete, EntityKind::Task, "T19", "");
        ledger.seed_id_counters(IdCounters {
            source: 3,
            allocation: 20,
        });

        assert_eq!(
            ledger.id_counters(),
            IdCounters {
                source: 7,
                allocation: 20,
            }
        );
        assert_eq!(create_test_source(&mut ledger, "Salaire", 10.0)?.id, SourceId(8));
        assert_eq!(ledger.next_allocation_id(), AllocationId(21));
        Ok(())
    }

    #[test]
    fn test_reconcile_corrects_stale_totals() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(10_000.0, 5_000.0)?;
        create_test_allocation(&mut ledger, source, task, 1_000.0, 0.0)?;
        assert!(ledger.reconcile().is_clean());

        ledger.source_mut(source)?.allocated = 42.0;
        ledger.task_mut(task)?.allocated = 0.0;
        let report = ledger.reconcile();
        assert_eq!(report.sources_corrected, 1);
        assert_eq!(report.tasks_corrected, 1);
        assert_eq!(ledger.source(source).unwrap().allocated, 1_000.0);
        assert_eq!(ledger.source(source).unwrap().remaining, 9_000.0);
        assert_eq!(ledger.task(task).unwrap().remaining, 4_000.0);
        Ok(())
    }

    #[test]
    fn test_audit_is_newest_first() -> Result<()> {
        let mut ledger = setup_ledger();
        create_test_project(&mut ledger, "Maison")?;
        create_test_source(&mut ledger, "Salaire", 100.0)?;
        assert_eq!(ledger.audit.len(), 2);
        assert_eq!(ledger.audit[0].entity, "Source");
        assert!(ledger.audit[0].id > ledger.audit[1].id);
        assert_eq!(ledger.audit[0].user, "system");
        Ok(())
    }
}
