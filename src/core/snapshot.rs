//! Snapshot import and export.
//!
//! A snapshot is the whole ledger as one JSON document with the collections
//! `Projects`, `Tasks`, `Sources`, `Allocations`, `Users`, `Parameters`,
//! `MonthlyData` and `Audit`, plus `NextIds` so ids of deleted sources and
//! allocations stay retired. The dashboard's own export is accepted as well:
//! an optional `appData` wrapper, lower-case keys and projects mixed with their
//! tasks under `projects`.
//!
//! Import stages a complete replacement ledger, reconciles and aggregates it,
//! and only then swaps it in. Any error leaves the current ledger untouched.

use crate::{
    core::aggregate,
    entities::{
        Allocation, AllocationId, AllocationStatus, AuditAction, AuditEvent, LooseDate,
        MonthlyData, Parameter, Project, ProjectId, Source, SourceId, Status, Task, TaskId, User,
        lenient,
    },
    errors::{Error, Result},
    store::{IdCounters, Ledger, ReconcileReport},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

fn status_label<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Status, D::Error> {
    let label = lenient::text(deserializer)?;
    Ok(Status::from_label(&label).unwrap_or_default())
}

/// A project or a task; tasks name their project in `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ItemRecord {
    #[serde(deserialize_with = "lenient::key")]
    id: String,
    #[serde(default, deserialize_with = "lenient::optional_key")]
    parent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    category: String,
    #[serde(default, deserialize_with = "lenient::text")]
    kiyosaki_type: String,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing)]
    type_kiyosaki: String,
    #[serde(default, deserialize_with = "lenient::text")]
    beneficiary: String,
    #[serde(default, deserialize_with = "lenient::text")]
    priority: String,
    #[serde(default, deserialize_with = "lenient::amount")]
    budget: f64,
    #[serde(default, deserialize_with = "lenient::amount")]
    allocated: f64,
    #[serde(default, deserialize_with = "lenient::amount")]
    remaining: f64,
    #[serde(default, deserialize_with = "lenient::amount")]
    progress: f64,
    #[serde(default, deserialize_with = "status_label")]
    status: Status,
    #[serde(default, deserialize_with = "lenient::amount")]
    probability: f64,
    #[serde(default, deserialize_with = "lenient::amount")]
    roi: f64,
    #[serde(default, with = "crate::entities::date::optional")]
    start_date: Option<LooseDate>,
    #[serde(default, with = "crate::entities::date::optional")]
    end_date: Option<LooseDate>,
    #[serde(default, with = "crate::entities::date::optional")]
    realized_date: Option<LooseDate>,
    #[serde(default, deserialize_with = "lenient::text")]
    responsible: String,
    #[serde(default, deserialize_with = "lenient::optional_key")]
    dependency: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    notes: String,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing)]
    note: String,
}

impl ItemRecord {
    fn kiyosaki_type(&self) -> String {
        if self.kiyosaki_type.is_empty() {
            self.type_kiyosaki.clone()
        } else {
            self.kiyosaki_type.clone()
        }
    }

    fn notes(&self) -> String {
        if self.notes.is_empty() {
            self.note.clone()
        } else {
            self.notes.clone()
        }
    }

    fn into_project(self, id: ProjectId) -> Project {
        let mut project = Project {
            id,
            kiyosaki_type: self.kiyosaki_type(),
            notes: self.notes(),
            name: self.name,
            category: self.category,
            beneficiary: self.beneficiary,
            priority: self.priority,
            budget: self.budget,
            allocated: self.allocated,
            remaining: 0.0,
            progress: self.progress,
            status: self.status,
            probability: self.probability,
            roi: self.roi,
            start_date: self.start_date,
            end_date: self.end_date,
            responsible: self.responsible,
        };
        project.refresh_remaining();
        project
    }

    fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            kiyosaki_type: self.kiyosaki_type(),
            notes: self.notes(),
            name: self.name,
            category: self.category,
            beneficiary: self.beneficiary,
            priority: self.priority,
            budget: self.budget,
            allocated: self.allocated,
            remaining: self.remaining,
            progress: self.progress,
            status: self.status,
            probability: self.probability,
            roi: self.roi,
            start_date: self.start_date,
            end_date: self.end_date,
            realized_date: self.realized_date,
            responsible: self.responsible,
            dependency: self.dependency,
        }
    }

    fn from_project(project: &Project) -> Self {
        Self {
            id: project.id.to_string(),
            parent_id: None,
            name: project.name.clone(),
            category: project.category.clone(),
            kiyosaki_type: project.kiyosaki_type.clone(),
            type_kiyosaki: String::new(),
            beneficiary: project.beneficiary.clone(),
            priority: project.priority.clone(),
            budget: project.budget,
            allocated: project.allocated,
            remaining: project.remaining,
            progress: project.progress,
            status: project.status,
            probability: project.probability,
            roi: project.roi,
            start_date: project.start_date.clone(),
            end_date: project.end_date.clone(),
            realized_date: None,
            responsible: project.responsible.clone(),
            dependency: None,
            notes: project.notes.clone(),
            note: String::new(),
        }
    }

    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            parent_id: Some(task.project_id().to_string()),
            name: task.name.clone(),
            category: task.category.clone(),
            kiyosaki_type: task.kiyosaki_type.clone(),
            type_kiyosaki: String::new(),
            beneficiary: task.beneficiary.clone(),
            priority: task.priority.clone(),
            budget: task.budget,
            allocated: task.allocated,
            remaining: task.remaining,
            progress: task.progress,
            status: task.status,
            probability: task.probability,
            roi: task.roi,
            start_date: task.start_date.clone(),
            end_date: task.end_date.clone(),
            realized_date: task.realized_date.clone(),
            responsible: task.responsible.clone(),
            dependency: task.dependency.clone(),
            notes: task.notes.clone(),
            note: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SourceRecord {
    #[serde(deserialize_with = "lenient::key")]
    id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    name: String,
    #[serde(rename = "type", alias = "source_type", default, deserialize_with = "lenient::text")]
    source_type: String,
    #[serde(default, deserialize_with = "lenient::amount")]
    available: f64,
    #[serde(default, deserialize_with = "lenient::amount")]
    allocated: f64,
    #[serde(default, deserialize_with = "lenient::amount")]
    remaining: f64,
    #[serde(default, deserialize_with = "lenient::amount")]
    allocation_rate: f64,
    #[serde(default, with = "crate::entities::date::optional")]
    availability_date: Option<LooseDate>,
    #[serde(default, deserialize_with = "lenient::text")]
    responsible: String,
    #[serde(default, deserialize_with = "lenient::text")]
    status: String,
    #[serde(default, deserialize_with = "lenient::text")]
    regularity: String,
    #[serde(default, deserialize_with = "lenient::text")]
    frequency: String,
    #[serde(default, deserialize_with = "lenient::text")]
    notes: String,
}

impl SourceRecord {
    fn into_source(self, id: SourceId) -> Source {
        Source {
            id,
            name: self.name,
            source_type: self.source_type,
            available: self.available,
            allocated: self.allocated,
            remaining: self.remaining,
            allocation_rate: self.allocation_rate,
            availability_date: self.availability_date,
            responsible: self.responsible,
            status: self.status,
            regularity: self.regularity,
            frequency: self.frequency,
            notes: self.notes,
        }
    }

    fn from_source(source: &Source) -> Self {
        Self {
            id: source.id.to_string(),
            name: source.name.clone(),
            source_type: source.source_type.clone(),
            available: source.available,
            allocated: source.allocated,
            remaining: source.remaining,
            allocation_rate: source.allocation_rate,
            availability_date: source.availability_date.clone(),
            responsible: source.responsible.clone(),
            status: source.status.clone(),
            regularity: source.regularity.clone(),
            frequency: source.frequency.clone(),
            notes: source.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AllocationRecord {
    #[serde(default, deserialize_with = "lenient::optional_key")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient::key")]
    source_id: String,
    #[serde(default, deserialize_with = "lenient::key")]
    task_id: String,
    #[serde(default, deserialize_with = "lenient::amount")]
    planned: f64,
    #[serde(default, deserialize_with = "lenient::amount")]
    actual: f64,
    #[serde(default, with = "crate::entities::date::optional")]
    planned_date: Option<LooseDate>,
    #[serde(default, with = "crate::entities::date::optional")]
    actual_date: Option<LooseDate>,
    #[serde(default, deserialize_with = "lenient::amount")]
    variance: f64,
    #[serde(default, deserialize_with = "lenient::text")]
    status: String,
    #[serde(default, deserialize_with = "lenient::optional_key")]
    month: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    responsible: String,
    #[serde(default, deserialize_with = "lenient::text")]
    notes: String,
    #[serde(default, deserialize_with = "lenient::optional_key")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_key")]
    updated_at: Option<String>,
}

impl AllocationRecord {
    fn from_allocation(allocation: &Allocation) -> Self {
        Self {
            id: Some(allocation.id.to_string()),
            source_id: allocation.source_id.to_string(),
            task_id: allocation.task_id.to_string(),
            planned: allocation.planned,
            actual: allocation.actual,
            planned_date: allocation.planned_date.clone(),
            actual_date: allocation.actual_date.clone(),
            variance: allocation.variance,
            status: allocation.status.label().to_string(),
            month: allocation.month.clone(),
            responsible: allocation.responsible.clone(),
            notes: allocation.notes.clone(),
            created_at: Some(allocation.created_at.to_rfc3339()),
            updated_at: Some(allocation.updated_at.to_rfc3339()),
        }
    }
}

/// Serialized form of a whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "Projects", alias = "projects")]
    projects: Option<Vec<ItemRecord>>,
    #[serde(rename = "Tasks", alias = "tasks", default)]
    tasks: Vec<ItemRecord>,
    #[serde(rename = "Sources", alias = "sources")]
    sources: Option<Vec<SourceRecord>>,
    #[serde(rename = "Allocations", alias = "allocations")]
    allocations: Option<Vec<AllocationRecord>>,
    #[serde(rename = "Users", alias = "users", default)]
    users: Vec<User>,
    #[serde(rename = "Parameters", alias = "parameters", default)]
    parameters: Vec<Parameter>,
    #[serde(rename = "MonthlyData", alias = "monthly_data", default)]
    monthly_data: Vec<MonthlyData>,
    #[serde(rename = "Audit", alias = "audit_trail", default)]
    audit: Vec<AuditEvent>,
    #[serde(rename = "NextIds", default)]
    next_ids: IdCounters,
}

/// What an import brought in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Projects loaded
    pub projects: usize,
    /// Tasks loaded
    pub tasks: usize,
    /// Sources loaded
    pub sources: usize,
    /// Allocations loaded
    pub allocations: usize,
    /// Tasks skipped because their project is missing
    pub dropped_tasks: usize,
    /// Allocations skipped because their source or task is missing
    pub dropped_allocations: usize,
    /// Cached totals that disagreed with the allocations
    pub reconciled: ReconcileReport,
}

impl Snapshot {
    /// Parses a JSON document, unwrapping an `appData` envelope if present.
    ///
    /// # Errors
    /// `Error::Import` when the text is not JSON, a collection has the wrong
    /// shape, or `Projects`, `Sources` or `Allocations` is missing.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| Error::import(format!("unreadable document: {e}")))?;
        if let Some(inner) = value.get_mut("appData") {
            value = inner.take();
        }
        if !value.is_object() {
            return Err(Error::import("document is not a JSON object"));
        }
        let snapshot: Self = serde_json::from_value(value)
            .map_err(|e| Error::import(format!("malformed collection: {e}")))?;

        for (name, present) in [
            ("Projects", snapshot.projects.is_some()),
            ("Sources", snapshot.sources.is_some()),
            ("Allocations", snapshot.allocations.is_some()),
        ] {
            if !present {
                return Err(Error::import(format!("missing collection {name}")));
            }
        }
        Ok(snapshot)
    }

    /// Captures every collection of a ledger.
    #[must_use]
    pub fn from_ledger(ledger: &Ledger) -> Self {
        Self {
            projects: Some(ledger.projects.iter().map(ItemRecord::from_project).collect()),
            tasks: ledger.tasks.iter().map(ItemRecord::from_task).collect(),
            sources: Some(ledger.sources.iter().map(SourceRecord::from_source).collect()),
            allocations: Some(
                ledger
                    .allocations
                    .iter()
                    .map(AllocationRecord::from_allocation)
                    .collect(),
            ),
            users: ledger.users.clone(),
            parameters: ledger.parameters.clone(),
            monthly_data: ledger.monthly_data.clone(),
            audit: ledger.audit.clone(),
            next_ids: ledger.id_counters(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(std::io::Error::from)?)
    }

    /// Builds a complete ledger from the snapshot without touching any other.
    fn stage(self, ledger: &mut Ledger) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let mut task_rows = self.tasks;

        for record in self.projects.unwrap_or_default() {
            if record.parent_id.is_some() {
                task_rows.push(record);
                continue;
            }
            let id: ProjectId = record
                .id
                .parse()
                .map_err(|_| Error::import(format!("malformed project id '{}'", record.id)))?;
            if ledger.project(id).is_some() {
                return Err(Error::import(format!("duplicate project id {id}")));
            }
            ledger.projects.push(record.into_project(id));
        }

        for record in task_rows {
            let parent = record
                .parent_id
                .as_deref()
                .and_then(|raw| raw.parse::<ProjectId>().ok())
                .filter(|parent| ledger.project(*parent).is_some());
            let Some(parent) = parent else {
                warn!(
                    task = %record.id,
                    parent = ?record.parent_id,
                    "task without a known project dropped"
                );
                summary.dropped_tasks += 1;
                continue;
            };
            let id = TaskId::parse_with_parent(&record.id, parent)
                .map_err(|e| Error::import(e.to_string()))?;
            if ledger.task(id).is_some() {
                return Err(Error::import(format!("duplicate task id {id}")));
            }
            ledger.tasks.push(record.into_task(id));
        }

        for record in self.sources.unwrap_or_default() {
            let id: SourceId = record
                .id
                .parse()
                .map_err(|_| Error::import(format!("malformed source id '{}'", record.id)))?;
            if ledger.source(id).is_some() {
                return Err(Error::import(format!("duplicate source id {id}")));
            }
            ledger.sources.push(record.into_source(id));
        }

        ledger.users = self.users;
        ledger.parameters = self.parameters;
        ledger.monthly_data = self.monthly_data;
        ledger.audit = self.audit;
        ledger.seed_id_counters(self.next_ids);

        stage_allocations(ledger, self.allocations.unwrap_or_default(), &mut summary);

        summary.projects = ledger.projects.len();
        summary.tasks = ledger.tasks.len();
        summary.sources = ledger.sources.len();
        summary.allocations = ledger.allocations.len();
        summary.reconciled = ledger.reconcile();
        aggregate::recalc_all(ledger)?;
        Ok(summary)
    }
}

fn stage_allocations(
    ledger: &mut Ledger,
    records: Vec<AllocationRecord>,
    summary: &mut ImportSummary,
) {
    let now = Utc::now();
    let stamp = |raw: Option<&str>| -> DateTime<Utc> {
        raw.and_then(lenient::parse_timestamp).unwrap_or(now)
    };
    let mut taken: HashSet<u64> = HashSet::new();
    let mut unnumbered = Vec::new();

    for record in records {
        let source_id = record
            .source_id
            .parse::<SourceId>()
            .ok()
            .filter(|id| ledger.source(*id).is_some());
        let mut matches = ledger.tasks.iter().filter(|t| t.id.to_string() == record.task_id);
        let task_id = match (matches.next(), matches.next()) {
            (Some(task), None) => Some(task.id),
            _ => None,
        };
        let (Some(source_id), Some(task_id)) = (source_id, task_id) else {
            warn!(
                source = %record.source_id,
                task = %record.task_id,
                "allocation with unresolved references dropped"
            );
            summary.dropped_allocations += 1;
            continue;
        };

        let numeric = record
            .id
            .as_deref()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|id| *id > 0 && taken.insert(*id));
        if numeric.is_none() {
            unnumbered.push(ledger.allocations.len());
        }
        let mut allocation = Allocation {
            id: AllocationId(numeric.unwrap_or(0)),
            source_id,
            task_id,
            planned: record.planned,
            actual: record.actual,
            planned_date: record.planned_date,
            actual_date: record.actual_date,
            variance: 0.0,
            status: AllocationStatus::Planned,
            month: None,
            responsible: record.responsible,
            notes: record.notes,
            created_at: stamp(record.created_at.as_deref()),
            updated_at: stamp(record.updated_at.as_deref()),
        };
        allocation.refresh_derived();
        ledger.allocations.push(allocation);
    }

    for index in unnumbered {
        let id = ledger.next_allocation_id();
        ledger.allocations[index].id = id;
        debug!(id = %id, "allocation renumbered");
    }
}

impl Ledger {
    /// Replaces every collection with the snapshot's contents.
    ///
    /// The replacement is reconciled and aggregated before it is swapped in,
    /// and an `IMPORT` event is added to its audit trail. Settings are kept.
    ///
    /// # Errors
    /// `Error::Import` for malformed or duplicate ids; the ledger is unchanged.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) -> Result<ImportSummary> {
        let mut staged = Self::new(self.settings.clone());
        let summary = snapshot.stage(&mut staged)?;
        staged.record(
            AuditAction::Import,
            "Snapshot",
            "",
            format!(
                "{} projects, {} tasks, {} sources, {} allocations",
                summary.projects, summary.tasks, summary.sources, summary.allocations
            ),
        );
        *self = staged;

        info!(
            projects = summary.projects,
            tasks = summary.tasks,
            sources = summary.sources,
            allocations = summary.allocations,
            dropped = summary.dropped_allocations,
            "snapshot loaded"
        );
        Ok(summary)
    }
}

/// Reads a snapshot file into the ledger.
///
/// # Arguments
/// * `ledger` - Ledger to replace
/// * `path` - JSON file to read
pub async fn import_file(ledger: &mut Ledger, path: impl AsRef<Path>) -> Result<ImportSummary> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    let snapshot = Snapshot::from_json(&raw)?;
    info!(path = %path.display(), "importing snapshot");
    ledger.load_snapshot(snapshot)
}

/// Writes the ledger to a snapshot file.
///
/// # Arguments
/// * `ledger` - Ledger to save
/// * `path` - JSON file to write, replaced if it exists
pub async fn export_file(ledger: &Ledger, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = Snapshot::from_ledger(ledger).to_json()?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), allocations = ledger.allocations.len(), "snapshot exported");
    Ok(())
}
