//! Source business logic - pools of funds allocations draw on.

use crate::{
    core::{aggregate, allocation},
    entities::{AuditAction, LooseDate, Source, SourceId},
    errors::{EntityKind, Error, Result},
    store::Ledger,
};
use tracing::{debug, info};

/// User-supplied fields of a source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceDraft {
    /// Display name
    pub name: String,
    /// Kind of source
    pub source_type: String,
    /// Total amount available
    pub available: f64,
    /// When the funds become available
    pub availability_date: Option<LooseDate>,
    /// Person in charge
    pub responsible: String,
    /// Status label
    pub status: String,
    /// "Récurrent" or "Ponctuel"
    pub regularity: String,
    /// Payment frequency
    pub frequency: String,
    /// Free-form notes
    pub notes: String,
}

impl SourceDraft {
    /// A draft with a name and an available amount.
    #[must_use]
    pub fn new(name: impl Into<String>, available: f64) -> Self {
        Self {
            name: name.into(),
            available,
            ..Self::default()
        }
    }
}

fn validate(draft: &SourceDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(Error::validation("source name cannot be empty"));
    }
    if !draft.available.is_finite() || draft.available < 0.0 {
        return Err(Error::validation(format!(
            "available amount must be a non-negative number, got {}",
            draft.available
        )));
    }
    Ok(())
}

fn write_fields(source: &mut Source, draft: SourceDraft) {
    source.name = draft.name.trim().to_string();
    source.source_type = draft.source_type;
    source.available = draft.available;
    source.availability_date = draft.availability_date;
    source.responsible = draft.responsible;
    source.status = draft.status;
    source.regularity = draft.regularity;
    source.frequency = draft.frequency;
    source.notes = draft.notes;
    source.refresh_balance();
}

/// Creates a source with nothing allocated yet.
pub fn create_source(ledger: &mut Ledger, draft: SourceDraft) -> Result<Source> {
    validate(&draft)?;
    let mut source = Source {
        id: ledger.next_source_id(),
        name: String::new(),
        source_type: String::new(),
        available: 0.0,
        allocated: 0.0,
        remaining: 0.0,
        allocation_rate: 0.0,
        availability_date: None,
        responsible: String::new(),
        status: String::new(),
        regularity: String::new(),
        frequency: String::new(),
        notes: String::new(),
    };
    write_fields(&mut source, draft);
    ledger.sources.push(source.clone());

    debug!(id = %source.id, available = source.available, "source created");
    ledger.record(
        AuditAction::Create,
        EntityKind::Source,
        source.id,
        source.name.clone(),
    );
    Ok(source)
}

/// Overwrites a source's fields; its allocated total is left to the allocations.
///
/// Lowering `available` below what is already allocated is allowed and shows
/// up as a negative remaining balance.
pub fn edit_source(ledger: &mut Ledger, id: SourceId, draft: SourceDraft) -> Result<Source> {
    validate(&draft)?;
    let source = ledger.source_mut(id)?;
    write_fields(source, draft);
    let source = source.clone();

    debug!(id = %id, remaining = source.remaining, "source edited");
    ledger.record(
        AuditAction::Update,
        EntityKind::Source,
        id,
        source.name.clone(),
    );
    Ok(source)
}

/// Deletes a source and every allocation drawing on it.
///
/// The allocations are reversed from their tasks and the affected projects
/// are re-aggregated.
pub fn delete_source(ledger: &mut Ledger, id: SourceId) -> Result<Source> {
    let index = ledger
        .sources
        .iter()
        .position(|s| s.id == id)
        .ok_or_else(|| Error::not_found(EntityKind::Source, id))?;
    let touched = allocation::remove_allocations_where(ledger, |a| a.source_id == id)?;
    let source = ledger.sources.remove(index);
    for project in touched {
        aggregate::aggregate_project(ledger, project)?;
    }

    info!(id = %id, name = %source.name, "source deleted");
    ledger.record(
        AuditAction::Delete,
        EntityKind::Source,
        id,
        source.name.clone(),
    );
    Ok(source)
}
