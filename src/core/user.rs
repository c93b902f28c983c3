//! Household members - reference data for responsibles and beneficiaries.

use crate::{
    entities::{AuditAction, LooseDate, User},
    errors::{EntityKind, Error, Result},
    store::Ledger,
};
use tracing::debug;

/// User-supplied fields of a household member.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserDraft {
    /// Name shown in pickers
    pub full_name: String,
    /// Household role
    pub role: String,
    /// Beneficiary category
    pub beneficiary_type: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Birth date
    pub birth_date: Option<LooseDate>,
    /// Relation to the household head
    pub family_relation: String,
    /// Priority when splitting allocations
    pub allocation_priority: String,
    /// Status label
    pub status: String,
    /// Free-form notes
    pub notes: String,
}

impl UserDraft {
    /// A draft with only a name.
    #[must_use]
    pub fn named(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Self::default()
        }
    }
}

fn build(id: String, draft: UserDraft) -> User {
    User {
        id,
        full_name: draft.full_name.trim().to_string(),
        role: draft.role,
        beneficiary_type: draft.beneficiary_type,
        email: draft.email,
        phone: draft.phone,
        birth_date: draft.birth_date,
        family_relation: draft.family_relation,
        allocation_priority: draft.allocation_priority,
        status: draft.status,
        notes: draft.notes,
    }
}

fn validate(draft: &UserDraft) -> Result<()> {
    if draft.full_name.trim().is_empty() {
        return Err(Error::validation("full name is required"));
    }
    Ok(())
}

/// Creates a member; the id is one past the highest numeric id in use.
pub fn create_user(ledger: &mut Ledger, draft: UserDraft) -> Result<User> {
    validate(&draft)?;
    let next = ledger
        .users
        .iter()
        .filter_map(|u| u.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let user = build(next.to_string(), draft);
    ledger.users.push(user.clone());

    debug!(id = %user.id, "user created");
    ledger.record(
        AuditAction::Create,
        EntityKind::User,
        &user.id,
        user.full_name.clone(),
    );
    Ok(user)
}

/// Overwrites a member's fields.
pub fn edit_user(ledger: &mut Ledger, id: &str, draft: UserDraft) -> Result<User> {
    validate(&draft)?;
    let slot = ledger
        .users
        .iter_mut()
        .find(|u| u.id == id)
        .ok_or_else(|| Error::not_found(EntityKind::User, id))?;
    *slot = build(id.to_string(), draft);
    let user = slot.clone();

    ledger.record(
        AuditAction::Update,
        EntityKind::User,
        id,
        user.full_name.clone(),
    );
    Ok(user)
}

/// Removes a member. Names already used as responsibles are left as text.
pub fn delete_user(ledger: &mut Ledger, id: &str) -> Result<User> {
    let index = ledger
        .users
        .iter()
        .position(|u| u.id == id)
        .ok_or_else(|| Error::not_found(EntityKind::User, id))?;
    let user = ledger.users.remove(index);
    ledger.record(
        AuditAction::Delete,
        EntityKind::User,
        id,
        user.full_name.clone(),
    );
    Ok(user)
}

/// Names offered when picking a responsible, in member order.
#[must_use]
pub fn responsible_names(ledger: &Ledger) -> Vec<String> {
    ledger
        .users
        .iter()
        .map(|u| u.full_name.clone())
        .filter(|name| !name.is_empty())
        .collect()
}
