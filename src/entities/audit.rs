//! Audit trail entries.

use super::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// Record added
    Create,
    /// Record modified
    Update,
    /// Record removed
    Delete,
    /// Whole snapshot replaced
    Import,
    /// Data written out
    Export,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Import => "IMPORT",
            Self::Export => "EXPORT",
        };
        f.write_str(label)
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Sequential id, newest highest
    #[serde(default)]
    pub id: u64,
    /// Kind of change
    pub action: AuditAction,
    /// Entity kind, e.g. "Allocation"
    #[serde(default, deserialize_with = "lenient::text")]
    pub entity: String,
    /// Display id of the entity, empty for ledger-wide events
    #[serde(default, deserialize_with = "lenient::key")]
    pub entity_id: String,
    /// Acting user
    #[serde(default, deserialize_with = "lenient::text")]
    pub user: String,
    /// When the change happened
    #[serde(deserialize_with = "lenient::timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Human-readable summary
    #[serde(default)]
    pub details: String,
    /// Field-level changes, free-form
    #[serde(default)]
    pub changes: serde_json::Value,
}
