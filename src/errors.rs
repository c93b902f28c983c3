//! Unified error types and result handling.

use std::fmt;
use thiserror::Error;

/// Kind of record an id failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Top-level project
    Project,
    /// Task under a project
    Task,
    /// Funding source
    Source,
    /// Source-to-task allocation
    Allocation,
    /// Household member
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Project => "Project",
            Self::Task => "Task",
            Self::Source => "Source",
            Self::Allocation => "Allocation",
            Self::User => "User",
        };
        f.write_str(name)
    }
}

/// Which side of an allocation ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacitySide {
    /// The funding source
    Source,
    /// The funded task
    Task,
}

impl fmt::Display for CapacitySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Task => f.write_str("task"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("Amount {requested:.2} exceeds {side} remaining capacity of {remaining:.2}")]
    CapacityExceeded {
        side: CapacitySide,
        remaining: f64,
        requested: f64,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Import error: {message}")]
    Import { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn import(message: impl Into<String>) -> Self {
        Self::Import {
            message: message.into(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
