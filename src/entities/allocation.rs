//! Allocation entity - a planned or realised transfer from a source to a task.
//!
//! An allocation consumes `max(planned, actual)` of capacity on both sides.

use super::date::LooseDate;
use super::ids::{AllocationId, SourceId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether money has actually moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllocationStatus {
    /// Only planned so far
    #[default]
    #[serde(rename = "Planifié", alias = "PLANIFIÉ")]
    Planned,
    /// An actual amount was recorded
    #[serde(rename = "Réalisé", alias = "RÉALISÉ")]
    Realized,
}

impl AllocationStatus {
    /// Label used in exports and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Planned => "Planifié",
            Self::Realized => "Réalisé",
        }
    }

    /// Derived from the actual amount.
    #[must_use]
    pub fn from_actual(actual: f64) -> Self {
        if actual > 0.0 {
            Self::Realized
        } else {
            Self::Planned
        }
    }
}

/// Source-to-task allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Identifier
    pub id: AllocationId,
    /// Funding source
    pub source_id: SourceId,
    /// Funded task
    pub task_id: TaskId,
    /// Planned amount
    pub planned: f64,
    /// Actual amount, 0 while only planned
    pub actual: f64,
    /// Planned transfer date
    pub planned_date: Option<LooseDate>,
    /// Actual transfer date
    pub actual_date: Option<LooseDate>,
    /// `actual - planned`
    pub variance: f64,
    /// Derived from `actual`
    pub status: AllocationStatus,
    /// `YYYY-MM` of the planned date
    pub month: Option<String>,
    /// Person in charge
    pub responsible: String,
    /// Free-form notes
    pub notes: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Allocation {
    /// Capacity consumed on the source and on the task.
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.planned.max(self.actual)
    }

    /// Date used to place the allocation in a period: planned, else actual.
    #[must_use]
    pub fn effective_date(&self) -> Option<&LooseDate> {
        self.planned_date.as_ref().or(self.actual_date.as_ref())
    }

    /// Re-derives variance, status and month from the amounts and dates.
    pub fn refresh_derived(&mut self) {
        self.variance = self.actual - self.planned;
        self.status = AllocationStatus::from_actual(self.actual);
        self.month = self.planned_date.as_ref().and_then(LooseDate::month_key);
    }
}
