//! Project and task entities - the budget hierarchy.
//!
//! A project is a top-level budget container; a task is a budget line under a
//! project and the only thing allocations fund. Both carry the same planning
//! fields, and once a project has tasks its rollup fields are derived from them.

use super::date::LooseDate;
use super::ids::{ProjectId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by projects and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Not started
    #[default]
    #[serde(rename = "Planifié", alias = "PLANIFIÉ", alias = "Planifie")]
    Planned,
    /// Under way
    #[serde(rename = "En cours", alias = "EN COURS")]
    InProgress,
    /// Fully funded or finished
    #[serde(rename = "Terminé", alias = "TERMINÉ", alias = "Termine")]
    Done,
    /// Behind schedule
    #[serde(rename = "Retard", alias = "RETARD")]
    Late,
}

impl Status {
    /// Label used in exports and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Planned => "Planifié",
            Self::InProgress => "En cours",
            Self::Done => "Terminé",
            Self::Late => "Retard",
        }
    }

    /// Reads a status label in any case, with or without accents.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "PLANIFIÉ" | "PLANIFIE" => Some(Self::Planned),
            "EN COURS" => Some(Self::InProgress),
            "TERMINÉ" | "TERMINE" => Some(Self::Done),
            "RETARD" => Some(Self::Late),
            _ => None,
        }
    }

    /// Counted as active on the dashboard.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Planned | Self::InProgress)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Severity rank of a priority label; unknown labels rank 0.
#[must_use]
pub fn priority_rank(priority: &str) -> u8 {
    match priority {
        "Critique" => 4,
        "Haute" => 3,
        "Moyenne" => 2,
        "Basse" => 1,
        _ => 0,
    }
}

/// Top-level project.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Identifier (`P<n>`)
    pub id: ProjectId,
    /// Display name
    pub name: String,
    /// Budget category (e.g. "Immobilier & Foncier")
    pub category: String,
    /// Asset classification used by the Kiyosaki analysis
    pub kiyosaki_type: String,
    /// Who benefits (e.g. "Famille")
    pub beneficiary: String,
    /// Priority label (Critique, Haute, Moyenne, Basse)
    pub priority: String,
    /// Total budget
    pub budget: f64,
    /// Amount funded by allocations
    pub allocated: f64,
    /// `budget - allocated`, may be negative when over-allocated
    pub remaining: f64,
    /// Completion percentage, 0-100
    pub progress: f64,
    /// Lifecycle status
    pub status: Status,
    /// Probability of success, 0-100
    pub probability: f64,
    /// Expected return on investment, in percent
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

/// Budget line under a project.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Identifier (parent number plus sequence)
    pub id: TaskId,
    /// Display name
    pub name: String,
    /// Budget category
    pub category: String,
    /// Asset classification
    pub kiyosaki_type: String,
    /// Who benefits
    pub beneficiary: String,
    /// Priority label
    pub priority: String,
    /// Budget for this line
    pub budget: f64,
    /// Sum of `max(planned, actual)` over this task's allocations
    pub allocated: f64,
    /// `budget - allocated`, not clamped
    pub remaining: f64,
    /// Completion percentage, 0-100
    pub progress: f64,
    /// Lifecycle status
    pub status: Status,
    /// Probability of success, 0-100
    pub probability: f64,
    /// Expected return on investment, in percent
    pub roi: f64,
    /// Planned start
    pub start_date: Option<LooseDate>,
    /// Planned end
    pub end_date: Option<LooseDate>,
    /// Date the task was fully funded by realised allocations
    pub realized_date: Option<LooseDate>,
    /// Person in charge
    pub responsible: String,
    /// Task this one waits on, free text
    pub dependency: Option<String>,
    /// Free-form notes
    pub notes: String,
}

impl Task {
    /// The parent project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.id.project_id()
    }

    /// Re-derives `remaining` from the budget and the allocated projection.
    pub fn refresh_remaining(&mut self) {
        self.remaining = self.budget - self.allocated;
    }
}

impl Project {
    /// Re-derives `remaining` from budget and allocated.
    pub fn refresh_remaining(&mut self) {
        self.remaining = self.budget - self.allocated;
    }
}
