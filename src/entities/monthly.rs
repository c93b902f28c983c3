//! Monthly reference series imported with the snapshot.

use super::lenient;
use serde::{Deserialize, Serialize};

/// Needs, allocations and revenues for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyData {
    /// `YYYY-MM`
    #[serde(deserialize_with = "lenient::key")]
    pub month: String,
    /// Budgeted needs
    #[serde(default, deserialize_with = "lenient::amount")]
    pub needs: f64,
    /// Planned allocations
    #[serde(default, deserialize_with = "lenient::amount")]
    pub allocations: f64,
    /// Actual spend, 0 until known
    #[serde(default, deserialize_with = "lenient::amount")]
    pub actual: f64,
    /// Income received
    #[serde(default, deserialize_with = "lenient::amount")]
    pub revenues: f64,
    /// Revenues minus spend
    #[serde(default, deserialize_with = "lenient::amount")]
    pub balance: f64,
    /// Tasks in progress that month
    #[serde(default, deserialize_with = "lenient::amount")]
    pub active_tasks: f64,
}

impl MonthlyData {
    /// Actual spend when recorded, otherwise the planned allocations.
    #[must_use]
    pub fn spend(&self) -> f64 {
        if self.actual > 0.0 {
            self.actual
        } else {
            self.allocations
        }
    }
}
