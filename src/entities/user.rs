//! Household member - reference data for responsibles and beneficiaries.

use super::date::LooseDate;
use super::lenient;
use serde::{Deserialize, Serialize};

/// A member of the household.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Free-form identifier, e.g. `U1`
    #[serde(deserialize_with = "lenient::key")]
    pub id: String,
    /// Name shown in pickers
    #[serde(default, deserialize_with = "lenient::text")]
    pub full_name: String,
    /// Household role, e.g. "Parent"
    #[serde(default, deserialize_with = "lenient::text")]
    pub role: String,
    /// Beneficiary category
    #[serde(default, deserialize_with = "lenient::text")]
    pub beneficiary_type: String,
    /// Contact email
    #[serde(default, deserialize_with = "lenient::text")]
    pub email: String,
    /// Contact phone
    #[serde(default, deserialize_with = "lenient::text")]
    pub phone: String,
    /// Birth date
    #[serde(default, with = "super::date::optional")]
    pub birth_date: Option<LooseDate>,
    /// Relation to the household head
    #[serde(default, deserialize_with = "lenient::text")]
    pub family_relation: String,
    /// Priority when splitting allocations
    #[serde(default, deserialize_with = "lenient::text")]
    pub allocation_priority: String,
    /// Status label, e.g. "Actif"
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: String,
    /// Free-form notes
    #[serde(default, deserialize_with = "lenient::text", alias = "note")]
    pub notes: String,
}
