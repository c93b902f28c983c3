//! Source entity - a pool of funds that allocations draw from.

use super::date::LooseDate;
use super::ids::SourceId;

/// Funding source (salary, savings, sale proceeds, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Identifier (`S<n>`)
    pub id: SourceId,
    /// Display name
    pub name: String,
    /// Kind of source, e.g. "Salaire" or "Fond d'urgence"
    pub source_type: String,
    /// Total amount available
    pub available: f64,
    /// Sum of `max(planned, actual)` over this source's allocations
    pub allocated: f64,
    /// `available - allocated`, may be negative when strict mode is off
    pub remaining: f64,
    /// `allocated / available * 100`, 0 when nothing is available
    pub allocation_rate: f64,
    /// When the funds become available
    pub availability_date: Option<LooseDate>,
    /// Person in charge
    pub responsible: String,
    /// Status label, e.g. "ACTIF"
    pub status: String,
    /// "Récurrent" or "Ponctuel"
    pub regularity: String,
    /// Payment frequency, free text
    pub frequency: String,
    /// Free-form notes
    pub notes: String,
}

impl Source {
    /// Re-derives `remaining` and `allocation_rate` from the allocated projection.
    pub fn refresh_balance(&mut self) {
        self.remaining = self.available - self.allocated;
        self.allocation_rate = if self.available > 0.0 {
            self.allocated / self.available * 100.0
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    fn source(available: f64, allocated: f64) -> Source {
        Source {
            id: SourceId(1),
            name: "Salaire".into(),
            source_type: String::new(),
            available,
            allocated,
            remaining: 0.0,
            allocation_rate: 0.0,
            availability_date: None,
            responsible: String::new(),
            status: String::new(),
            regularity: String::new(),
            frequency: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_refresh_balance() {
        let mut s = source(1_000.0, 250.0);
        s.refresh_balance();
        assert_eq!(s.remaining, 750.0);
        assert_eq!(s.allocation_rate, 25.0);
    }

    #[test]
    fn test_refresh_balance_zero_available() {
        let mut s = source(0.0, 100.0);
        s.refresh_balance();
        assert_eq!(s.remaining, -100.0);
        assert_eq!(s.allocation_rate, 0.0);
    }
}
