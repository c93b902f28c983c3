//! Advisory analyses shown next to the dashboard.
//!
//! Each analysis reads the projects and sources of the period and reduces them
//! to a handful of ratios plus a recommendation tier.

use crate::{
    core::kpi::{View, percent},
    core::period::Window,
    entities::{Project, Source},
    store::Ledger,
};

const EMERGENCY_FUND_TYPE: &str = "Fond d'urgence";
const DEFAULT_KIYOSAKI_TYPE: &str = "Actif générateur";

/// Budgets per cashflow quadrant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KiyosakiQuadrants {
    /// `Actif générateur`
    pub employee: f64,
    /// `Actif spéculatif`
    pub self_employed: f64,
    /// `Passif`
    pub business: f64,
    /// `Dépense`
    pub investor: f64,
}

impl KiyosakiQuadrants {
    /// Sum of the four quadrants.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.employee + self.self_employed + self.business + self.investor
    }

    /// Recommendation derived from the employee and investor shares.
    #[must_use]
    pub fn tier(&self) -> KiyosakiTier {
        let total = self.total();
        let employee = percent(self.employee, total);
        let investor = percent(self.investor, total);
        if employee > 80.0 {
            KiyosakiTier::EmployeeDependent
        } else if investor > 40.0 {
            KiyosakiTier::Balanced
        } else if investor < 20.0 {
            KiyosakiTier::GrowInvestor
        } else {
            KiyosakiTier::BuildPassiveIncome
        }
    }
}

/// Kiyosaki recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KiyosakiTier {
    /// Over 80% of the budget in the employee quadrant
    EmployeeDependent,
    /// Over 40% in the investor quadrant
    Balanced,
    /// Under 20% in the investor quadrant
    GrowInvestor,
    /// Anything in between
    BuildPassiveIncome,
}

/// Investment return figures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuffettAnalysis {
    /// Sum of available funds
    pub total_value: f64,
    /// Sum of project allocations
    pub total_allocated: f64,
    /// Sum of project budgets
    pub total_budget: f64,
    /// Mean project ROI, also reported as the IRR
    pub roi: f64,
    /// `budget / allocated * 12`
    pub payback_months: f64,
    /// `value - allocated`
    pub npv: f64,
    /// `allocated / value * 100`
    pub allocation_rate: f64,
}

impl BuffettAnalysis {
    /// Internal rate of return, approximated by the mean ROI.
    #[must_use]
    pub const fn irr(&self) -> f64 {
        self.roi
    }

    /// Recommendation derived from the IRR.
    #[must_use]
    pub fn tier(&self) -> ReturnTier {
        match self.irr() {
            irr if irr > 15.0 => ReturnTier::Excellent,
            irr if irr > 10.0 => ReturnTier::Good,
            irr if irr > 5.0 => ReturnTier::Average,
            _ => ReturnTier::Weak,
        }
    }
}

/// Buffett recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTier {
    /// IRR above 15%
    Excellent,
    /// IRR above 10%
    Good,
    /// IRR above 5%
    Average,
    /// Anything lower
    Weak,
}

/// Debt and emergency-fund figures, with Baby Steps progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RamseyAnalysis {
    /// Sum of project budgets
    pub total_budget: f64,
    /// Sum of project allocations
    pub total_allocated: f64,
    /// Sum of available funds
    pub total_value: f64,
    /// Funds held in emergency sources
    pub emergency_fund: f64,
    /// `allocated / budget * 100`
    pub debt_ratio: f64,
    /// `allocated / value * 100`
    pub expense_ratio: f64,
    /// Progress of steps 1 to 7, each 0 or 100
    pub baby_steps: [u8; 7],
}

impl RamseyAnalysis {
    /// First step not yet reached (1-based), `None` once all seven are.
    #[must_use]
    pub fn current_step(&self) -> Option<u8> {
        self.baby_steps
            .iter()
            .zip(1u8..)
            .find(|(progress, _)| **progress == 0)
            .map(|(_, step)| step)
    }
}

/// Household health ratios.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FamilyCanvas {
    /// Sum of available funds
    pub total_value: f64,
    /// Sum of project budgets
    pub total_budget: f64,
    /// Sum of project allocations
    pub total_allocated: f64,
    /// `allocated / budget * 100`
    pub completion_rate: f64,
    /// Share of funds held in emergency sources
    pub emergency_ratio: f64,
    /// `allocated / budget * 100`
    pub debt_ratio: f64,
    /// `(value - allocated) / value * 100`
    pub savings_rate: f64,
}

/// All four analyses over one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Analyses {
    /// Cashflow quadrants
    pub kiyosaki: KiyosakiQuadrants,
    /// Returns
    pub buffett: BuffettAnalysis,
    /// Baby Steps
    pub ramsey: RamseyAnalysis,
    /// Household ratios
    pub canvas: FamilyCanvas,
}

struct Totals {
    value: f64,
    budget: f64,
    allocated: f64,
}

impl Totals {
    fn of(projects: &[&Project], sources: &[&Source]) -> Self {
        Self {
            value: sources.iter().map(|s| s.available).sum(),
            budget: projects.iter().map(|p| p.budget).sum(),
            allocated: projects.iter().map(|p| p.allocated).sum(),
        }
    }
}

fn step(reached: bool) -> u8 {
    if reached { 100 } else { 0 }
}

/// Sums project budgets by Kiyosaki quadrant.
///
/// Projects without a type count as `Actif générateur`; unknown types are
/// ignored.
#[must_use]
pub fn kiyosaki(projects: &[&Project]) -> KiyosakiQuadrants {
    let mut quadrants = KiyosakiQuadrants::default();
    for project in projects {
        let kind = match project.kiyosaki_type.trim() {
            "" => DEFAULT_KIYOSAKI_TYPE,
            kind => kind,
        };
        let slot = match kind {
            "Actif générateur" => &mut quadrants.employee,
            "Actif spéculatif" => &mut quadrants.self_employed,
            "Passif" => &mut quadrants.business,
            "Dépense" => &mut quadrants.investor,
            _ => continue,
        };
        *slot += project.budget;
    }
    quadrants
}

/// Computes the return figures.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn buffett(projects: &[&Project], sources: &[&Source]) -> BuffettAnalysis {
    let totals = Totals::of(projects, sources);
    let roi = if projects.is_empty() {
        0.0
    } else {
        projects.iter().map(|p| p.roi).sum::<f64>() / projects.len() as f64
    };
    BuffettAnalysis {
        total_value: totals.value,
        total_allocated: totals.allocated,
        total_budget: totals.budget,
        roi,
        payback_months: if totals.allocated > 0.0 {
            totals.budget / totals.allocated * 12.0
        } else {
            0.0
        },
        npv: totals.value - totals.allocated,
        allocation_rate: percent(totals.allocated, totals.value),
    }
}

/// Computes the Baby Steps progress.
///
/// A source counts toward the emergency fund when its type is
/// `Fond d'urgence` or its name mentions "urgence".
#[must_use]
pub fn ramsey(projects: &[&Project], sources: &[&Source]) -> RamseyAnalysis {
    let totals = Totals::of(projects, sources);
    let emergency_fund: f64 = sources
        .iter()
        .filter(|s| {
            s.source_type == EMERGENCY_FUND_TYPE || s.name.to_lowercase().contains("urgence")
        })
        .map(|s| s.available)
        .sum();
    let debt_ratio = percent(totals.allocated, totals.budget);
    let expense_ratio = percent(totals.allocated, totals.value);

    RamseyAnalysis {
        total_budget: totals.budget,
        total_allocated: totals.allocated,
        total_value: totals.value,
        emergency_fund,
        debt_ratio,
        expense_ratio,
        baby_steps: [
            step(emergency_fund > 0.0),
            step(debt_ratio < 50.0),
            step(emergency_fund > totals.allocated * 3.0),
            step(expense_ratio < 25.0),
            step(expense_ratio < 20.0),
            step(expense_ratio < 15.0),
            step(expense_ratio < 10.0),
        ],
    }
}

/// Computes the household ratios. Only sources typed `Fond d'urgence` count as
/// emergency funds here.
#[must_use]
pub fn family_canvas(projects: &[&Project], sources: &[&Source]) -> FamilyCanvas {
    let totals = Totals::of(projects, sources);
    let emergency: f64 = sources
        .iter()
        .filter(|s| s.source_type == EMERGENCY_FUND_TYPE)
        .map(|s| s.available)
        .sum();
    let ratio = percent(totals.allocated, totals.budget);
    FamilyCanvas {
        total_value: totals.value,
        total_budget: totals.budget,
        total_allocated: totals.allocated,
        completion_rate: ratio,
        emergency_ratio: percent(emergency, totals.value),
        debt_ratio: ratio,
        savings_rate: percent(totals.value - totals.allocated, totals.value),
    }
}

/// Runs every analysis over the projects and sources of a period.
///
/// # Arguments
/// * `ledger` - The ledger to read
/// * `window` - Period to restrict to, `None` for everything
#[must_use]
pub fn analyze(ledger: &Ledger, window: Option<&Window>) -> Analyses {
    let view = View::new(ledger, window);
    Analyses {
        kiyosaki: kiyosaki(&view.projects),
        buffett: buffett(&view.projects, &view.sources),
        ramsey: ramsey(&view.projects, &view.sources),
        canvas: family_canvas(&view.projects, &view.sources),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::errors::Result;
    use crate::test_utils::*;

    #[test]
    fn test_kiyosaki_quadrants_and_tier() -> Result<()> {
        let mut ledger = setup_ledger();
        let salary = create_test_project(&mut ledger, "Emploi")?.id;
        let rent = create_test_project(&mut ledger, "Location")?.id;
        let odd = create_test_project(&mut ledger, "Autre")?.id;
        ledger.project_mut(salary)?.budget = 600.0;
        ledger.project_mut(rent)?.budget = 400.0;
        ledger.project_mut(rent)?.kiyosaki_type = "Dépense".into();
        ledger.project_mut(odd)?.budget = 1_000.0;
        ledger.project_mut(odd)?.kiyosaki_type = "Inconnu".into();

        let quadrants = analyze(&ledger, None).kiyosaki;
        assert_eq!(quadrants.employee, 600.0);
        assert_eq!(quadrants.investor, 400.0);
        assert_eq!(quadrants.total(), 1_000.0);
        // 40% investor is not above the balanced threshold
        assert_eq!(quadrants.tier(), KiyosakiTier::BuildPassiveIncome);
        Ok(())
    }

    #[test]
    fn test_kiyosaki_tiers() {
        let q = |employee, investor| KiyosakiQuadrants {
            employee,
            investor,
            ..KiyosakiQuadrants::default()
        };
        assert_eq!(q(90.0, 10.0).tier(), KiyosakiTier::EmployeeDependent);
        assert_eq!(q(50.0, 50.0).tier(), KiyosakiTier::Balanced);
        assert_eq!(q(85.0, 15.0).tier(), KiyosakiTier::EmployeeDependent);
        assert_eq!(q(70.0, 10.0).tier(), KiyosakiTier::GrowInvestor);
        assert_eq!(q(70.0, 30.0).tier(), KiyosakiTier::BuildPassiveIncome);
        assert_eq!(KiyosakiQuadrants::default().tier(), KiyosakiTier::GrowInvestor);
    }

    #[test]
    fn test_buffett_figures() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(1_000_000.0, 500_000.0)?;
        create_test_allocation(&mut ledger, source, task, 250_000.0, 0.0)?;
        ledger.project_mut(task.project_id())?.roi = 12.0;

        let buffett = analyze(&ledger, None).buffett;
        assert_eq!(buffett.total_value, 1_000_000.0);
        assert_eq!(buffett.total_allocated, 250_000.0);
        assert_eq!(buffett.payback_months, 24.0);
        assert_eq!(buffett.npv, 750_000.0);
        assert_eq!(buffett.allocation_rate, 25.0);
        assert_eq!(buffett.irr(), 12.0);
        assert_eq!(buffett.tier(), ReturnTier::Good);
        Ok(())
    }

    #[test]
    fn test_ramsey_steps() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(100_000.0, 100_000.0)?;
        create_test_source(&mut ledger, "Épargne urgence", 50_000.0)?;
        create_test_allocation(&mut ledger, source, task, 15_000.0, 0.0)?;

        let ramsey = analyze(&ledger, None).ramsey;
        assert_eq!(ramsey.emergency_fund, 50_000.0);
        assert_eq!(ramsey.debt_ratio, 15.0);
        assert_eq!(ramsey.expense_ratio, 10.0);
        assert_eq!(ramsey.baby_steps, [100, 100, 100, 100, 100, 100, 0]);
        assert_eq!(ramsey.current_step(), Some(7));
        Ok(())
    }

    #[test]
    fn test_ramsey_without_emergency_fund() {
        let ramsey = analyze(&setup_ledger(), None).ramsey;
        assert_eq!(ramsey.baby_steps[0], 0);
        assert_eq!(ramsey.current_step(), Some(1));
    }

    #[test]
    fn test_family_canvas() -> Result<()> {
        let (mut ledger, source, task) = setup_funded_task(80_000.0, 100_000.0)?;
        let reserve = create_test_source(&mut ledger, "Réserve", 20_000.0)?.id;
        ledger.source_mut(reserve)?.source_type = "Fond d'urgence".into();
        create_test_allocation(&mut ledger, source, task, 40_000.0, 0.0)?;

        let canvas = analyze(&ledger, None).canvas;
        assert_eq!(canvas.completion_rate, 40.0);
        assert_eq!(canvas.emergency_ratio, 20.0);
        assert_eq!(canvas.savings_rate, 60.0);
        Ok(())
    }
}
