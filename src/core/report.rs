//! Report formatting.
//!
//! Turns the figures computed by the other engines into text. Nothing here
//! reads the ledger directly.

use crate::core::{
    analysis::{Analyses, KiyosakiTier, ReturnTier},
    kpi::{KpiSnapshot, SourceTotals},
    monthly::{MonthlyGauges, RunwayLevel},
};
use std::fmt;

/// Formats an amount as a space-grouped integer followed by the currency.
///
/// # Arguments
/// * `amount` - Amount to format, rounded to the unit
/// * `currency` - Label appended after the number, e.g. "FCFA"
///
/// # Returns
/// Formatted string like "1 250 000 FCFA"
#[must_use]
pub fn format_currency(amount: f64, currency: &str) -> String {
    // Cast safety: household amounts are far below i64::MAX.
    #[allow(clippy::cast_possible_truncation)]
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{sign}{grouped} {currency}")
}

/// Formats a percentage with one decimal, e.g. "22.5%".
#[must_use]
pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}

/// Amount as displayed: stored balances may be negative, displayed ones are not.
#[must_use]
pub fn display_amount(amount: f64) -> f64 {
    amount.max(0.0)
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `progress_percent` - Progress percentage (0-100)
/// * `bar_length` - Length of the progress bar in characters (default 10)
///
/// # Returns
/// Formatted progress bar string
#[must_use]
pub fn format_progress_bar(progress_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped_progress = progress_percent.clamp(0.0, 100.0);

    // Cast safety: clamped_progress ∈ [0, 100], length is small (10-20).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped_progress / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!(
        "[{}{}] {progress_percent:.1}%",
        "█".repeat(filled),
        "░".repeat(empty)
    )
}

const fn kiyosaki_advice(tier: KiyosakiTier) -> &'static str {
    match tier {
        KiyosakiTier::EmployeeDependent => {
            "Trop dépendant du salariat, diversifiez les quadrants S, B et I"
        }
        KiyosakiTier::Balanced => "Excellent équilibre des revenus",
        KiyosakiTier::GrowInvestor => "Objectif: porter le quadrant I à 40%",
        KiyosakiTier::BuildPassiveIncome => "Continuez à développer les revenus passifs",
    }
}

const fn return_advice(tier: ReturnTier) -> &'static str {
    match tier {
        ReturnTier::Excellent => "Excellent rendement",
        ReturnTier::Good => "Bon rendement",
        ReturnTier::Average => "Rendement moyen",
        ReturnTier::Weak => "Rendement faible",
    }
}

const fn runway_label(level: RunwayLevel) -> &'static str {
    match level {
        RunwayLevel::Critical => "critique",
        RunwayLevel::Warning => "à surveiller",
        RunwayLevel::Healthy => "sain",
    }
}

/// The text dashboard; render it with `to_string()` or `{}`.
#[derive(Debug, Clone, Copy)]
pub struct Dashboard<'a> {
    /// Headline indicators
    pub kpis: &'a KpiSnapshot,
    /// Funding totals, with the period breakdown when filtering
    pub totals: &'a SourceTotals,
    /// Advisory analyses, omitted when `None`
    pub analyses: Option<&'a Analyses>,
    /// Monthly gauges, omitted when there is no monthly data
    pub gauges: Option<&'a MonthlyGauges>,
    /// Currency label for amounts
    pub currency: &'a str,
}

impl Dashboard<'_> {
    fn money(&self, amount: f64) -> String {
        format_currency(amount, self.currency)
    }

    fn write_kpis(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kpis = self.kpis;
        writeln!(f, "== Tableau de bord ==")?;
        writeln!(f, "Projets actifs      {}", kpis.active_projects)?;
        writeln!(f, "Budget total        {}", self.money(kpis.total_budget))?;
        writeln!(f, "Utilisé             {}", self.money(kpis.total_used))?;
        writeln!(f, "Progression         {}", format_progress_bar(kpis.average_progress, None))?;
        writeln!(f, "Cash-flow net       {}", self.money(kpis.net_cash_flow))?;
        writeln!(f, "Patrimoine          {}", self.money(kpis.net_worth))?;
        writeln!(f, "Tâches en retard    {}", kpis.overdue_tasks)?;
        writeln!(f, "Taux d'utilisation  {}", format_percentage(kpis.savings_rate))?;
        writeln!(f, "Dette / revenus     {}", format_percentage(kpis.debt_to_income))?;
        writeln!(f, "ROI moyen           {}", format_percentage(kpis.avg_roi))?;
        writeln!(f, "Probabilité moyenne {}", format_percentage(kpis.avg_probability))?;
        writeln!(f, "Projets terminés    {}", kpis.project_velocity)
    }

    fn write_sources(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = self.totals;
        writeln!(f, "\n== Sources ==")?;
        writeln!(f, "Disponible          {}", self.money(totals.available))?;
        writeln!(f, "Alloué              {}", self.money(totals.allocated))?;
        writeln!(f, "Restant             {}", self.money(display_amount(totals.remaining)))?;
        writeln!(f, "Taux d'allocation   {}", format_progress_bar(totals.rate, None))?;
        if let Some(split) = &totals.breakdown {
            writeln!(
                f,
                "Période             {} disponibles, {} allouées, {} restantes",
                self.money(split.available_this_period),
                self.money(split.allocated_this_period),
                self.money(split.remaining_this_period)
            )?;
            writeln!(
                f,
                "Avant la période    {} disponibles, {} allouées, {} restantes",
                self.money(split.available_previous),
                self.money(split.allocated_previous),
                self.money(split.remaining_previous)
            )?;
        }
        Ok(())
    }

    fn write_gauges(f: &mut fmt::Formatter<'_>, gauges: &MonthlyGauges) -> fmt::Result {
        writeln!(f, "\n== Mois {} ==", gauges.month)?;
        writeln!(f, "Couverture          {}", format_progress_bar(gauges.coverage, None))?;
        writeln!(
            f,
            "Épargne             {} (objectif {})",
            format_percentage(gauges.savings_rate),
            format_percentage(gauges.savings_target)
        )?;
        writeln!(
            f,
            "Runway              {:.1} mois ({})",
            gauges.runway_months,
            runway_label(gauges.runway_level)
        )
    }

    fn write_analyses(&self, f: &mut fmt::Formatter<'_>, analyses: &Analyses) -> fmt::Result {
        let k = &analyses.kiyosaki;
        writeln!(f, "\n== Analyses ==")?;
        writeln!(
            f,
            "Kiyosaki  E {} | S {} | B {} | I {}",
            self.money(k.employee),
            self.money(k.self_employed),
            self.money(k.business),
            self.money(k.investor)
        )?;
        writeln!(f, "          {}", kiyosaki_advice(k.tier()))?;

        let b = &analyses.buffett;
        writeln!(
            f,
            "Buffett   TRI {} | retour {:.1} mois | VAN {}",
            format_percentage(b.irr()),
            b.payback_months,
            self.money(b.npv)
        )?;
        writeln!(f, "          {}", return_advice(b.tier()))?;

        match analyses.ramsey.current_step() {
            Some(step) => writeln!(f, "Ramsey    étape {step} sur 7")?,
            None => writeln!(f, "Ramsey    les 7 étapes sont atteintes")?,
        }

        let c = &analyses.canvas;
        writeln!(
            f,
            "Canvas    réalisation {} | urgence {} | épargne {}",
            format_percentage(c.completion_rate),
            format_percentage(c.emergency_ratio),
            format_percentage(c.savings_rate)
        )
    }
}

impl fmt::Display for Dashboard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_kpis(f)?;
        self.write_sources(f)?;
        if let Some(gauges) = self.gauges {
            Self::write_gauges(f, gauges)?;
        }
        if let Some(analyses) = self.analyses {
            self.write_analyses(f, analyses)?;
        }
        Ok(())
    }
}

/// Renders the text dashboard.
///
/// # Arguments
/// * `kpis` - Headline indicators
/// * `totals` - Funding totals, with the period breakdown when filtering
/// * `analyses` - Advisory analyses, omitted when `None`
/// * `gauges` - Monthly gauges, omitted when there is no monthly data
/// * `currency` - Currency label for amounts
#[must_use]
pub fn format_dashboard(
    kpis: &KpiSnapshot,
    totals: &SourceTotals,
    analyses: Option<&Analyses>,
    gauges: Option<&MonthlyGauges>,
    currency: &str,
) -> String {
    Dashboard {
        kpis,
        totals,
        analyses,
        gauges,
        currency,
    }
    .to_string()
}
