//! Parameter sheet lookups.
//!
//! Parameters are looked up by exact name. Missing or unreadable values fall
//! back to the caller's default.

use crate::{
    entities::{ParamValue, Parameter},
    store::Ledger,
};
use tracing::debug;

/// Enables capacity checks on allocation create and edit.
pub const STRICT_ALLOCATIONS: &str = "Mode_Strict_Allocations";
/// Cash held outside the sources, used for the runway gauge.
pub const CASH_ON_HAND: &str = "Cash_on_hand";
/// Older name of [`CASH_ON_HAND`].
pub const CASH_ON_HAND_LEGACY: &str = "Trésorerie";
/// Monthly savings target in percent.
pub const SAVINGS_TARGET: &str = "Taux_Épargne_%";

const DEFAULT_SAVINGS_TARGET: f64 = 20.0;

fn find<'a>(ledger: &'a Ledger, name: &str) -> Option<&'a Parameter> {
    ledger.parameters.iter().find(|p| p.parameter == name)
}

/// Reads a flag, `None` when the parameter is absent.
#[must_use]
pub fn param_bool(ledger: &Ledger, name: &str) -> Option<bool> {
    find(ledger, name).map(|p| p.value.as_flag())
}

/// Reads a number, returning `default` when absent or not numeric.
#[must_use]
pub fn param_number(ledger: &Ledger, name: &str, default: f64) -> f64 {
    find(ledger, name)
        .and_then(|p| p.value.as_number())
        .unwrap_or(default)
}

/// Creates or overwrites a parameter.
///
/// # Arguments
/// * `ledger` - The ledger to update
/// * `name` - Parameter name
/// * `value` - New value
/// * `category` - Grouping label, only used when the parameter is new
pub fn set_param(ledger: &mut Ledger, name: &str, value: ParamValue, category: &str) {
    debug!(parameter = name, value = %value, "setting parameter");
    if let Some(existing) = ledger.parameters.iter_mut().find(|p| p.parameter == name) {
        existing.value = value;
    } else {
        ledger.parameters.push(Parameter {
            category: category.to_string(),
            parameter: name.to_string(),
            value,
            description: String::new(),
        });
    }
}

/// Whether capacity checks are enforced.
///
/// The sheet's `Mode_Strict_Allocations` wins; without it the ledger's
/// configured default applies.
#[must_use]
pub fn is_strict(ledger: &Ledger) -> bool {
    param_bool(ledger, STRICT_ALLOCATIONS).unwrap_or(ledger.settings.strict_default)
}

/// Cash on hand, from `Cash_on_hand` or its older name, 0 when neither is set.
#[must_use]
pub fn cash_on_hand(ledger: &Ledger) -> f64 {
    find(ledger, CASH_ON_HAND)
        .or_else(|| find(ledger, CASH_ON_HAND_LEGACY))
        .and_then(|p| p.value.as_number())
        .unwrap_or(0.0)
}

/// Monthly savings target in percent, 20 unless configured.
#[must_use]
pub fn savings_target(ledger: &Ledger) -> f64 {
    param_number(ledger, SAVINGS_TARGET, DEFAULT_SAVINGS_TARGET)
}
