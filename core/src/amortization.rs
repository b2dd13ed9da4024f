//! French amortization — the formula path behind the free-form simulator.
//!
//! This path never reads the rule table. Quotes for a specific entity always
//! come from `fee`; this gives a customer-facing estimate when no entity has
//! been chosen yet, so the two can disagree for the same inputs.

use crate::{
    config::FinanceConfig,
    error::{FinanceError, FinanceResult},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    /// Amount financed after folding in the opening commission.
    pub principal:          f64,
    pub opening_commission: f64,
    /// Payment before any insurance add-on.
    pub base_payment:       f64,
    pub insurance_addon:    f64,
    pub monthly_payment:    f64,
    pub total_paid:         f64,
}

/// Closed-form level payment: P·r(1+r)^n / ((1+r)^n − 1), or P/n at zero rate.
pub fn level_payment(principal: f64, annual_rate_pct: f64, term_months: u32) -> f64 {
    let n = term_months as i32;
    let r = annual_rate_pct / 12.0 / 100.0;
    if r.abs() < f64::EPSILON {
        return principal / term_months as f64;
    }
    let factor = (1.0 + r).powi(n);
    principal * r * factor / (factor - 1.0)
}

pub fn estimate_installment(
    amount: f64,
    annual_rate_pct: f64,
    term_months: u32,
    with_insurance: bool,
    config: &FinanceConfig,
) -> FinanceResult<Installment> {
    if term_months == 0 {
        return Err(FinanceError::InvalidInput {
            field: "term_months",
            reason: "must be at least one month".into(),
        });
    }
    if amount < 0.0 || !amount.is_finite() {
        return Err(FinanceError::InvalidInput {
            field: "amount",
            reason: format!("{amount} is not a valid amount"),
        });
    }
    if annual_rate_pct < 0.0 || !annual_rate_pct.is_finite() {
        return Err(FinanceError::InvalidInput {
            field: "annual_rate",
            reason: format!("{annual_rate_pct} is not a valid rate"),
        });
    }

    let opening_commission = amount * config.opening_commission_pct / 100.0;
    let principal = amount + opening_commission;
    let base_payment = level_payment(principal, annual_rate_pct, term_months);
    let insurance_addon = if with_insurance { config.insurance_monthly_addon } else { 0.0 };
    let monthly_payment = config.round_fee(base_payment + insurance_addon);

    Ok(Installment {
        principal,
        opening_commission,
        base_payment,
        insurance_addon,
        monthly_payment,
        total_paid: monthly_payment * term_months as f64,
    })
}
