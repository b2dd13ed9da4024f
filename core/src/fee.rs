//! Fee computer — rule-table monthly fee and reference code.
//!
//! Financed:  base = loan + guarantee
//!            fee = base × coefficient / 100
//!            reference = base × profitability / 100
//! Cash:      reference = price × profitability / 100 + (price − loan)
//!            fee = price × coefficient / 100, when a coefficient exists

use crate::{config::FinanceConfig, matcher::RateRules};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeePair {
    pub monthly_fee:     f64,
    pub reference_value: f64,
    pub reference_code:  String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancedFee {
    pub with_insurance:    FeePair,
    /// Present only when requested and both SS rows exist.
    pub without_insurance: Option<FeePair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFee {
    /// `None` when the entity has no coefficient at the cash rate.
    pub monthly_fee:     Option<f64>,
    pub reference_value: f64,
    pub reference_code:  String,
}

/// `C` followed by the rounded value zero-padded to six digits.
pub fn reference_code(value: f64) -> String {
    format!("C{:06}", value.round() as i64)
}

fn pair(base: f64, coefficient: f64, profitability: f64, config: &FinanceConfig) -> FeePair {
    let reference_value = base * profitability / 100.0;
    FeePair {
        monthly_fee: config.round_fee(base * coefficient / 100.0),
        reference_value,
        reference_code: reference_code(reference_value),
    }
}

/// Financed branch. `None` unless both coefficient and profitability exist.
pub fn compute_financed(
    rules: &RateRules,
    loan_amount: f64,
    guarantee: f64,
    without_insurance: bool,
    config: &FinanceConfig,
) -> Option<FinancedFee> {
    let (coefficient, profitability) = (rules.coefficient?, rules.profitability?);
    let base = loan_amount + guarantee;

    let without = if without_insurance {
        match (rules.coefficient_ss, rules.profitability_ss) {
            (Some(c), Some(p)) => Some(pair(base, c, p, config)),
            _ => None,
        }
    } else {
        None
    };

    Some(FinancedFee {
        with_insurance:    pair(base, coefficient, profitability, config),
        without_insurance: without,
    })
}

/// Cash branch. `None` unless a profitability row exists at the cash rate.
pub fn compute_cash(
    rules: &RateRules,
    price: f64,
    loan_amount: f64,
    config: &FinanceConfig,
) -> Option<CashFee> {
    let profitability = rules.profitability?;
    let reference_value = price * profitability / 100.0 + (price - loan_amount);

    Some(CashFee {
        monthly_fee: rules
            .coefficient
            .map(|c| config.round_fee(price * c / 100.0)),
        reference_value,
        reference_code: reference_code(reference_value),
    })
}

/// Pick the coefficient/profitability pair for one insurance mode, as the
/// bulk recompute does. `None` when either row is missing.
pub fn fee_for_mode(
    rules: &RateRules,
    base: f64,
    with_insurance: bool,
    config: &FinanceConfig,
) -> Option<FeePair> {
    let (c, p) = if with_insurance {
        (rules.coefficient?, rules.profitability?)
    } else {
        (rules.coefficient_ss?, rules.profitability_ss?)
    };
    Some(pair(base, c, p, config))
}
