//! Rule matcher — selects the configuration rows that apply to a request and
//! groups them by financial entity.
//!
//! The store does the coarse filter (active, term, campaign, rate). This module
//! applies the row-level age override and slots rows by calculation type.

use crate::{
    error::FinanceResult,
    model::{CalculationType, CampaignCode, ConfigurationDetail},
    store::FinanceStore,
    types::EntityId,
};
use std::collections::BTreeMap;

/// Rates are stored as REAL; two values within this distance are the same rate.
pub const RATE_EPSILON: f64 = 1e-6;

pub fn same_rate(a: f64, b: f64) -> bool {
    (a - b).abs() < RATE_EPSILON
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleQuery {
    pub campaign:           CampaignCode,
    pub term_months:        u32,
    pub financed_rate:      f64,
    pub cash_rate:          Option<f64>,
    pub vehicle_age_months: u32,
}

impl RuleQuery {
    pub fn rates(&self) -> Vec<f64> {
        let mut rates = vec![self.financed_rate];
        if let Some(cash) = self.cash_rate {
            if !same_rate(cash, self.financed_rate) {
                rates.push(cash);
            }
        }
        rates
    }
}

/// The four optional rows for one entity at one rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateRules {
    pub coefficient:      Option<f64>,
    pub profitability:    Option<f64>,
    pub coefficient_ss:   Option<f64>,
    pub profitability_ss: Option<f64>,
}

impl RateRules {
    fn slot(&mut self, kind: CalculationType, value: f64) {
        let target = match kind {
            CalculationType::Coefficient                   => &mut self.coefficient,
            CalculationType::Profitability                 => &mut self.profitability,
            CalculationType::CoefficientWithoutInsurance   => &mut self.coefficient_ss,
            CalculationType::ProfitabilityWithoutInsurance => &mut self.profitability_ss,
        };
        // First row wins; the store keeps one active row per tuple anyway.
        if target.is_none() {
            *target = Some(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRules {
    pub entity_id:   EntityId,
    pub entity_name: String,
    pub financed:    RateRules,
    pub cash:        RateRules,
}

/// Group matched rows by entity, dropping rows whose own age bounds exclude
/// the vehicle. A row at a rate equal to both the financed and the cash rate
/// feeds both branches.
pub fn group_by_entity(
    rows: &[ConfigurationDetail],
    query: &RuleQuery,
) -> BTreeMap<EntityId, EntityRules> {
    let mut grouped: BTreeMap<EntityId, EntityRules> = BTreeMap::new();

    for row in rows {
        if row.campaign != query.campaign || row.term_months != query.term_months {
            continue;
        }
        if !row.accepts_age(query.vehicle_age_months) {
            log::debug!(
                "matcher: detail {} skipped, age {} outside [{:?}, {:?}]",
                row.id, query.vehicle_age_months,
                row.min_vehicle_age_months, row.max_vehicle_age_months
            );
            continue;
        }

        let is_financed = same_rate(row.rate, query.financed_rate);
        let is_cash = query.cash_rate.is_some_and(|r| same_rate(row.rate, r));
        if !is_financed && !is_cash {
            continue;
        }

        let entry = grouped.entry(row.entity_id).or_insert_with(|| EntityRules {
            entity_id:   row.entity_id,
            entity_name: row.entity_name.clone(),
            financed:    RateRules::default(),
            cash:        RateRules::default(),
        });
        if is_financed {
            entry.financed.slot(row.calculation_type, row.value);
        }
        if is_cash {
            entry.cash.slot(row.calculation_type, row.value);
        }
    }

    grouped
}

/// Fetch and group rules for a request.
pub fn match_rules(
    store: &FinanceStore,
    query: &RuleQuery,
) -> FinanceResult<BTreeMap<EntityId, EntityRules>> {
    let rows = store.matching_details(query.campaign, query.term_months, &query.rates())?;
    let grouped = group_by_entity(&rows, query);
    log::debug!(
        "matcher: {} rows -> {} entities (campaign={}, term={})",
        rows.len(), grouped.len(), query.campaign.as_str(), query.term_months
    );
    Ok(grouped)
}
