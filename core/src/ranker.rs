//! Result ranker.
//!
//! Quote offers rank by reference value, highest first. Inventory options rank
//! by monthly fee, cheapest first, and the cheapest is the selected one.
//! Both orders are total so repeated runs produce the same ranking.

use crate::{fee::FeePair, types::EntityId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteOffer {
    pub entity_id:         EntityId,
    pub entity_name:       String,
    /// `None` for cash offers without a coefficient row.
    pub monthly_fee:       Option<f64>,
    pub reference_value:   f64,
    pub reference_code:    String,
    pub without_insurance: Option<FeePair>,
    pub rank:              u32,
    pub is_best:           bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryOption {
    pub entity_id:      EntityId,
    pub rate:           f64,
    pub term_months:    u32,
    pub monthly_fee:    f64,
    pub reference_code: String,
    pub rank:           u32,
    pub is_selected:    bool,
}

/// Numeric descending on the reference value. The display code is never
/// compared as a string.
pub fn rank_by_reference(mut offers: Vec<QuoteOffer>) -> Vec<QuoteOffer> {
    offers.sort_by(|a, b| {
        b.reference_value
            .total_cmp(&a.reference_value)
            .then_with(|| a.entity_name.cmp(&b.entity_name))
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    for (i, offer) in offers.iter_mut().enumerate() {
        offer.rank = i as u32 + 1;
        offer.is_best = i == 0;
    }
    offers
}

fn fee_order(a: &InventoryOption, b: &InventoryOption) -> Ordering {
    a.monthly_fee
        .total_cmp(&b.monthly_fee)
        .then_with(|| a.entity_id.cmp(&b.entity_id))
        .then_with(|| a.term_months.cmp(&b.term_months))
        .then_with(|| a.rate.total_cmp(&b.rate))
}

/// Ascending monthly fee; the first option is marked selected.
pub fn rank_by_fee(mut options: Vec<InventoryOption>) -> Vec<InventoryOption> {
    options.sort_by(fee_order);
    for (i, option) in options.iter_mut().enumerate() {
        option.rank = i as u32 + 1;
        option.is_selected = i == 0;
    }
    options
}
