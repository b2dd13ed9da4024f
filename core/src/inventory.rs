//! Bulk recompute of financing options over a dealership's inventory.
//!
//! Vehicles are processed one at a time, in id order. Each vehicle costs one
//! read of its campaign's rules plus one transaction that deletes its old
//! options for the insurance mode, inserts the new ranking, and refreshes the
//! cached minimum installment. A failing vehicle is logged and reported; the
//! loop carries on with the next one.

use crate::{
    campaign,
    clock::Clock,
    config::FinanceConfig,
    error::{FinanceError, FinanceResult},
    fee,
    matcher::{self, RuleQuery},
    model::ConfigurationDetail,
    ranker::{self, InventoryOption},
    store::FinanceStore,
    types::{BatchId, DealershipId, VehicleId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who is asking for the recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub dealership_id: Option<DealershipId>,
    pub is_admin:      bool,
}

impl Requester {
    pub fn admin() -> Self {
        Self { dealership_id: None, is_admin: true }
    }

    pub fn dealer(dealership_id: DealershipId) -> Self {
        Self { dealership_id: Some(dealership_id), is_admin: false }
    }

    pub fn can_manage(&self, dealership_id: DealershipId) -> bool {
        self.is_admin || self.dealership_id == Some(dealership_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VehicleStatus {
    Updated { options: usize, min_fee: Option<f64> },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecompute {
    pub vehicle_id: VehicleId,
    pub status:     VehicleStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub batch_id:       BatchId,
    pub dealership_id:  DealershipId,
    pub with_insurance: bool,
    pub updated:        usize,
    pub failed:         usize,
    pub vehicles:       Vec<VehicleRecompute>,
}

/// Every (entity, rate, term) option the rules allow for one vehicle, ranked
/// by monthly fee. Options missing either row for the mode are left out.
pub fn vehicle_options(
    details: &[ConfigurationDetail],
    vehicle_age_months: u32,
    loan_base: f64,
    with_insurance: bool,
    config: &FinanceConfig,
) -> Vec<InventoryOption> {
    let Some(campaign) = details.first().map(|d| d.campaign) else {
        return Vec::new();
    };

    // Equal rates share one interest_rate row, so their bits match.
    let combos: BTreeSet<(u32, u64)> = details
        .iter()
        .map(|d| (d.term_months, d.rate.to_bits()))
        .collect();

    let mut options = Vec::new();
    for (term_months, rate_bits) in combos {
        let rate = f64::from_bits(rate_bits);
        let query = RuleQuery {
            campaign,
            term_months,
            financed_rate: rate,
            cash_rate: None,
            vehicle_age_months,
        };
        for rules in matcher::group_by_entity(details, &query).into_values() {
            let Some(pair) = fee::fee_for_mode(&rules.financed, loan_base, with_insurance, config)
            else {
                continue;
            };
            if !pair.monthly_fee.is_finite() {
                log::warn!(
                    "inventory: entity {} produced non-finite fee at {rate}%/{term_months}m",
                    rules.entity_id
                );
                continue;
            }
            options.push(InventoryOption {
                entity_id: rules.entity_id,
                rate,
                term_months,
                monthly_fee: pair.monthly_fee,
                reference_code: pair.reference_code,
                rank: 0,
                is_selected: false,
            });
        }
    }

    ranker::rank_by_fee(options)
}

pub struct InventoryRecompute<'a> {
    store:  &'a FinanceStore,
    config: &'a FinanceConfig,
    clock:  &'a dyn Clock,
}

impl<'a> InventoryRecompute<'a> {
    pub fn new(store: &'a FinanceStore, config: &'a FinanceConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    pub fn recompute_dealership(
        &self,
        requester: &Requester,
        dealership_id: DealershipId,
        with_insurance: bool,
    ) -> FinanceResult<RecomputeReport> {
        if !requester.can_manage(dealership_id) {
            log::warn!("inventory: requester {requester:?} denied for dealership {dealership_id}");
            return Err(FinanceError::Unauthorized);
        }

        let batch_id = uuid::Uuid::new_v4().to_string();
        let vehicle_ids = self.store.dealership_vehicle_ids(dealership_id)?;
        log::info!(
            "inventory: batch {batch_id} recomputing {} vehicles for dealership {dealership_id} (insurance={with_insurance})",
            vehicle_ids.len()
        );

        let mut report = RecomputeReport {
            batch_id: batch_id.clone(),
            dealership_id,
            with_insurance,
            updated: 0,
            failed: 0,
            vehicles: Vec::with_capacity(vehicle_ids.len()),
        };

        for vehicle_id in vehicle_ids {
            let status = match self.recompute_vehicle(vehicle_id, with_insurance, &batch_id) {
                Ok(status) => {
                    report.updated += 1;
                    status
                }
                Err(e) => {
                    log::error!("inventory: vehicle {vehicle_id} failed: {e}");
                    report.failed += 1;
                    VehicleStatus::Failed { message: e.to_string() }
                }
            };
            report.vehicles.push(VehicleRecompute { vehicle_id, status });
        }

        log::info!(
            "inventory: batch {batch_id} done ({} updated, {} failed)",
            report.updated, report.failed
        );
        Ok(report)
    }

    pub fn recompute_vehicle(
        &self,
        vehicle_id: VehicleId,
        with_insurance: bool,
        batch_id: &str,
    ) -> FinanceResult<VehicleStatus> {
        let vehicle = self.store.vehicle(vehicle_id)?;
        let today = self.clock.today();
        let (age, code) = campaign::classify_registration(
            vehicle.registration_date,
            today,
            self.config.new_vehicle_max_age_months,
        );

        let details = self.store.campaign_details(code)?;
        let loan_base = vehicle.price + self.config.default_guarantee;
        let options = vehicle_options(&details, age, loan_base, with_insurance, self.config);

        self.store
            .replace_financing_options(vehicle_id, with_insurance, &options, batch_id, today)?;

        let min_fee = options.first().map(|o| o.monthly_fee);
        log::debug!(
            "inventory: vehicle {vehicle_id} campaign={} age={age}m -> {} options, min {:?}",
            code.as_str(), options.len(), min_fee
        );
        Ok(VehicleStatus::Updated { options: options.len(), min_fee })
    }
}
