//! Financing catalog and inventory records as the store hands them out.

use crate::types::{DealershipId, EntityId, VehicleId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialEntity {
    pub id:        EntityId,
    pub name:      String,
    pub is_active: bool,
}

/// Coarse vehicle-age bucket gating which rules apply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CampaignCode {
    /// New vehicle ("vehículo nuevo").
    Vn,
    /// Used vehicle ("vehículo de ocasión").
    Vo,
}

impl CampaignCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignCode::Vn => "vn",
            CampaignCode::Vo => "vo",
        }
    }

    /// Only the two fixed codes parse; anything else is `None`.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "vn" => Some(CampaignCode::Vn),
            "vo" => Some(CampaignCode::Vo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialCampaign {
    pub id:                     i64,
    pub code:                   CampaignCode,
    pub min_vehicle_age_months: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterestRate {
    pub id:    i64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoanTerm {
    pub id:              i64,
    pub duration_months: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    Coefficient,
    Profitability,
    CoefficientWithoutInsurance,
    ProfitabilityWithoutInsurance,
}

impl CalculationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationType::Coefficient                   => "coefficient",
            CalculationType::Profitability                 => "profitability",
            CalculationType::CoefficientWithoutInsurance   => "coefficient_ss",
            CalculationType::ProfitabilityWithoutInsurance => "profitability_ss",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "coefficient"      => Some(CalculationType::Coefficient),
            "profitability"    => Some(CalculationType::Profitability),
            "coefficient_ss"   => Some(CalculationType::CoefficientWithoutInsurance),
            "profitability_ss" => Some(CalculationType::ProfitabilityWithoutInsurance),
            _ => None,
        }
    }
}

/// One (configuration, campaign, rate, term, calculation type) → value row,
/// flattened with the owning entity for matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigurationDetail {
    pub id:                     i64,
    pub configuration_id:       i64,
    pub entity_id:              EntityId,
    pub entity_name:            String,
    pub campaign:               CampaignCode,
    pub rate:                   f64,
    pub term_months:            u32,
    pub calculation_type:       CalculationType,
    pub value:                  f64,
    pub min_vehicle_age_months: Option<u32>,
    pub max_vehicle_age_months: Option<u32>,
    pub is_active:              bool,
}

impl ConfigurationDetail {
    /// Row-level age override. Rows without bounds accept every age.
    pub fn accepts_age(&self, age_months: u32) -> bool {
        if let Some(min) = self.min_vehicle_age_months {
            if age_months < min {
                return false;
            }
        }
        if let Some(max) = self.max_vehicle_age_months {
            if age_months > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id:                             VehicleId,
    pub dealership_id:                  DealershipId,
    pub registration_date:              NaiveDate,
    pub price:                          f64,
    pub min_fee_with_insurance:         Option<f64>,
    pub min_fee_term_with_insurance:    Option<u32>,
    pub min_fee_without_insurance:      Option<f64>,
    pub min_fee_term_without_insurance: Option<u32>,
}

impl Vehicle {
    /// Cached cheapest installment and its term for one insurance mode.
    pub fn cached_minimum(&self, with_insurance: bool) -> (Option<f64>, Option<u32>) {
        if with_insurance {
            (self.min_fee_with_insurance, self.min_fee_term_with_insurance)
        } else {
            (self.min_fee_without_insurance, self.min_fee_term_without_insurance)
        }
    }
}

/// A persisted financing option for one vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredFinancingOption {
    pub vehicle_id:     VehicleId,
    pub entity_id:      EntityId,
    pub rate:           f64,
    pub term_months:    u32,
    pub with_insurance: bool,
    pub monthly_fee:    f64,
    pub reference_code: String,
    pub rank:           u32,
    pub is_selected:    bool,
    pub batch_id:       String,
}
