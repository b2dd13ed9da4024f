//! Financing quote resolver — the entry point used by request handlers and
//! the admin calculator.
//!
//! Flow: classify → match → compute per entity → rank both branches.
//!
//! Every active entity gets an explicit outcome per branch (matched, not
//! applicable, or failed). A store error aborts the whole quote with a generic
//! message and no partial results.

use crate::{
    campaign,
    clock::Clock,
    config::FinanceConfig,
    error::{FinanceError, FinanceResult},
    fee::{self, CashFee, FinancedFee},
    matcher::{self, EntityRules, RuleQuery},
    model::CampaignCode,
    ranker::{self, QuoteOffer},
    store::FinanceStore,
    types::EntityId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const INTERNAL_ERROR_MESSAGE: &str = "internal calculation error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub registration_date: NaiveDate,
    pub price:             f64,
    pub loan_amount:       f64,
    /// Falls back to `FinanceConfig::default_guarantee`.
    #[serde(default)]
    pub guarantee:         Option<f64>,
    pub term_months:       u32,
    pub financed_rate:     f64,
    #[serde(default)]
    pub cash_rate:         Option<f64>,
    #[serde(default)]
    pub without_insurance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    Matched,
    NotApplicable { reason: String },
    Failed { message: String },
}

impl EntityOutcome {
    fn not_applicable(reason: &str) -> Self {
        EntityOutcome::NotApplicable { reason: reason.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity_id:   EntityId,
    pub entity_name: String,
    pub financed:    EntityOutcome,
    /// `None` when the request carried no cash rate.
    pub cash:        Option<EntityOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub success:            bool,
    pub message:            String,
    pub campaign:           Option<CampaignCode>,
    pub vehicle_age_months: u32,
    pub financed:           Vec<QuoteOffer>,
    pub cash:               Vec<QuoteOffer>,
    pub entities:           Vec<EntityReport>,
}

impl QuoteResponse {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            campaign: None,
            vehicle_age_months: 0,
            financed: Vec::new(),
            cash: Vec::new(),
            entities: Vec::new(),
        }
    }
}

pub struct QuoteResolver<'a> {
    store:  &'a FinanceStore,
    config: &'a FinanceConfig,
    clock:  &'a dyn Clock,
}

impl<'a> QuoteResolver<'a> {
    pub fn new(store: &'a FinanceStore, config: &'a FinanceConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    /// Resolve a quote, classifying the vehicle from its registration date.
    pub fn quote(&self, req: &QuoteRequest) -> QuoteResponse {
        let (age, code) = campaign::classify_registration(
            req.registration_date,
            self.clock.today(),
            self.config.new_vehicle_max_age_months,
        );
        self.finish(self.resolve(Some(code), age, req))
    }

    /// Resolve a quote against an explicit campaign code. Codes other than
    /// `vn`/`vo` return zero entities.
    pub fn quote_for_campaign(&self, code: &str, req: &QuoteRequest) -> QuoteResponse {
        let age = campaign::vehicle_age_months(req.registration_date, self.clock.today());
        self.finish(self.resolve(CampaignCode::parse(code), age, req))
    }

    fn finish(&self, result: FinanceResult<QuoteResponse>) -> QuoteResponse {
        match result {
            Ok(resp) => resp,
            Err(e @ FinanceError::InvalidInput { .. }) => {
                log::warn!("quote: rejected request: {e}");
                QuoteResponse::failed(e.to_string())
            }
            Err(e) => {
                log::error!("quote: {e}");
                QuoteResponse::failed(INTERNAL_ERROR_MESSAGE.to_string())
            }
        }
    }

    fn resolve(
        &self,
        code: Option<CampaignCode>,
        age: u32,
        req: &QuoteRequest,
    ) -> FinanceResult<QuoteResponse> {
        validate(req)?;

        let Some(code) = code else {
            return Ok(QuoteResponse {
                success: true,
                message: "unknown campaign".into(),
                campaign: None,
                vehicle_age_months: age,
                financed: Vec::new(),
                cash: Vec::new(),
                entities: Vec::new(),
            });
        };

        let query = RuleQuery {
            campaign:           code,
            term_months:        req.term_months,
            financed_rate:      req.financed_rate,
            cash_rate:          req.cash_rate,
            vehicle_age_months: age,
        };
        let grouped = matcher::match_rules(self.store, &query)?;
        let guarantee = req.guarantee.unwrap_or(self.config.default_guarantee);

        let mut financed = Vec::new();
        let mut cash = Vec::new();
        let mut entities = Vec::new();

        for entity in self.store.active_entities()? {
            let Some(rules) = grouped.get(&entity.id) else {
                entities.push(EntityReport {
                    entity_id:   entity.id,
                    entity_name: entity.name.clone(),
                    financed:    EntityOutcome::not_applicable("no rules for campaign, term and rate"),
                    cash:        req.cash_rate.map(|_| {
                        EntityOutcome::not_applicable("no rules for campaign, term and rate")
                    }),
                });
                continue;
            };

            let financed_outcome = self.financed_offer(rules, req, guarantee, &mut financed);
            let cash_outcome = req
                .cash_rate
                .map(|_| self.cash_offer(rules, req, &mut cash));

            entities.push(EntityReport {
                entity_id:   entity.id,
                entity_name: entity.name.clone(),
                financed:    financed_outcome,
                cash:        cash_outcome,
            });
        }

        let financed = ranker::rank_by_reference(financed);
        let cash = ranker::rank_by_reference(cash);
        log::info!(
            "quote: campaign={} age={}m term={} -> {} financed, {} cash",
            code.as_str(), age, req.term_months, financed.len(), cash.len()
        );

        Ok(QuoteResponse {
            success: true,
            message: "ok".into(),
            campaign: Some(code),
            vehicle_age_months: age,
            financed,
            cash,
            entities,
        })
    }

    fn financed_offer(
        &self,
        rules: &EntityRules,
        req: &QuoteRequest,
        guarantee: f64,
        out: &mut Vec<QuoteOffer>,
    ) -> EntityOutcome {
        let Some(FinancedFee { with_insurance, without_insurance }) = fee::compute_financed(
            &rules.financed,
            req.loan_amount,
            guarantee,
            req.without_insurance,
            self.config,
        ) else {
            log::debug!("quote: entity {} financed not applicable", rules.entity_id);
            return EntityOutcome::not_applicable("missing coefficient or profitability at financed rate");
        };

        if !with_insurance.monthly_fee.is_finite() || !with_insurance.reference_value.is_finite() {
            let message = format!("non-finite financed fee for entity {}", rules.entity_id);
            log::warn!("quote: {message}");
            return EntityOutcome::Failed { message };
        }

        out.push(QuoteOffer {
            entity_id:         rules.entity_id,
            entity_name:       rules.entity_name.clone(),
            monthly_fee:       Some(with_insurance.monthly_fee),
            reference_value:   with_insurance.reference_value,
            reference_code:    with_insurance.reference_code,
            without_insurance,
            rank:              0,
            is_best:           false,
        });
        EntityOutcome::Matched
    }

    fn cash_offer(
        &self,
        rules: &EntityRules,
        req: &QuoteRequest,
        out: &mut Vec<QuoteOffer>,
    ) -> EntityOutcome {
        let Some(CashFee { monthly_fee, reference_value, reference_code }) =
            fee::compute_cash(&rules.cash, req.price, req.loan_amount, self.config)
        else {
            log::debug!("quote: entity {} cash not applicable", rules.entity_id);
            return EntityOutcome::not_applicable("missing profitability at cash rate");
        };

        if !reference_value.is_finite() {
            let message = format!("non-finite cash reference for entity {}", rules.entity_id);
            log::warn!("quote: {message}");
            return EntityOutcome::Failed { message };
        }

        out.push(QuoteOffer {
            entity_id:         rules.entity_id,
            entity_name:       rules.entity_name.clone(),
            monthly_fee,
            reference_value,
            reference_code,
            without_insurance: None,
            rank:              0,
            is_best:           false,
        });
        EntityOutcome::Matched
    }
}

fn validate(req: &QuoteRequest) -> FinanceResult<()> {
    let amounts = [
        ("price", req.price),
        ("loan_amount", req.loan_amount),
        ("guarantee", req.guarantee.unwrap_or(0.0)),
    ];
    for (field, value) in amounts {
        if !value.is_finite() || value < 0.0 {
            return Err(FinanceError::InvalidInput {
                field,
                reason: format!("{value} is not a valid amount"),
            });
        }
    }
    if req.term_months == 0 {
        return Err(FinanceError::InvalidInput {
            field: "term_months",
            reason: "must be at least one month".into(),
        });
    }
    Ok(())
}
