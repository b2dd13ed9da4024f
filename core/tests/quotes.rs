//! Quote resolution against a seeded rule table.

use chrono::NaiveDate;
use dealer_finance_core::{
    clock::FixedClock,
    config::FinanceConfig,
    model::{CalculationType, CampaignCode},
    resolver::{EntityOutcome, QuoteRequest, QuoteResolver, INTERNAL_ERROR_MESSAGE},
    store::{FinanceStore, RateSheetRow},
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn today() -> FixedClock {
    FixedClock::new(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
}

fn row(entity_id: i64, campaign: &str, rate: f64, term: u32, kind: CalculationType, value: f64) -> RateSheetRow {
    RateSheetRow {
        entity_id,
        campaign: campaign.into(),
        rate,
        term_months: term,
        calculation_type: kind,
        value,
        min_vehicle_age_months: None,
        max_vehicle_age_months: None,
    }
}

fn seeded_store(rows: &[RateSheetRow]) -> FinanceStore {
    let store = FinanceStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.seed_campaigns(12).unwrap();
    store.seed_entity(1, "Banco Uno", true).unwrap();
    store.seed_entity(2, "Financiera Dos", true).unwrap();
    store.seed_entity(3, "Caja Tres", true).unwrap();
    store.load_rate_sheet(rows).unwrap();
    store
}

fn request(registration: NaiveDate) -> QuoteRequest {
    QuoteRequest {
        registration_date: registration,
        price: 10_000.0,
        loan_amount: 10_000.0,
        guarantee: Some(0.0),
        term_months: 72,
        financed_rate: 6.99,
        cash_rate: None,
        without_insurance: false,
    }
}

fn new_car() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn used_car() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 3, 1).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn single_entity_worked_example() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(1, "vn", 6.99, 72, CalculationType::Profitability, 3.0),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();

    let resp = QuoteResolver::new(&store, &config, &clock).quote(&request(new_car()));

    assert!(resp.success, "{}", resp.message);
    assert_eq!(resp.campaign, Some(CampaignCode::Vn));
    assert_eq!(resp.financed.len(), 1);
    assert_eq!(resp.financed[0].monthly_fee, Some(500.00));
    assert_eq!(resp.financed[0].reference_code, "C000300");
    assert!(resp.financed[0].is_best);
}

#[test]
fn coefficient_without_profitability_is_excluded() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(2, "vn", 6.99, 72, CalculationType::Coefficient, 4.0),
        row(2, "vn", 6.99, 72, CalculationType::Profitability, 2.0),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();

    let resp = QuoteResolver::new(&store, &config, &clock).quote(&request(new_car()));

    assert_eq!(resp.financed.len(), 1);
    assert_eq!(resp.financed[0].entity_id, 2);

    let entity_one = resp.entities.iter().find(|e| e.entity_id == 1).unwrap();
    assert!(matches!(entity_one.financed, EntityOutcome::NotApplicable { .. }));
}

#[test]
fn every_active_entity_gets_an_outcome() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(1, "vn", 6.99, 72, CalculationType::Profitability, 3.0),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();

    let resp = QuoteResolver::new(&store, &config, &clock).quote(&request(new_car()));

    assert_eq!(resp.entities.len(), 3);
    assert_eq!(resp.entities[0].financed, EntityOutcome::Matched);
    assert!(resp.entities[1..]
        .iter()
        .all(|e| matches!(e.financed, EntityOutcome::NotApplicable { .. })));
    assert!(resp.entities.iter().all(|e| e.cash.is_none()));
}

#[test]
fn overflowing_fee_is_reported_as_failed() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(1, "vn", 6.99, 72, CalculationType::Profitability, 3.0),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();

    let mut req = request(new_car());
    req.price = 1e308;
    req.loan_amount = 1e308;
    let resp = QuoteResolver::new(&store, &config, &clock).quote(&req);

    assert!(resp.success, "{}", resp.message);
    assert!(resp.financed.is_empty());
    let entity_one = resp.entities.iter().find(|e| e.entity_id == 1).unwrap();
    assert!(
        matches!(entity_one.financed, EntityOutcome::Failed { .. }),
        "{:?}", entity_one.financed
    );
}

#[test]
fn unknown_campaign_code_returns_no_entities() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(1, "vn", 6.99, 72, CalculationType::Profitability, 3.0),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();
    let resolver = QuoteResolver::new(&store, &config, &clock);

    for code in ["km0", "", "VNN", "new"] {
        let resp = resolver.quote_for_campaign(code, &request(new_car()));
        assert!(resp.success);
        assert!(resp.financed.is_empty(), "code {code:?} matched");
        assert!(resp.cash.is_empty());
        assert!(resp.entities.is_empty());
    }

    let resp = resolver.quote_for_campaign("vn", &request(new_car()));
    assert_eq!(resp.financed.len(), 1);
}

#[test]
fn used_vehicle_reads_vo_rules() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(1, "vn", 6.99, 72, CalculationType::Profitability, 3.0),
        row(2, "vo", 6.99, 72, CalculationType::Coefficient, 6.0),
        row(2, "vo", 6.99, 72, CalculationType::Profitability, 4.0),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();

    let resp = QuoteResolver::new(&store, &config, &clock).quote(&request(used_car()));

    assert_eq!(resp.campaign, Some(CampaignCode::Vo));
    assert_eq!(resp.financed.len(), 1);
    assert_eq!(resp.financed[0].entity_id, 2);
    assert_eq!(resp.financed[0].monthly_fee, Some(600.0));
}

#[test]
fn row_level_age_bounds_override_campaign() {
    let mut capped = row(2, "vo", 6.99, 72, CalculationType::Coefficient, 6.0);
    capped.max_vehicle_age_months = Some(36);
    let store = seeded_store(&[
        capped,
        row(2, "vo", 6.99, 72, CalculationType::Profitability, 4.0),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();
    let resolver = QuoteResolver::new(&store, &config, &clock);

    // 51 months old: outside the coefficient row's cap.
    let resp = resolver.quote(&request(used_car()));
    assert!(resp.financed.is_empty());

    // 24 months old: inside.
    let resp = resolver.quote(&request(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()));
    assert_eq!(resp.financed.len(), 1);
}

#[test]
fn cash_branch_uses_cash_rate() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(1, "vn", 6.99, 72, CalculationType::Profitability, 3.0),
        row(1, "vn", 9.99, 72, CalculationType::Profitability, 2.0),
        row(2, "vn", 9.99, 72, CalculationType::Coefficient, 1.0),
        row(2, "vn", 9.99, 72, CalculationType::Profitability, 1.0),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();

    let mut req = request(new_car());
    req.price = 12_000.0;
    req.cash_rate = Some(9.99);
    let resp = QuoteResolver::new(&store, &config, &clock).quote(&req);

    assert_eq!(resp.financed.len(), 1);
    assert_eq!(resp.cash.len(), 2);

    // entity 1: 12000 × 2% + 2000 = 2240; entity 2: 120 + 2000 = 2120
    assert_eq!(resp.cash[0].entity_id, 1);
    assert_eq!(resp.cash[0].reference_code, "C002240");
    assert_eq!(resp.cash[0].monthly_fee, None);
    assert_eq!(resp.cash[1].monthly_fee, Some(120.0));
}

#[test]
fn without_insurance_pair_is_reported() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(1, "vn", 6.99, 72, CalculationType::Profitability, 3.0),
        row(1, "vn", 6.99, 72, CalculationType::CoefficientWithoutInsurance, 4.0),
        row(1, "vn", 6.99, 72, CalculationType::ProfitabilityWithoutInsurance, 2.5),
    ]);
    let config = FinanceConfig::default_test();
    let clock = today();

    let mut req = request(new_car());
    req.without_insurance = true;
    let resp = QuoteResolver::new(&store, &config, &clock).quote(&req);

    let ss = resp.financed[0].without_insurance.as_ref().expect("ss pair");
    assert_eq!(ss.monthly_fee, 400.0);
    assert_eq!(ss.reference_code, "C000250");
}

#[test]
fn inactive_entities_are_ignored() {
    let store = seeded_store(&[
        row(1, "vn", 6.99, 72, CalculationType::Coefficient, 5.0),
        row(1, "vn", 6.99, 72, CalculationType::Profitability, 3.0),
    ]);
    store.set_entity_active(1, false).unwrap();
    let config = FinanceConfig::default_test();
    let clock = today();

    let resp = QuoteResolver::new(&store, &config, &clock).quote(&request(new_car()));

    assert!(resp.financed.is_empty());
    assert!(resp.entities.iter().all(|e| e.entity_id != 1));
}

#[test]
fn invalid_request_fails_without_results() {
    let store = seeded_store(&[]);
    let config = FinanceConfig::default_test();
    let clock = today();

    let mut req = request(new_car());
    req.loan_amount = -5.0;
    let resp = QuoteResolver::new(&store, &config, &clock).quote(&req);

    assert!(!resp.success);
    assert!(resp.message.contains("loan_amount"));
    assert!(resp.financed.is_empty());
}

#[test]
fn store_failure_is_a_generic_internal_error() {
    // No migrations: every query fails.
    let store = FinanceStore::in_memory().unwrap();
    let config = FinanceConfig::default_test();
    let clock = today();

    let resp = QuoteResolver::new(&store, &config, &clock).quote(&request(new_car()));

    assert!(!resp.success);
    assert_eq!(resp.message, INTERNAL_ERROR_MESSAGE);
    assert!(resp.financed.is_empty());
    assert!(resp.entities.is_empty());
}
