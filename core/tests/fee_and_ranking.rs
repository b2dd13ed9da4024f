//! Rule-table fee arithmetic, reference codes, and ranking order.

use dealer_finance_core::{
    config::FinanceConfig,
    fee,
    matcher::RateRules,
    ranker::{self, InventoryOption, QuoteOffer},
};

fn rules(c: Option<f64>, p: Option<f64>) -> RateRules {
    RateRules { coefficient: c, profitability: p, ..RateRules::default() }
}

fn offer(id: i64, name: &str, reference_value: f64) -> QuoteOffer {
    QuoteOffer {
        entity_id: id,
        entity_name: name.into(),
        monthly_fee: Some(100.0),
        reference_value,
        reference_code: fee::reference_code(reference_value),
        without_insurance: None,
        rank: 0,
        is_best: false,
    }
}

fn option(entity_id: i64, term_months: u32, monthly_fee: f64) -> InventoryOption {
    InventoryOption {
        entity_id,
        rate: 6.99,
        term_months,
        monthly_fee,
        reference_code: "C000000".into(),
        rank: 0,
        is_selected: false,
    }
}

#[test]
fn financed_fee_matches_worked_example() {
    let config = FinanceConfig::default_test();
    let out = fee::compute_financed(&rules(Some(5.0), Some(3.0)), 10_000.0, 0.0, false, &config)
        .expect("both rows present");

    assert_eq!(out.with_insurance.monthly_fee, 500.00);
    assert_eq!(out.with_insurance.reference_code, "C000300");
    assert!(out.without_insurance.is_none());
}

#[test]
fn guarantee_is_added_to_principal() {
    let config = FinanceConfig::default_test();
    let out = fee::compute_financed(&rules(Some(2.0), Some(1.0)), 9_000.0, 1_000.0, false, &config)
        .unwrap();
    assert_eq!(out.with_insurance.monthly_fee, 200.0);
    assert_eq!(out.with_insurance.reference_code, "C000100");
}

#[test]
fn financed_requires_both_rows() {
    let config = FinanceConfig::default_test();
    assert!(fee::compute_financed(&rules(Some(5.0), None), 10_000.0, 0.0, false, &config).is_none());
    assert!(fee::compute_financed(&rules(None, Some(3.0)), 10_000.0, 0.0, false, &config).is_none());
}

#[test]
fn without_insurance_pair_needs_both_ss_rows() {
    let config = FinanceConfig::default_test();
    let mut r = rules(Some(5.0), Some(3.0));
    r.coefficient_ss = Some(4.5);

    let out = fee::compute_financed(&r, 10_000.0, 0.0, true, &config).unwrap();
    assert!(out.without_insurance.is_none());

    r.profitability_ss = Some(2.0);
    let out = fee::compute_financed(&r, 10_000.0, 0.0, true, &config).unwrap();
    let ss = out.without_insurance.expect("ss pair");
    assert_eq!(ss.monthly_fee, 450.0);
    assert_eq!(ss.reference_code, "C000200");
}

#[test]
fn cash_reference_includes_price_markup() {
    let config = FinanceConfig::default_test();
    // 20000 × 2% + (20000 − 15000) = 400 + 5000
    let out = fee::compute_cash(&rules(None, Some(2.0)), 20_000.0, 15_000.0, &config).unwrap();
    assert_eq!(out.reference_code, "C005400");
    assert_eq!(out.monthly_fee, None);

    let out = fee::compute_cash(&rules(Some(1.5), Some(2.0)), 20_000.0, 15_000.0, &config).unwrap();
    assert_eq!(out.monthly_fee, Some(300.0));
}

#[test]
fn cash_requires_profitability() {
    let config = FinanceConfig::default_test();
    assert!(fee::compute_cash(&rules(Some(1.5), None), 20_000.0, 15_000.0, &config).is_none());
}

#[test]
fn reference_code_rounds_and_pads() {
    assert_eq!(fee::reference_code(0.0), "C000000");
    assert_eq!(fee::reference_code(299.5), "C000300");
    assert_eq!(fee::reference_code(1_499.49), "C001499");
    assert_eq!(fee::reference_code(123_456.0), "C123456");
}

/// "C012000" vs "C1500000"-style codes must order by magnitude, not text.
#[test]
fn reference_ranking_is_numeric() {
    let ranked = ranker::rank_by_reference(vec![
        offer(1, "Alpha", 1_500.0),
        offer(2, "Beta", 1_200_000.0),
        offer(3, "Gamma", 12_000.0),
    ]);

    let ids: Vec<i64> = ranked.iter().map(|o| o.entity_id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
    assert!(ranked[0].is_best);
    assert!(!ranked[1].is_best);
    assert_eq!(ranked[2].rank, 3);
}

#[test]
fn reference_ties_break_by_name() {
    let ranked = ranker::rank_by_reference(vec![offer(9, "Zeta", 500.0), offer(4, "Alpha", 500.0)]);
    assert_eq!(ranked[0].entity_name, "Alpha");
}

#[test]
fn fee_ranking_selects_cheapest() {
    let ranked = ranker::rank_by_fee(vec![
        option(1, 72, 310.0),
        option(2, 84, 280.5),
        option(3, 60, 355.0),
    ]);

    assert_eq!(ranked[0].entity_id, 2);
    assert!(ranked[0].is_selected);
    assert_eq!(ranked.iter().filter(|o| o.is_selected).count(), 1);
    assert_eq!(ranked.iter().map(|o| o.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn fee_ranking_of_nothing_is_empty() {
    assert!(ranker::rank_by_fee(Vec::new()).is_empty());
}
