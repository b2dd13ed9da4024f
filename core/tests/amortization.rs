//! French amortization simulator path.

use dealer_finance_core::{amortization, config::FinanceConfig, error::FinanceError};

#[test]
fn level_payment_matches_closed_form() {
    // 10000 at 12%/yr over 12 months: r = 0.01
    let payment = amortization::level_payment(10_000.0, 12.0, 12);
    assert!((payment - 888.487887).abs() < 1e-4, "got {payment}");
}

#[test]
fn zero_rate_divides_evenly() {
    assert_eq!(amortization::level_payment(12_000.0, 0.0, 48), 250.0);
}

#[test]
fn opening_commission_is_folded_into_principal() {
    let config = FinanceConfig::default_test();
    let est = amortization::estimate_installment(10_000.0, 0.0, 50, false, &config).unwrap();

    assert_eq!(est.opening_commission, 250.0);
    assert_eq!(est.principal, 10_250.0);
    assert_eq!(est.monthly_payment, 205.0);
    assert_eq!(est.insurance_addon, 0.0);
}

#[test]
fn insurance_addon_only_when_requested() {
    let config = FinanceConfig::default_test();
    let with = amortization::estimate_installment(10_000.0, 0.0, 50, true, &config).unwrap();
    let without = amortization::estimate_installment(10_000.0, 0.0, 50, false, &config).unwrap();

    assert_eq!(with.monthly_payment - without.monthly_payment, config.insurance_monthly_addon);
    assert_eq!(with.total_paid, with.monthly_payment * 50.0);
}

#[test]
fn invalid_inputs_are_rejected() {
    let config = FinanceConfig::default_test();
    assert!(matches!(
        amortization::estimate_installment(10_000.0, 5.0, 0, true, &config),
        Err(FinanceError::InvalidInput { field: "term_months", .. })
    ));
    assert!(matches!(
        amortization::estimate_installment(-1.0, 5.0, 12, true, &config),
        Err(FinanceError::InvalidInput { field: "amount", .. })
    ));
}
