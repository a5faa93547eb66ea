//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::Money;
use domain_claims::ClaimLine;
use domain_enrollment::ContractHistory;

/// One cent, the tolerance for cost conservation checks
pub const CENT: Decimal = dec!(0.01);

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a Money value is positive
pub fn assert_money_positive(money: &Money) {
    assert!(
        money.is_positive(),
        "Expected positive money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that a Money value is not negative
pub fn assert_money_non_negative(money: &Money) {
    assert!(
        !money.is_negative(),
        "Expected non-negative money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that every allocation of a claim line is non-negative and that
/// together they account for the line's cost to within a cent
pub fn assert_line_conserves(line: &ClaimLine) {
    for (name, amount) in [
        ("copay", line.copay),
        ("deductible", line.deductible),
        ("adjustment", line.adjustment),
        ("coinsurance", line.coinsurance),
        ("paid_by_primary", line.paid_by_primary),
        ("paid_by_secondary", line.paid_by_secondary),
        ("paid_by_patient", line.paid_by_patient),
    ] {
        assert!(
            !amount.is_negative(),
            "{} is negative ({}) on {} line",
            name,
            amount,
            line.entry.kind
        );
    }
    assert_money_approx_eq(&line.allocated(), &line.cost, CENT);
}

/// Asserts that consecutive periods abut with no gap or overlap and that
/// every period but the last is closed
pub fn assert_periods_contiguous<T>(history: &ContractHistory<T>) {
    let periods = history.periods();
    assert!(!periods.is_empty(), "History has no periods");
    for (idx, pair) in periods.windows(2).enumerate() {
        let end = pair[0].end();
        assert!(end.is_some(), "Period {} is open but not last", idx);
        assert_eq!(
            end.and_then(|d| d.succ_opt()),
            pair[1].start(),
            "Period {} does not end the day before period {} starts",
            idx,
            idx + 1
        );
    }
}
