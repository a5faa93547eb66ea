//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for common entities across the simulator.
//! These fixtures are designed to be consistent and predictable for unit tests.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money};
use domain_coverage::{
    EligibilityRegistry, InsurancePlan, Ownership, Payer, SelectionRules,
    DEFAULT_MONTHLY_SPENDDOWN,
};

/// Shared self-pay plan. Its payer statistics accumulate across tests, so
/// never assert on them.
pub static NO_INSURANCE: Lazy<Arc<InsurancePlan>> =
    Lazy::new(|| Arc::new(InsurancePlan::no_insurance()));

/// Default selection rules (mandate in 2006)
pub static DEFAULT_RULES: Lazy<SelectionRules> = Lazy::new(SelectionRules::default);

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Typical office visit cost
    pub fn usd_visit() -> Money {
        Money::usd(dec!(1000.00))
    }

    /// Creates a EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    pub fn copay_20() -> Money {
        Money::usd(dec!(20))
    }

    pub fn deductible_500() -> Money {
        Money::usd(dec!(500))
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// First day of the standard plan year (Jan 1, 2020)
    pub fn plan_year_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    /// Mid-year timestamp for claims
    pub fn mid_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 15, 9, 0, 0).unwrap()
    }

    /// A time before the individual mandate
    pub fn before_mandate() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2004, 3, 1, 0, 0, 0).unwrap()
    }

    /// Birth date of a working-age adult (40 in 2020)
    pub fn adult_birth_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(1980, 1, 1).unwrap()
    }

    /// Birth date of a Medicare-age retiree (75 in 2020)
    pub fn retiree_birth_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(1945, 1, 1).unwrap()
    }
}

/// Fixture for payers
pub struct PayerFixtures;

impl PayerFixtures {
    /// The Medicare program; plans it offers may carry a supplement
    pub fn medicare() -> Arc<Payer> {
        Arc::new(Payer::new("medicare", "Medicare", Ownership::Government))
    }

    pub fn medicaid() -> Arc<Payer> {
        Arc::new(Payer::new("medicaid", "Medicaid", Ownership::Government))
    }

    pub fn private(id: &str) -> Arc<Payer> {
        Arc::new(Payer::new(id, id, Ownership::Private))
    }
}

/// Registry holding the built-in eligibility criteria at the default poverty
/// level
pub fn builtin_eligibility() -> EligibilityRegistry {
    EligibilityRegistry::with_builtins(DEFAULT_RULES.poverty_level, DEFAULT_MONTHLY_SPENDDOWN)
}
