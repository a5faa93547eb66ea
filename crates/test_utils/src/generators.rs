//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use domain_claims::{BillableEntry, EntryKind};
use domain_coverage::{AdjustmentStrategy, Person, ServiceCategory};
use domain_enrollment::ChangeProbabilities;

/// Strategy for non-negative USD amounts with whole cents, up to `max_dollars`
pub fn usd_cents_strategy(max_dollars: i64) -> impl Strategy<Value = Money> {
    (0i64..=max_dollars * 100).prop_map(|cents| Money::new(Decimal::new(cents, 2), Currency::USD))
}

/// Strategy for billed costs of a single clinical entry
pub fn cost_strategy() -> impl Strategy<Value = Money> {
    usd_cents_strategy(25_000)
}

/// Strategy for generating valid Decimal values for rates (0.0 to 1.0)
pub fn rate_decimal_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=10000u32).prop_map(|n| Decimal::new(n as i64, 4))
}

/// Strategy for payer adjustment strategies
pub fn adjustment_strategy() -> impl Strategy<Value = AdjustmentStrategy> {
    prop_oneof![
        Just(AdjustmentStrategy::None),
        rate_decimal_strategy().prop_map(AdjustmentStrategy::fixed),
        rate_decimal_strategy().prop_map(AdjustmentStrategy::random),
    ]
}

/// Strategy for probabilities of a contract change
pub fn change_probabilities_strategy() -> impl Strategy<Value = ChangeProbabilities> {
    (0.0f64..=1.0, 0.0f64..=0.5).prop_map(|(open_enrollment, mid_year)| ChangeProbabilities {
        open_enrollment,
        mid_year,
    })
}

/// Strategy for encounter classes
pub fn encounter_service_strategy() -> impl Strategy<Value = ServiceCategory> {
    prop_oneof![
        Just(ServiceCategory::Wellness),
        Just(ServiceCategory::Ambulatory),
        Just(ServiceCategory::Outpatient),
        Just(ServiceCategory::Inpatient),
        Just(ServiceCategory::Emergency),
        Just(ServiceCategory::UrgentCare),
    ]
}

/// Strategy for entry kinds billed as line items
pub fn line_item_kind_strategy() -> impl Strategy<Value = (EntryKind, ServiceCategory)> {
    prop_oneof![
        Just((EntryKind::Procedure, ServiceCategory::Procedure)),
        Just((EntryKind::Immunization, ServiceCategory::Immunization)),
        Just((EntryKind::Medication, ServiceCategory::Medication)),
        Just((EntryKind::Device, ServiceCategory::Device)),
        Just((EntryKind::Supply, ServiceCategory::Supply)),
        Just((EntryKind::Report, ServiceCategory::Report)),
    ]
}

/// Strategy for an instant within the given calendar year
pub fn time_in_year_strategy(year: i32) -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..365 * 24).prop_map(move |hours| {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    })
}

/// Strategy for an encounter in the given year
pub fn encounter_strategy(year: i32) -> impl Strategy<Value = BillableEntry> {
    (encounter_service_strategy(), time_in_year_strategy(year), cost_strategy()).prop_map(
        |(service, start, cost)| {
            BillableEntry::new(EntryKind::Encounter, service, start, cost)
                .expect("generated cost is non-negative")
        },
    )
}

/// Strategy for a line item billed at `start`
pub fn line_item_strategy(start: DateTime<Utc>) -> impl Strategy<Value = BillableEntry> {
    (line_item_kind_strategy(), cost_strategy()).prop_map(move |((kind, service), cost)| {
        BillableEntry::new(kind, service, start, cost).expect("generated cost is non-negative")
    })
}

/// Strategy for people of any age with incomes up to 250,000
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (
        1930i32..2015,
        0i64..250_000,
        0.0f64..2.0,
        0.0f64..1.0,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(birth_year, income, income_level, occupation, blind, esrd)| {
            let birth = NaiveDate::from_ymd_opt(birth_year, 6, 1).expect("June 1 exists");
            let mut person = Person::new(birth, Decimal::from(income));
            person.income_level = income_level;
            person.occupation_level = occupation;
            person.blind = blind;
            person.esrd = esrd;
            person
        })
}
