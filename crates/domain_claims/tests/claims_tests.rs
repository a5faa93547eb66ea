//! Integration tests for domain_claims - the adjudication cascade end to end

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Money, PersonId, SimRng};
use domain_claims::{BillableEntry, Claim, ClaimError, EntryKind};
use domain_coverage::{
    AdjustmentStrategy, CoverageRecord, InsurancePlan, Ownership, Payer, SelectionRules,
    ServiceCategory,
};
use test_utils::{
    assert_line_conserves, assert_money_approx_eq, assert_money_non_negative,
    assert_money_zero, coverage_with, EntryBuilder, MoneyFixtures, TestPlanBuilder, CENT,
    DEFAULT_RULES,
};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn encounter(cost: Decimal, start: DateTime<Utc>) -> BillableEntry {
    EntryBuilder::encounter().at(start).cost(cost).build()
}

fn procedure(cost: Decimal, start: DateTime<Utc>) -> BillableEntry {
    EntryBuilder::procedure().at(start).cost(cost).build()
}

/// $20 copay, $500 deductible, payer covers 20% after that
fn acme() -> Arc<InsurancePlan> {
    TestPlanBuilder::new("acme")
        .with_copay(MoneyFixtures::copay_20().amount())
        .with_deductible(MoneyFixtures::deductible_500().amount())
        .with_coinsurance(dec!(0.2))
        .build()
}

/// Pays whatever the primary leaves
fn medigap() -> Arc<InsurancePlan> {
    TestPlanBuilder::new("medigap").build()
}

fn adjudicate(record: &mut CoverageRecord, claim: &mut Claim) {
    claim
        .assign_costs(record, &DEFAULT_RULES, &mut SimRng::seed_from(1))
        .unwrap();
}

// ============= CASCADE SCENARIO TESTS =============
mod cascade_tests {
    use super::*;

    #[test]
    fn test_copay_deductible_coinsurance_split() {
        let mut record = coverage_with(acme(), None, at(2020, 1, 1));
        let mut claim = Claim::new(PersonId::new(), encounter(dec!(1000), at(2020, 2, 1))).unwrap();
        adjudicate(&mut record, &mut claim);

        let line = claim.main_line();
        assert_eq!(line.copay, MoneyFixtures::copay_20());
        assert_eq!(line.deductible, MoneyFixtures::deductible_500());
        assert_money_zero(&line.adjustment);
        assert_eq!(line.coinsurance, Money::usd(dec!(96)));
        assert_money_zero(&line.paid_by_primary);
        assert_money_zero(&line.paid_by_secondary);
        assert_eq!(line.paid_by_patient, Money::usd(dec!(384)));
        assert_eq!(line.allocated(), MoneyFixtures::usd_visit());

        assert_eq!(claim.covered_cost(), Money::usd(dec!(96)));
        assert_eq!(claim.patient_cost(), Money::usd(dec!(904)));
        assert_eq!(claim.coinsurance_paid(), Money::usd(dec!(384)));
    }

    #[test]
    fn test_secondary_payer_takes_remainder() {
        let secondary = medigap();
        let mut record = coverage_with(acme(), Some(Arc::clone(&secondary)), at(2020, 1, 1));
        let mut claim = Claim::new(PersonId::new(), encounter(dec!(1000), at(2020, 2, 1))).unwrap();
        adjudicate(&mut record, &mut claim);

        let line = claim.main_line();
        assert_eq!(line.paid_by_secondary, Money::usd(dec!(384)));
        assert_money_zero(&line.paid_by_patient);
        assert_eq!(claim.coinsurance_paid(), Money::usd(dec!(384)));
        assert_eq!(secondary.payer().statistics().covered_cost(), Money::usd(dec!(384)));
    }

    #[test]
    fn test_deductible_shared_across_claims_in_period() {
        let mut record = coverage_with(acme(), None, at(2020, 1, 1));
        let rules = SelectionRules::default();
        let mut rng = SimRng::seed_from(1);

        let mut first = Claim::new(PersonId::new(), encounter(dec!(320), at(2020, 2, 1))).unwrap();
        first.assign_costs(&mut record, &rules, &mut rng).unwrap();
        assert_eq!(first.deductible_paid(), Money::usd(dec!(300)));

        let mut second = Claim::new(PersonId::new(), encounter(dec!(520), at(2020, 3, 1))).unwrap();
        second.assign_costs(&mut record, &rules, &mut rng).unwrap();
        assert_eq!(second.deductible_paid(), Money::usd(dec!(200)));
        assert_eq!(second.main_line().coinsurance, Money::usd(dec!(60)));

        let mut third = Claim::new(PersonId::new(), encounter(dec!(120), at(2020, 4, 1))).unwrap();
        third.assign_costs(&mut record, &rules, &mut rng).unwrap();
        assert_money_zero(&third.deductible_paid());

        let period = record.last_plan_record().unwrap();
        assert_money_zero(&period.remaining_deductible());
    }

    #[test]
    fn test_line_items_skip_copay_and_roll_into_totals() {
        let primary = acme();
        let mut record = coverage_with(Arc::clone(&primary), None, at(2020, 1, 1));
        let mut claim = Claim::new(PersonId::new(), encounter(dec!(100), at(2020, 2, 1))).unwrap();
        claim.add_line_item(procedure(dec!(700), at(2020, 2, 1))).unwrap();
        adjudicate(&mut record, &mut claim);

        assert_money_zero(&claim.items()[0].copay);
        assert_eq!(claim.main_line().deductible, Money::usd(dec!(80)));
        assert_eq!(claim.items()[0].deductible, Money::usd(dec!(420)));
        assert_eq!(claim.total_cost(), Money::usd(dec!(800)));
        assert_eq!(claim.totals().allocated(), Money::usd(dec!(800)));

        let stats = primary.payer().statistics();
        assert_eq!(stats.covered_entries(), 2);
        assert_eq!(stats.covered_cost(), claim.covered_cost());
        assert_eq!(stats.uncovered_cost(), claim.patient_cost());
    }

    #[test]
    fn test_uncovered_line_item_goes_to_patient() {
        let primary = TestPlanBuilder::new("visits-only")
            .covering(&[ServiceCategory::Ambulatory])
            .build();
        let mut record = coverage_with(Arc::clone(&primary), None, at(2020, 1, 1));
        let mut claim = Claim::new(PersonId::new(), encounter(dec!(100), at(2020, 2, 1))).unwrap();
        let refill = EntryBuilder::medication().at(at(2020, 2, 1)).cost(dec!(50)).build();
        claim.add_line_item(refill).unwrap();
        adjudicate(&mut record, &mut claim);

        assert_eq!(claim.main_line().paid_by_primary, Money::usd(dec!(100)));
        assert_eq!(claim.items()[0].paid_by_patient, Money::usd(dec!(50)));
        assert_eq!(primary.payer().statistics().covered_entries(), 1);
        assert_eq!(primary.payer().statistics().uncovered_entries(), 1);
    }

    #[test]
    fn test_fixed_adjustment_removed_after_deductible() {
        let payer = Arc::new(
            Payer::new("acme", "Acme", Ownership::Private)
                .with_adjustment(AdjustmentStrategy::fixed(dec!(0.1))),
        );
        let plan = TestPlanBuilder::new("acme")
            .with_payer(payer)
            .with_deductible(dec!(100))
            .with_coinsurance(dec!(0.5))
            .build();
        let mut record = coverage_with(plan, None, at(2020, 1, 1));
        let mut claim = Claim::new(PersonId::new(), encounter(dec!(1000), at(2020, 2, 1))).unwrap();
        adjudicate(&mut record, &mut claim);

        let line = claim.main_line();
        assert_eq!(line.deductible, Money::usd(dec!(100)));
        assert_eq!(line.adjustment, Money::usd(dec!(100)));
        assert_eq!(line.coinsurance, Money::usd(dec!(400)));
        assert_eq!(line.paid_by_patient, Money::usd(dec!(400)));
    }

    #[test]
    fn test_wellness_copay_waived_after_mandate() {
        let mut record = coverage_with(acme(), None, at(2020, 1, 1));
        let wellness = EntryBuilder::encounter()
            .service(ServiceCategory::Wellness)
            .at(at(2020, 2, 1))
            .cost(dec!(200))
            .build();
        let mut claim = Claim::new(PersonId::new(), wellness).unwrap();
        adjudicate(&mut record, &mut claim);
        assert_money_zero(&claim.copay_paid());
        assert_eq!(claim.deductible_paid(), Money::usd(dec!(200)));
    }

    #[test]
    fn test_claim_before_first_period_uses_latest_period() {
        let mut record = coverage_with(acme(), None, at(2020, 1, 1));
        let mut claim = Claim::new(PersonId::new(), encounter(dec!(50), at(2019, 6, 1))).unwrap();
        adjudicate(&mut record, &mut claim);
        assert_eq!(claim.plan().map(|p| p.id()), Some("acme"));
    }

    #[test]
    fn test_summary_serializes() {
        let mut record = coverage_with(acme(), None, at(2020, 1, 1));
        let mut claim = Claim::new(PersonId::new(), encounter(dec!(1000), at(2020, 2, 1))).unwrap();
        adjudicate(&mut record, &mut claim);
        let json = serde_json::to_value(claim.summary()).unwrap();
        assert_eq!(json["plan_id"], "acme");
        assert!(json["totals"]["coinsurance"].is_object());
    }
}

// ============= ENTRY VALIDATION TESTS =============
mod entry_validation_tests {
    use super::*;

    fn euro_entry(kind: EntryKind, service: ServiceCategory) -> BillableEntry {
        let mut entry = EntryBuilder::encounter().at(at(2020, 2, 1)).build();
        entry.kind = kind;
        entry.service = service;
        entry.cost = MoneyFixtures::eur_100();
        entry
    }

    #[test]
    fn test_foreign_currency_root_rejected_before_adjudication() {
        let result = Claim::new(
            PersonId::new(),
            euro_entry(EntryKind::Encounter, ServiceCategory::Ambulatory),
        );
        assert!(matches!(result, Err(ClaimError::InvalidEntry(_))));
    }

    #[test]
    fn test_foreign_currency_line_item_rejected() {
        let mut record = coverage_with(acme(), None, at(2020, 1, 1));
        let mut claim = Claim::new(PersonId::new(), encounter(dec!(100), at(2020, 2, 1))).unwrap();
        let result = claim.add_line_item(euro_entry(EntryKind::Procedure, ServiceCategory::Procedure));
        assert!(matches!(result, Err(ClaimError::InvalidEntry(_))));

        // The claim is untouched and still adjudicates in dollars
        assert!(claim.items().is_empty());
        adjudicate(&mut record, &mut claim);
        assert_eq!(claim.copay_paid(), MoneyFixtures::copay_20());
    }

    #[test]
    fn test_deserialized_foreign_currency_fails_validation() {
        let json = r#"{
            "kind": "medication",
            "service": "medication",
            "start": "2020-03-01T09:00:00Z",
            "cost": { "amount": "100.00", "currency": "GBP" }
        }"#;
        let entry: BillableEntry = serde_json::from_str(json).unwrap();
        assert!(matches!(entry.validate(), Err(ClaimError::InvalidEntry(_))));
    }
}

// ============= PROPERTY TESTS =============
mod cascade_proptests {
    use super::*;
    use proptest::prelude::*;
    use test_utils::{adjustment_strategy, rate_decimal_strategy, usd_cents_strategy};

    proptest! {
        #[test]
        fn every_line_conserves_cost(
            seed in any::<u64>(),
            copay in usd_cents_strategy(100),
            deductible in usd_cents_strategy(2_000),
            coinsurance in rate_decimal_strategy(),
            adjustment in adjustment_strategy(),
            with_secondary in any::<bool>(),
            costs in proptest::collection::vec(usd_cents_strategy(5_000), 1..12),
        ) {
            let payer = Arc::new(Payer::new("primary", "Primary", Ownership::Private).with_adjustment(adjustment));
            let primary = TestPlanBuilder::new("primary")
                .with_payer(payer)
                .with_copay(copay.amount())
                .with_deductible(deductible.amount())
                .with_coinsurance(coinsurance)
                .build();
            let secondary = with_secondary.then(medigap);
            let mut record = coverage_with(primary, secondary, at(2020, 1, 1));
            let rules = SelectionRules::default();
            let mut rng = SimRng::seed_from(seed);

            for (i, cost) in costs.iter().enumerate() {
                let mut claim = Claim::new(PersonId::new(), encounter(cost.amount(), at(2020, 2, 1))).unwrap();
                if i % 2 == 0 {
                    claim.add_line_item(procedure(cost.amount() / dec!(3), at(2020, 2, 1))).unwrap();
                }
                claim.assign_costs(&mut record, &rules, &mut rng).unwrap();

                for line in std::iter::once(claim.main_line()).chain(claim.items()) {
                    assert_line_conserves(line);
                }
                assert_money_approx_eq(&claim.totals().allocated(), &claim.total_cost(), CENT);
            }
        }

        #[test]
        fn deductible_never_overdrawn(
            deductible in usd_cents_strategy(3_000),
            costs in proptest::collection::vec(usd_cents_strategy(1_000), 0..20),
        ) {
            let primary = TestPlanBuilder::new("primary")
                .with_copay(dec!(15))
                .with_deductible(deductible.amount())
                .with_coinsurance(dec!(0.8))
                .build();
            let mut record = coverage_with(primary, None, at(2020, 1, 1));
            let rules = SelectionRules::default();
            let mut rng = SimRng::seed_from(7);

            let mut paid = Money::usd(dec!(0));
            let mut previous = deductible;
            for cost in costs {
                let mut claim = Claim::new(PersonId::new(), encounter(cost.amount(), at(2020, 5, 1))).unwrap();
                claim.assign_costs(&mut record, &rules, &mut rng).unwrap();
                paid += claim.deductible_paid();

                let remaining = record.last_plan_record().unwrap().remaining_deductible();
                prop_assert!(remaining.amount() <= previous.amount());
                assert_money_non_negative(&remaining);
                previous = remaining;
            }
            prop_assert!(paid.amount() <= deductible.amount());
        }
    }
}
