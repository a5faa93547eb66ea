//! Integration tests for the simulation runner

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;

use domain_coverage::{Ownership, Person, ServiceCategory};
use simulation::{
    run_population, CoverageEngine, PayerConfig, PersonScenario, PlanConfig, Scenario,
    ScenarioEncounter, SimulationConfig, SimulationError,
};
use test_utils::{assert_line_conserves, assert_money_zero, EntryBuilder, PersonBuilder};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn demo_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

fn visit(month: u32, cost: rust_decimal::Decimal) -> ScenarioEncounter {
    ScenarioEncounter {
        entry: EntryBuilder::encounter().at(at(2020, month, 10)).cost(cost).build(),
        line_items: vec![EntryBuilder::procedure()
            .at(at(2020, month, 10))
            .cost(cost / dec!(2))
            .build()],
    }
}

fn person(person: Person) -> PersonScenario {
    PersonScenario {
        person,
        encounters: vec![visit(2, dec!(800)), visit(9, dec!(2400))],
    }
}

fn mixed_population() -> Scenario {
    Scenario {
        start: at(2020, 1, 1),
        end: at(2020, 12, 31),
        people: vec![
            person(PersonBuilder::retiree().income(dec!(90000)).build()),
            person(PersonBuilder::new().income(dec!(9000)).build()),
            person(PersonBuilder::new().income(dec!(20000)).build()),
            person(PersonBuilder::new().income(dec!(150000)).occupation(0.8).build()),
            person(PersonBuilder::retiree().income(dec!(8000)).build()),
            person(PersonBuilder::new().income(dec!(30000)).blind().build()),
        ],
    }
}

fn engine(seed: u64) -> CoverageEngine {
    CoverageEngine::from_config(&SimulationConfig {
        seed,
        adjustment_behavior: "random".to_string(),
        ..SimulationConfig::default()
    })
    .unwrap()
}

// ============= PLAN SELECTION TESTS =============
mod selection_tests {
    use super::*;

    #[test]
    fn test_population_plan_choices() {
        let report = run_population(&engine(3), &mixed_population(), 2).unwrap();
        let plans: Vec<&str> = report
            .people
            .iter()
            .map(|p| p.plans[0].plan_id.as_str())
            .collect();
        assert_eq!(
            plans,
            vec![
                "medicare",
                "medicaid",
                "harbor-bronze",
                plans[3],
                "dual-eligible",
                "medicaid",
            ]
        );
        assert!(plans[3] == "harbor-gold" || plans[3] == "summit-select");
        assert_eq!(report.people[0].plans[0].secondary_plan_id, "summit-medigap");
    }

    #[test]
    fn test_claims_follow_plan_in_force() {
        let report = run_population(&engine(5), &mixed_population(), 1).unwrap();
        for outcome in &report.people {
            for claim in &outcome.claims {
                assert_eq!(claim.plan_id.as_deref(), Some(outcome.plans[0].plan_id.as_str()));
            }
        }
    }

    #[test]
    fn test_medicaid_member_pays_nothing() {
        let report = run_population(&engine(8), &mixed_population(), 1).unwrap();
        let medicaid = &report.people[1];
        for claim in &medicaid.claims {
            assert_money_zero(&claim.patient_cost);
        }
        assert_money_zero(&medicaid.out_of_pocket);
    }

    #[test]
    fn test_medically_needy_qualify_after_spending_down() {
        let config = SimulationConfig {
            monthly_spenddown: dec!(500),
            payers: vec![PayerConfig {
                id: "county".to_string(),
                name: "County Health".to_string(),
                ownership: Ownership::Government,
                location: None,
                adjustment_behavior: None,
                adjustment_rate: None,
            }],
            plans: vec![PlanConfig {
                id: "county-care".to_string(),
                payer: "county".to_string(),
                services: vec!["*".to_string()],
                deductible: dec!(0),
                copay: dec!(0),
                coinsurance: dec!(1),
                monthly_premium: None,
                income_premium_share: None,
                max_out_of_pocket: None,
                priority: 0,
                eligibility: "medically_needy".to_string(),
                start_year: 1900,
                end_year: None,
                medicare_supplement: false,
                aca: false,
            }],
            ..SimulationConfig::default()
        };
        let engine = CoverageEngine::from_config(&config).unwrap();
        let spender = PersonScenario {
            person: PersonBuilder::new().income(dec!(20000)).build(),
            encounters: vec![ScenarioEncounter {
                entry: EntryBuilder::encounter().at(at(2020, 3, 10)).cost(dec!(16000)).build(),
                line_items: Vec::new(),
            }],
        };
        let saver = PersonScenario {
            person: PersonBuilder::new().income(dec!(20000)).build(),
            encounters: vec![ScenarioEncounter {
                entry: EntryBuilder::encounter().at(at(2020, 3, 10)).cost(dec!(100)).build(),
                line_items: Vec::new(),
            }],
        };
        let scenario = Scenario {
            start: at(2020, 1, 1),
            end: at(2021, 12, 31),
            people: vec![spender, saver],
        };
        let report = run_population(&engine, &scenario, 1).unwrap();

        // 20000 income less 16000 spent leaves 4000, under the 6000 yearly limit
        let plans: Vec<&str> = report.people[0].plans.iter().map(|p| p.plan_id.as_str()).collect();
        assert_eq!(plans, vec!["no-insurance", "county-care"]);
        let plans: Vec<&str> = report.people[1].plans.iter().map(|p| p.plan_id.as_str()).collect();
        assert_eq!(plans, vec!["no-insurance", "no-insurance"]);
    }
}

// ============= ACCOUNTING TESTS =============
mod accounting_tests {
    use super::*;

    #[test]
    fn test_every_claim_conserves_cost() {
        let report = run_population(&engine(13), &mixed_population(), 3).unwrap();
        for outcome in &report.people {
            assert_eq!(outcome.claims.len(), 2);
            for claim in &outcome.claims {
                assert_line_conserves(&claim.totals);
            }
        }
    }

    #[test]
    fn test_member_months_cover_every_person_month() {
        let config = SimulationConfig {
            payers: vec![PayerConfig {
                id: "acme".to_string(),
                name: "Acme".to_string(),
                ownership: Ownership::Private,
                location: None,
                adjustment_behavior: None,
                adjustment_rate: None,
            }],
            plans: vec![PlanConfig {
                id: "acme-basic".to_string(),
                payer: "acme".to_string(),
                services: vec!["*".to_string()],
                deductible: dec!(250),
                copay: dec!(10),
                coinsurance: dec!(0.9),
                monthly_premium: Some(dec!(20)),
                income_premium_share: None,
                max_out_of_pocket: None,
                priority: 0,
                eligibility: "age < 65".to_string(),
                start_year: 1900,
                end_year: None,
                medicare_supplement: false,
                aca: false,
            }],
            ..SimulationConfig::default()
        };
        let engine = CoverageEngine::from_config(&config).unwrap();
        let scenario = mixed_population();
        let report = run_population(&engine, &scenario, 4).unwrap();

        let total: u64 = report.payers.iter().map(|p| p.member_months).sum();
        assert_eq!(total, 12 * scenario.people.len() as u64);

        let acme = report.payers.iter().find(|p| p.id == "acme").unwrap();
        let self_pay = report
            .payers
            .iter()
            .find(|p| p.ownership == Ownership::NoInsurance)
            .unwrap();
        // Both retirees are too old for the plan
        assert_eq!(self_pay.member_months, 24);
        assert_eq!(acme.unique_customers, 4);
        assert!(acme.revenue.is_positive());
        assert_eq!(self_pay.covered_entries, 0);
        assert_eq!(self_pay.uncovered_entries, 8);
    }

    #[test]
    fn test_yearly_spending_matches_totals() {
        let report = run_population(&engine(21), &mixed_population(), 2).unwrap();
        for outcome in &report.people {
            let year = outcome.enrollment.last().unwrap();
            assert_eq!(year.year, 2020);
            assert_eq!(year.premiums, outcome.premiums);
            assert_eq!(year.out_of_pocket, outcome.out_of_pocket);
            assert!(outcome.enrollment[0].premiums.is_zero());
        }
        // Medigap premiums for the retiree
        assert!(report.people[0].premiums.is_positive());
    }

    #[test]
    fn test_entries_after_end_are_skipped() {
        let mut scenario = mixed_population();
        scenario.end = at(2020, 6, 30);
        let report = run_population(&engine(1), &scenario, 2).unwrap();
        assert!(report.people.iter().all(|p| p.claims.len() == 1));
    }
}

// ============= DETERMINISM TESTS =============
mod determinism_tests {
    use super::*;

    #[test]
    fn test_results_independent_of_worker_count() {
        let scenario = mixed_population();
        let single = {
            let report = run_population(&engine(99), &scenario, 1).unwrap();
            serde_json::to_value(&report.people).unwrap()
        };
        let parallel = {
            let report = run_population(&engine(99), &scenario, 4).unwrap();
            serde_json::to_value(&report.people).unwrap()
        };
        assert_eq!(single, parallel);
    }

    #[test]
    fn test_seed_changes_contract_histories() {
        let a = run_population(&engine(1), &mixed_population(), 1).unwrap();
        let b = run_population(&engine(2), &mixed_population(), 1).unwrap();
        let histories = |r: &simulation::PopulationReport| {
            serde_json::to_value(r.people.iter().map(|p| &p.part_c).collect::<Vec<_>>()).unwrap()
        };
        assert_ne!(histories(&a), histories(&b));
    }

    #[test]
    fn test_enrollment_years_reported() {
        let report = run_population(&engine(4), &mixed_population(), 2).unwrap();
        let years: Vec<i32> = report.people[0].enrollment.iter().map(|e| e.year).collect();
        assert_eq!(years, (2010..=2020).collect::<Vec<_>>());
        for outcome in &report.people {
            for year in &outcome.enrollment {
                assert!(year.part_c_months <= 12);
                assert!(year.part_d_months <= 12);
            }
        }
    }

    #[test]
    fn test_identifiers_follow_scenario_order() {
        let report = run_population(&engine(4), &mixed_population(), 3).unwrap();
        let hicns: Vec<String> = report
            .people
            .iter()
            .map(|p| p.identity.hicn.to_string())
            .collect();
        assert_eq!(hicns[0], "T00000000A");
        assert_eq!(hicns[5], "T00000005A");
    }
}

// ============= CONFIGURATION TESTS =============
mod config_tests {
    use super::*;

    #[test]
    fn test_demo_files_load_and_run() {
        let config = SimulationConfig::from_toml(
            &std::fs::read_to_string(demo_path("coverage-sim.toml")).unwrap(),
        )
        .unwrap();
        assert_eq!(config.payers.len(), 4);
        let scenario: Scenario = serde_json::from_str(
            &std::fs::read_to_string(demo_path("scenario.json")).unwrap(),
        )
        .unwrap();
        let engine = CoverageEngine::from_config(&config).unwrap();
        let report = run_population(&engine, &scenario, 0).unwrap();
        let summary = report.summary();
        assert_eq!(summary.people, 3);
        assert_eq!(summary.claims, 5);
    }

    #[test]
    fn test_unknown_behavior_rejected_by_engine() {
        let config = SimulationConfig {
            selection_behavior: "cheapest".to_string(),
            ..SimulationConfig::default()
        };
        assert!(matches!(
            CoverageEngine::from_config(&config),
            Err(SimulationError::Configuration(_))
        ));
    }

    #[test]
    fn test_inverted_scenario_rejected() {
        let mut scenario = mixed_population();
        scenario.start = at(2021, 1, 1);
        assert!(run_population(&engine(0), &scenario, 1).is_err());
    }

    #[test]
    fn test_foreign_currency_line_item_is_an_error() {
        let mut scenario = mixed_population();
        let item = &mut scenario.people[2].encounters[1].line_items[0];
        item.cost = core_kernel::Money::new(item.cost.amount(), core_kernel::Currency::EUR);
        assert!(matches!(
            run_population(&engine(0), &scenario, 2),
            Err(SimulationError::Claim(_))
        ));
    }

    #[test]
    fn test_wellness_service_is_accepted() {
        let scenario = Scenario {
            start: at(2020, 1, 1),
            end: at(2020, 12, 31),
            people: vec![PersonScenario {
                person: PersonBuilder::new().build(),
                encounters: vec![ScenarioEncounter {
                    entry: EntryBuilder::encounter()
                        .service(ServiceCategory::Wellness)
                        .build(),
                    line_items: Vec::new(),
                }],
            }],
        };
        let report = run_population(&engine(0), &scenario, 1).unwrap();
        assert_money_zero(&report.people[0].claims[0].totals.copay);
    }
}

// ============= PROPERTY TESTS =============
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use core_kernel::{PartCContractId, SimRng};
    use domain_enrollment::{ContractHistory, ContractPool, HistoryRequest, PlanBenefitPackagePool};
    use test_utils::{
        assert_periods_contiguous, change_probabilities_strategy, encounter_strategy,
        line_item_strategy, person_strategy,
    };

    fn encounter_with_items() -> impl Strategy<Value = ScenarioEncounter> {
        encounter_strategy(2020).prop_flat_map(|entry| {
            prop::collection::vec(line_item_strategy(entry.start), 0..3).prop_map(move |items| {
                ScenarioEncounter {
                    entry: entry.clone(),
                    line_items: items,
                }
            })
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_any_person_conserves_claim_costs(
            person in person_strategy(),
            encounters in prop::collection::vec(encounter_with_items(), 0..4),
            seed in any::<u64>(),
        ) {
            let scenario = Scenario {
                start: at(2020, 1, 1),
                end: at(2020, 12, 31),
                people: vec![PersonScenario { person, encounters }],
            };
            let count = scenario.people[0].encounters.len();
            let report = run_population(&engine(seed), &scenario, 1).unwrap();
            let outcome = &report.people[0];
            prop_assert_eq!(outcome.claims.len(), count);
            prop_assert_eq!(outcome.plans.len(), 1);
            for claim in &outcome.claims {
                assert_line_conserves(&claim.totals);
            }
        }

        #[test]
        fn prop_contract_histories_are_contiguous(
            probabilities in change_probabilities_strategy(),
            years in 0u32..12,
            seed in any::<u64>(),
        ) {
            let identifiers = SimulationConfig::default().identifiers;
            let contracts = ContractPool::<PartCContractId>::part_c(&identifiers.part_c()).unwrap();
            let packages = PlanBenefitPackagePool::new(&identifiers.plan_benefit_packages()).unwrap();
            let request = HistoryRequest {
                stop: at(2020, 12, 31),
                years_of_history: years,
                probabilities,
            };
            let history =
                ContractHistory::generate(&request, &contracts, &packages, &mut SimRng::seed_from(seed))
                    .unwrap();
            assert_periods_contiguous(&history);
            prop_assert!(history.covered_months_count(2020) <= 12);
        }
    }
}
