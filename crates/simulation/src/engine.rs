//! Per-person coverage simulation
//!
//! A [`CoverageEngine`] is built once and shared by every worker. Each person
//! is then simulated sequentially, month by month:
//!
//! ```text
//! month start ── enrollment period due? ── select primary (+ supplement)
//!      │
//!      ├── pay monthly premiums, count member-month
//!      │
//!      └── adjudicate claims starting before the next month
//! ```
//!
//! Part C and Part D contract histories are generated afterwards from the
//! same per-person random stream.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use core_kernel::temporal::{start_of_day, to_date};
use core_kernel::{
    Hicn, Mbi, Money, PartCContractId, PartDContractId, PersonId, SequentialAllocator, SimRng,
    YearMonth,
};
use domain_claims::{BillableEntry, Claim, ClaimSummary, EntryKind};
use domain_coverage::finder::choose_random_plan;
use domain_coverage::{
    meets_basic_requirements, select_plan, CoverageRecord, FinderInput, InsurancePlan, Person,
    PlanFinder, PlanRecord, SelectionBehavior, SelectionRules,
};
use domain_enrollment::{
    ChangeProbabilities, ContractHistory, ContractPeriod, ContractPool, CostSharingCode,
    HistoryRequest, PartDEnrollment, PlanBenefitPackagePool,
};

use crate::catalog::Catalog;
use crate::config::SimulationConfig;
use crate::error::SimulationError;

/// One billed encounter or medication with the entries billed under it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioEncounter {
    pub entry: BillableEntry,
    #[serde(default)]
    pub line_items: Vec<BillableEntry>,
}

/// A person and everything they were billed for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonScenario {
    pub person: Person,
    #[serde(default)]
    pub encounters: Vec<ScenarioEncounter>,
}

/// Input to a population run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// First instant simulated
    pub start: DateTime<Utc>,
    /// Last instant simulated; contract histories end here
    pub end: DateTime<Utc>,
    pub people: Vec<PersonScenario>,
}

impl Scenario {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.start > self.end {
            return Err(SimulationError::configuration(format!(
                "scenario start {} is after its end {}",
                self.start, self.end
            )));
        }
        for (idx, person) in self.people.iter().enumerate() {
            for encounter in &person.encounters {
                if !encounter.entry.kind.bears_copay() {
                    return Err(SimulationError::configuration(format!(
                        "person {} has a claim rooted on a {} entry",
                        idx, encounter.entry.kind
                    )));
                }
                encounter.entry.validate()?;
                for item in &encounter.line_items {
                    item.validate()?;
                }
            }
        }
        Ok(())
    }
}

/// Synthetic Medicare identifiers issued to one person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub hicn: Hicn,
    pub mbi: Mbi,
}

/// One enrollment period as reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanPeriodSummary {
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub plan_id: String,
    pub secondary_plan_id: String,
    pub remaining_deductible: Money,
    pub covered_expenses: Money,
    pub out_of_pocket_expenses: Money,
    pub premium_expenses: Money,
}

impl From<&PlanRecord> for PlanPeriodSummary {
    fn from(record: &PlanRecord) -> Self {
        Self {
            start: record.start(),
            stop: record.stop(),
            plan_id: record.plan().id().to_string(),
            secondary_plan_id: record.secondary_plan().id().to_string(),
            remaining_deductible: record.remaining_deductible(),
            covered_expenses: record.covered_expenses(),
            out_of_pocket_expenses: record.out_of_pocket_expenses(),
            premium_expenses: record.insurance_expenses(),
        }
    }
}

/// Contract months and spending for one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearEnrollment {
    pub year: i32,
    pub part_c_months: usize,
    pub part_d_months: usize,
    /// Out-of-pocket spending in enrollment periods starting this year
    pub out_of_pocket: Money,
    pub premiums: Money,
}

/// Everything simulated for one person
#[derive(Debug, Clone, Serialize)]
pub struct PersonOutcome {
    pub index: usize,
    pub person_id: PersonId,
    pub identity: Identity,
    pub plans: Vec<PlanPeriodSummary>,
    pub claims: Vec<ClaimSummary>,
    pub part_c: Vec<ContractPeriod<PartCContractId>>,
    pub part_d: PartDEnrollment,
    pub enrollment: Vec<YearEnrollment>,
    pub out_of_pocket: Money,
    pub premiums: Money,
    pub covered: Money,
}

/// Shared, read-only simulation state
#[derive(Debug)]
pub struct CoverageEngine {
    catalog: Catalog,
    rules: SelectionRules,
    behavior: SelectionBehavior,
    finder: Box<dyn PlanFinder>,
    part_c: ContractPool<PartCContractId>,
    part_d: ContractPool<PartDContractId>,
    packages: PlanBenefitPackagePool,
    probabilities: ChangeProbabilities,
    years_of_history: u32,
    seed: u64,
    hicns: SequentialAllocator<Hicn>,
    mbis: SequentialAllocator<Mbi>,
}

impl CoverageEngine {
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let behavior = config.selection_behavior()?;
        let identifiers = &config.identifiers;
        Ok(Self {
            catalog: Catalog::from_config(config)?,
            rules: config.selection_rules(),
            behavior,
            finder: behavior.finder(),
            part_c: ContractPool::part_c(&identifiers.part_c())?,
            part_d: ContractPool::part_d(&identifiers.part_d())?,
            packages: PlanBenefitPackagePool::new(&identifiers.plan_benefit_packages())?,
            probabilities: config.change_probabilities(),
            years_of_history: config.enrollment.years_of_history,
            seed: config.seed,
            hicns: SequentialAllocator::<Hicn>::parse_start(&identifiers.hicn_start)?,
            mbis: SequentialAllocator::<Mbi>::parse_start(&identifiers.mbi_start)?,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rules(&self) -> &SelectionRules {
        &self.rules
    }

    pub fn selection_behavior(&self) -> SelectionBehavior {
        self.behavior
    }

    /// Issues the next HICN and MBI
    pub fn issue_identity(&self) -> Result<Identity, SimulationError> {
        Ok(Identity {
            hicn: self.hicns.allocate()?,
            mbi: self.mbis.allocate()?,
        })
    }

    /// Simulates one person from `start` through `end`
    pub fn simulate(
        &self,
        index: usize,
        identity: Identity,
        scenario: &PersonScenario,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PersonOutcome, SimulationError> {
        PersonSimulation::new(self, index, scenario, start).run(identity, &scenario.encounters, end)
    }
}

/// Mutable state of one person's run
#[derive(Debug)]
pub struct PersonSimulation<'a> {
    engine: &'a CoverageEngine,
    index: usize,
    person: Person,
    coverage: CoverageRecord,
    rng: SimRng,
    claims: Vec<ClaimSummary>,
}

impl<'a> PersonSimulation<'a> {
    pub fn new(
        engine: &'a CoverageEngine,
        index: usize,
        scenario: &PersonScenario,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            engine,
            index,
            person: scenario.person.clone(),
            coverage: CoverageRecord::new(start),
            rng: SimRng::for_person(engine.seed, index as u64),
            claims: Vec::new(),
        }
    }

    pub fn coverage(&self) -> &CoverageRecord {
        &self.coverage
    }

    pub fn run(
        mut self,
        identity: Identity,
        encounters: &[ScenarioEncounter],
        end: DateTime<Utc>,
    ) -> Result<PersonOutcome, SimulationError> {
        let start = self.coverage.next_enrollment_period();
        let mut pending: Vec<&ScenarioEncounter> = encounters.iter().collect();
        pending.sort_by_key(|e| e.entry.start);
        let mut pending = pending.into_iter().peekable();

        let last_month = YearMonth::of(to_date(end));
        for month in YearMonth::of(to_date(start)).through(last_month) {
            let time = start_of_day(month.first_day()).max(start);
            self.process_month(time)?;

            let next_month = start_of_day(month.succ().first_day());
            while let Some(encounter) = pending.next_if(|e| e.entry.start < next_month && e.entry.start <= end) {
                self.adjudicate(encounter)?;
            }
        }
        let skipped = pending.count();
        if skipped > 0 {
            warn!(
                person = self.index,
                skipped,
                end = %end,
                "Encounters after the simulation end were not adjudicated"
            );
        }

        self.finish(identity, end)
    }

    /// Enrolls when a period is due, then pays the month's premiums
    pub fn process_month(&mut self, time: DateTime<Utc>) -> Result<(), SimulationError> {
        if self.coverage.new_enrollment_period(time) {
            self.enroll(time);
        }
        self.coverage
            .pay_monthly_premiums_at(time, &self.person, &self.engine.rules)?;
        if let Some(record) = self.coverage.plan_record_at(time) {
            record.plan().payer().statistics().add_member_months(1);
            if !record.secondary_plan().is_no_insurance() {
                record.secondary_plan().payer().statistics().add_member_months(1);
            }
        }
        Ok(())
    }

    fn enroll(&mut self, time: DateTime<Utc>) {
        let engine = self.engine;
        let catalog = &engine.catalog;
        let input = FinderInput {
            plans: catalog.plans(),
            person: &self.person,
            service: None,
            time,
            rules: &engine.rules,
            no_insurance: catalog.no_insurance(),
            coverage: Some(&self.coverage),
        };
        let plan = select_plan(engine.finder.as_ref(), &input, &mut self.rng);
        let secondary = if plan.may_purchase_supplement() {
            choose_supplement(catalog.supplements(), &input, &mut self.rng)
        } else {
            Arc::clone(catalog.no_insurance())
        };

        plan.payer().statistics().increment_customers(self.person.id);
        if !secondary.is_no_insurance() {
            secondary.payer().statistics().increment_customers(self.person.id);
        }
        debug!(
            person_id = %self.person.id,
            year = time.year(),
            plan_id = %plan.id(),
            secondary_plan_id = %secondary.id(),
            "Enrolled"
        );
        self.coverage.set_plan_at_time(time, plan, secondary);
    }

    /// Records the encounter and adjudicates its claim
    pub fn adjudicate(&mut self, encounter: &ScenarioEncounter) -> Result<(), SimulationError> {
        if encounter.entry.kind == EntryKind::Encounter {
            self.person.record_encounter(encounter.entry.start);
        }
        let mut claim = Claim::new(self.person.id, encounter.entry.clone())?;
        for item in &encounter.line_items {
            claim.add_line_item(item.clone())?;
        }
        claim.assign_costs(&mut self.coverage, &self.engine.rules, &mut self.rng)?;
        self.claims.push(claim.summary());
        Ok(())
    }

    fn finish(mut self, identity: Identity, end: DateTime<Utc>) -> Result<PersonOutcome, SimulationError> {
        let engine = self.engine;
        let request = HistoryRequest {
            stop: end,
            years_of_history: engine.years_of_history,
            probabilities: engine.probabilities,
        };
        let part_c: ContractHistory<PartCContractId> =
            ContractHistory::generate(&request, &engine.part_c, &engine.packages, &mut self.rng)?;
        let part_d = PartDEnrollment::generate(
            &request,
            self.person.income_level,
            &engine.part_d,
            &engine.packages,
            &mut self.rng,
        )?;

        let first_year = end.year() - engine.years_of_history as i32;
        let coverage = &self.coverage;
        let enrollment = (first_year..=end.year())
            .map(|year| YearEnrollment {
                year,
                part_c_months: part_c.covered_months_count(year),
                part_d_months: part_d.history().covered_months_count(year),
                out_of_pocket: coverage
                    .records_started_in(year)
                    .map(PlanRecord::out_of_pocket_expenses)
                    .sum(),
                premiums: coverage
                    .records_started_in(year)
                    .map(PlanRecord::insurance_expenses)
                    .sum(),
            })
            .collect();

        debug!(
            person_id = %self.person.id,
            cost_sharing = %part_d.cost_sharing(),
            claims = self.claims.len(),
            "Person simulated"
        );

        Ok(PersonOutcome {
            index: self.index,
            person_id: self.person.id,
            identity,
            plans: self
                .coverage
                .plan_history()
                .iter()
                .map(PlanPeriodSummary::from)
                .collect(),
            out_of_pocket: self.coverage.total_out_of_pocket_expenses(),
            premiums: self.coverage.total_premium_expenses(),
            covered: self.coverage.total_coverage(),
            claims: self.claims,
            part_c: part_c.periods().to_vec(),
            part_d,
            enrollment,
        })
    }
}

/// Uniform choice among the supplements open to the person
fn choose_supplement(
    supplements: &[Arc<InsurancePlan>],
    primary: &FinderInput<'_>,
    rng: &mut SimRng,
) -> Arc<InsurancePlan> {
    let input = FinderInput {
        plans: supplements,
        ..*primary
    };
    let options: Vec<&Arc<InsurancePlan>> = supplements
        .iter()
        .filter(|p| meets_basic_requirements(p, &input))
        .collect();
    choose_random_plan(&options, input.no_insurance, rng)
}

impl PersonOutcome {
    pub fn cost_sharing(&self) -> CostSharingCode {
        self.part_d.cost_sharing()
    }
}
