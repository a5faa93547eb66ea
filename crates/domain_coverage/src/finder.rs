//! Plan selection strategies
//!
//! Every strategy picks exactly one plan for a person from a candidate set.
//! When nothing is viable, including when the candidate set is empty, the
//! no-insurance plan is returned.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{Money, SimRng};

use crate::coverage_record::CoverageRecord;
use crate::error::CoverageError;
use crate::person::Person;
use crate::plan::InsurancePlan;
use crate::rules::SelectionRules;
use crate::service::ServiceCategory;

/// Everything a strategy needs to make one selection
#[derive(Debug, Clone, Copy)]
pub struct FinderInput<'a> {
    pub plans: &'a [Arc<InsurancePlan>],
    pub person: &'a Person,
    /// Category of care being sought; `None` when enrolling ahead of need
    pub service: Option<ServiceCategory>,
    pub time: DateTime<Utc>,
    pub rules: &'a SelectionRules,
    pub no_insurance: &'a Arc<InsurancePlan>,
    /// Enrollment history so far, for spenddown eligibility
    pub coverage: Option<&'a CoverageRecord>,
}

impl<'a> FinderInput<'a> {
    /// Real plans, without the no-insurance sentinel
    fn candidates(&self) -> impl Iterator<Item = &'a Arc<InsurancePlan>> + 'a {
        let plans: &'a [Arc<InsurancePlan>] = self.plans;
        plans.iter().filter(|p| !p.is_no_insurance())
    }

    fn can_afford(&self, plan: &InsurancePlan) -> bool {
        self.rules
            .can_afford(self.person, plan.yearly_cost(self.person.income))
    }

    /// The person can pay for the plan themselves, or an employer does
    fn can_pay(&self, plan: &InsurancePlan) -> bool {
        self.can_afford(plan) || self.rules.employer_covered(self.person, self.time)
    }

    fn is_open_to_person(&self, plan: &InsurancePlan) -> bool {
        plan.accepts(self.person, self.time, self.coverage)
            && plan.is_active(self.time)
            && plan.covers_service(self.service)
    }
}

/// Whether a plan is open to the person, payable, and covers the service
pub fn meets_basic_requirements(plan: &InsurancePlan, input: &FinderInput<'_>) -> bool {
    input.is_open_to_person(plan) && input.can_pay(plan)
}

/// Picks one of `options` uniformly, or the no-insurance plan if empty
pub fn choose_random_plan(
    options: &[&Arc<InsurancePlan>],
    no_insurance: &Arc<InsurancePlan>,
    rng: &mut SimRng,
) -> Arc<InsurancePlan> {
    rng.choose(options)
        .map(|plan| Arc::clone(*plan))
        .unwrap_or_else(|| Arc::clone(no_insurance))
}

/// Keeps only the plans sharing the lowest priority number
fn lowest_priority<'a>(plans: Vec<&'a Arc<InsurancePlan>>) -> Vec<&'a Arc<InsurancePlan>> {
    let Some(best) = plans.iter().map(|p| p.priority()).min() else {
        return plans;
    };
    plans.into_iter().filter(|p| p.priority() == best).collect()
}

/// A plan selection strategy
pub trait PlanFinder: Send + Sync + fmt::Debug {
    /// Selects a plan. Never fails; returns the no-insurance plan when
    /// nothing is viable.
    fn find(&self, input: &FinderInput<'_>, rng: &mut SimRng) -> Arc<InsurancePlan>;

    /// Configuration name of the strategy
    fn name(&self) -> &'static str;
}

/// Uniform choice among viable plans
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomFinder;

impl PlanFinder for RandomFinder {
    fn find(&self, input: &FinderInput<'_>, rng: &mut SimRng) -> Arc<InsurancePlan> {
        let options: Vec<_> = input
            .candidates()
            .filter(|p| meets_basic_requirements(p, input))
            .collect();
        choose_random_plan(&options, input.no_insurance, rng)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// The viable plan whose payer is closest to the person; ties at random
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestFinder;

impl NearestFinder {
    fn distance(person: &Person, plan: &InsurancePlan) -> f64 {
        match (person.location, plan.payer().location()) {
            (Some(from), Some(to)) => from.distance_km(&to),
            _ => f64::INFINITY,
        }
    }
}

impl PlanFinder for NearestFinder {
    fn find(&self, input: &FinderInput<'_>, rng: &mut SimRng) -> Arc<InsurancePlan> {
        let scored: Vec<_> = input
            .candidates()
            .filter(|p| meets_basic_requirements(p, input))
            .map(|p| (Self::distance(input.person, p), p))
            .collect();
        let nearest = scored
            .iter()
            .map(|(d, _)| *d)
            .fold(f64::INFINITY, f64::min);
        let options: Vec<_> = scored
            .into_iter()
            .filter(|(d, _)| *d == nearest)
            .map(|(_, p)| p)
            .collect();
        choose_random_plan(&options, input.no_insurance, rng)
    }

    fn name(&self) -> &'static str {
        "nearest"
    }
}

/// The viable plan with the lowest projected yearly cost
///
/// Cost is twelve monthly premiums plus the ambulatory copay for each
/// encounter in the trailing year. The first minimum wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct BestRatesFinder;

impl BestRatesFinder {
    pub fn expected_cost(plan: &InsurancePlan, input: &FinderInput<'_>) -> Money {
        let premiums = (plan.monthly_premium(input.person.income).amount() * dec!(12))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        let encounters = input.person.encounters_in_trailing_year(input.time);
        let copays = plan
            .determine_copay(ServiceCategory::Ambulatory, input.time, input.rules)
            .multiply(Decimal::from(encounters));
        Money::usd(premiums) + copays
    }
}

impl PlanFinder for BestRatesFinder {
    fn find(&self, input: &FinderInput<'_>, _rng: &mut SimRng) -> Arc<InsurancePlan> {
        let mut best: Option<(Money, &Arc<InsurancePlan>)> = None;
        for plan in input.candidates().filter(|p| meets_basic_requirements(p, input)) {
            let cost = Self::expected_cost(plan, input);
            match best {
                Some((lowest, _)) if cost.amount() >= lowest.amount() => {}
                _ => best = Some((cost, plan)),
            }
        }
        best.map(|(_, plan)| Arc::clone(plan))
            .unwrap_or_else(|| Arc::clone(input.no_insurance))
    }

    fn name(&self) -> &'static str {
        "best_rate"
    }
}

/// Lowest priority number among government plans and plans the person can
/// afford on their own income; ties at random. Employer coverage does not
/// make a private plan a candidate here.
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityFinder;

impl PriorityFinder {
    fn eligible<'a>(input: &FinderInput<'a>) -> Vec<&'a Arc<InsurancePlan>> {
        input
            .candidates()
            .filter(|p| input.is_open_to_person(p) && (p.is_government() || input.can_afford(p)))
            .collect()
    }
}

impl PlanFinder for PriorityFinder {
    fn find(&self, input: &FinderInput<'_>, rng: &mut SimRng) -> Arc<InsurancePlan> {
        let options = lowest_priority(Self::eligible(input));
        choose_random_plan(&options, input.no_insurance, rng)
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}

/// Like [`PriorityFinder`], but a dual-eligible government plan beats any
/// other government plan, which beats any private plan
#[derive(Debug, Default, Clone, Copy)]
pub struct GovernmentPriorityFinder;

impl PlanFinder for GovernmentPriorityFinder {
    fn find(&self, input: &FinderInput<'_>, rng: &mut SimRng) -> Arc<InsurancePlan> {
        let eligible = PriorityFinder::eligible(input);
        let (government, private): (Vec<_>, Vec<_>) =
            eligible.into_iter().partition(|p| p.is_government());
        let (dual, other_government): (Vec<_>, Vec<_>) =
            government.into_iter().partition(|p| p.is_dual_eligible());

        let tier = [dual, other_government, private]
            .into_iter()
            .find(|tier| !tier.is_empty())
            .unwrap_or_default();
        let options = lowest_priority(tier);
        choose_random_plan(&options, input.no_insurance, rng)
    }

    fn name(&self) -> &'static str {
        "government_priority"
    }
}

/// Configured plan selection behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionBehavior {
    Random,
    Nearest,
    BestRate,
    Priority,
    #[default]
    GovernmentPriority,
}

impl SelectionBehavior {
    /// Instantiates the strategy
    pub fn finder(&self) -> Box<dyn PlanFinder> {
        match self {
            SelectionBehavior::Random => Box::new(RandomFinder),
            SelectionBehavior::Nearest => Box::new(NearestFinder),
            SelectionBehavior::BestRate => Box::new(BestRatesFinder),
            SelectionBehavior::Priority => Box::new(PriorityFinder),
            SelectionBehavior::GovernmentPriority => Box::new(GovernmentPriorityFinder),
        }
    }
}

impl FromStr for SelectionBehavior {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random" => Ok(SelectionBehavior::Random),
            "nearest" => Ok(SelectionBehavior::Nearest),
            "best_rate" | "best_rates" => Ok(SelectionBehavior::BestRate),
            "priority" => Ok(SelectionBehavior::Priority),
            "government_priority" => Ok(SelectionBehavior::GovernmentPriority),
            _ => Err(CoverageError::UnknownSelectionBehavior(s.to_string())),
        }
    }
}

/// Runs a finder and logs the outcome
pub fn select_plan(
    finder: &dyn PlanFinder,
    input: &FinderInput<'_>,
    rng: &mut SimRng,
) -> Arc<InsurancePlan> {
    let plan = finder.find(input, rng);
    debug!(
        person_id = %input.person.id,
        strategy = finder.name(),
        plan_id = %plan.id(),
        candidates = input.plans.len(),
        "Selected insurance plan"
    );
    plan
}
