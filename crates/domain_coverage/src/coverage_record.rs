//! A person's history of plan enrollment
//!
//! Each [`PlanRecord`] is one enrollment period: the primary and secondary
//! plan held, the deductible still owed in that period, and what was spent.
//! Claims adjudicated in the period draw the remaining deductible down in the
//! order they occur.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Months, Utc};
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};

use crate::error::CoverageError;
use crate::person::Person;
use crate::plan::InsurancePlan;
use crate::rules::SelectionRules;

/// One enrollment period
#[derive(Debug, Clone)]
pub struct PlanRecord {
    start: DateTime<Utc>,
    /// Exclusive; `None` while the period is still open
    stop: Option<DateTime<Utc>>,
    plan: Arc<InsurancePlan>,
    secondary_plan: Arc<InsurancePlan>,
    remaining_deductible: Money,
    covered_expenses: Money,
    out_of_pocket_expenses: Money,
    insurance_expenses: Money,
}

impl PlanRecord {
    /// Opens a period whose remaining deductible is the plan's full deductible
    pub fn new(
        start: DateTime<Utc>,
        stop: Option<DateTime<Utc>>,
        plan: Arc<InsurancePlan>,
        secondary_plan: Arc<InsurancePlan>,
    ) -> Self {
        let remaining_deductible = plan.deductible();
        Self {
            start,
            stop,
            plan,
            secondary_plan,
            remaining_deductible,
            covered_expenses: Money::zero(Currency::USD),
            out_of_pocket_expenses: Money::zero(Currency::USD),
            insurance_expenses: Money::zero(Currency::USD),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop(&self) -> Option<DateTime<Utc>> {
        self.stop
    }

    pub fn plan(&self) -> &Arc<InsurancePlan> {
        &self.plan
    }

    pub fn secondary_plan(&self) -> &Arc<InsurancePlan> {
        &self.secondary_plan
    }

    pub fn remaining_deductible(&self) -> Money {
        self.remaining_deductible
    }

    pub fn covered_expenses(&self) -> Money {
        self.covered_expenses
    }

    pub fn out_of_pocket_expenses(&self) -> Money {
        self.out_of_pocket_expenses
    }

    pub fn insurance_expenses(&self) -> Money {
        self.insurance_expenses
    }

    /// Whether `time` falls in `[start, stop)`
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && self.stop.map_or(true, |stop| time < stop)
    }

    pub fn update_stop_time(&mut self, stop: DateTime<Utc>) {
        self.stop = Some(stop);
    }

    /// Applies up to `amount` against the remaining deductible and returns
    /// the part applied. The balance never goes negative.
    pub fn consume_deductible(&mut self, amount: Money) -> Money {
        if !amount.is_positive() || !self.remaining_deductible.is_positive() {
            return Money::zero(amount.currency());
        }
        let applied = amount.min(self.remaining_deductible);
        self.remaining_deductible -= applied;
        applied
    }

    /// Costs the person paid out of pocket; credited as uncovered to the plan
    pub fn increment_out_of_pocket_expenses(&mut self, expenses: Money) -> Result<(), CoverageError> {
        self.out_of_pocket_expenses += expenses;
        self.plan.payer().statistics().add_uncovered_cost(expenses)?;
        Ok(())
    }

    /// Costs the primary plan paid
    pub fn increment_primary_coverage(&mut self, coverage: Money) -> Result<(), CoverageError> {
        self.covered_expenses += coverage;
        self.plan.payer().statistics().add_covered_cost(coverage)?;
        Ok(())
    }

    /// Costs the secondary plan paid
    pub fn increment_secondary_coverage(&mut self, coverage: Money) -> Result<(), CoverageError> {
        self.covered_expenses += coverage;
        self.secondary_plan.payer().statistics().add_covered_cost(coverage)?;
        Ok(())
    }

    /// Pays one month of premiums on both plans and returns what the person
    /// paid
    pub fn pay_monthly_premiums(
        &mut self,
        person: &Person,
        rules: &SelectionRules,
    ) -> Result<Money, CoverageError> {
        let paid = self.plan.pay_monthly_premium(person, rules)?
            + self.secondary_plan.pay_monthly_premium(person, rules)?;
        self.insurance_expenses += paid;
        Ok(paid)
    }
}

/// A person's chronological plan history
#[derive(Debug, Clone)]
pub struct CoverageRecord {
    plan_history: Vec<PlanRecord>,
    next_enrollment_period: DateTime<Utc>,
}

impl CoverageRecord {
    /// Empty record whose first enrollment period opens at `first_enrollment`
    pub fn new(first_enrollment: DateTime<Utc>) -> Self {
        Self {
            plan_history: Vec::new(),
            next_enrollment_period: first_enrollment,
        }
    }

    pub fn plan_history(&self) -> &[PlanRecord] {
        &self.plan_history
    }

    pub fn is_empty(&self) -> bool {
        self.plan_history.is_empty()
    }

    pub fn next_enrollment_period(&self) -> DateTime<Utc> {
        self.next_enrollment_period
    }

    /// Starts a new period at `time` with the given plans, closing the
    /// previous period at the same instant so no gap opens.
    pub fn set_plan_at_time(
        &mut self,
        time: DateTime<Utc>,
        plan: Arc<InsurancePlan>,
        secondary_plan: Arc<InsurancePlan>,
    ) {
        if let Some(previous) = self.plan_history.last_mut() {
            previous.update_stop_time(time);
        }
        let stop = (self.next_enrollment_period > time).then_some(self.next_enrollment_period);
        self.plan_history
            .push(PlanRecord::new(time, stop, plan, secondary_plan));
    }

    /// Starts a self-pay period at `time`
    pub fn set_plan_to_no_insurance(&mut self, time: DateTime<Utc>, no_insurance: &Arc<InsurancePlan>) {
        self.set_plan_at_time(time, Arc::clone(no_insurance), Arc::clone(no_insurance));
    }

    /// Whether `time` has reached the next enrollment period. Advances the
    /// period by a year when it has.
    pub fn new_enrollment_period(&mut self, time: DateTime<Utc>) -> bool {
        if time < self.next_enrollment_period {
            return false;
        }
        self.next_enrollment_period = self
            .next_enrollment_period
            .checked_add_months(Months::new(12))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        true
    }

    pub fn plan_record_at(&self, time: DateTime<Utc>) -> Option<&PlanRecord> {
        self.plan_history.iter().find(|r| r.covers(time))
    }

    pub fn plan_record_at_mut(&mut self, time: DateTime<Utc>) -> Option<&mut PlanRecord> {
        self.plan_history.iter_mut().find(|r| r.covers(time))
    }

    pub fn plan_at(&self, time: DateTime<Utc>) -> Option<&Arc<InsurancePlan>> {
        self.plan_record_at(time).map(PlanRecord::plan)
    }

    pub fn last_plan_record(&self) -> Option<&PlanRecord> {
        self.plan_history.last()
    }

    pub fn last_plan_record_mut(&mut self) -> Option<&mut PlanRecord> {
        self.plan_history.last_mut()
    }

    pub fn last_plan(&self) -> Option<&Arc<InsurancePlan>> {
        self.last_plan_record().map(PlanRecord::plan)
    }

    /// The period covering `time`, falling back to the most recent period.
    /// `None` only when no plan has ever been recorded.
    pub fn resolve_mut(&mut self, time: DateTime<Utc>) -> Option<&mut PlanRecord> {
        match self.plan_history.iter().position(|r| r.covers(time)) {
            Some(idx) => self.plan_history.get_mut(idx),
            None => self.plan_history.last_mut(),
        }
    }

    /// Pays a month of premiums for the period covering `time`
    pub fn pay_monthly_premiums_at(
        &mut self,
        time: DateTime<Utc>,
        person: &Person,
        rules: &SelectionRules,
    ) -> Result<Money, CoverageError> {
        self.plan_record_at_mut(time)
            .ok_or_else(|| CoverageError::NoCoverageAt(time.to_rfc3339()))?
            .pay_monthly_premiums(person, rules)
    }

    /// Healthcare costs paid out of pocket, premiums excluded
    pub fn total_out_of_pocket_expenses(&self) -> Money {
        self.plan_history.iter().map(PlanRecord::out_of_pocket_expenses).sum()
    }

    pub fn total_premium_expenses(&self) -> Money {
        self.plan_history.iter().map(PlanRecord::insurance_expenses).sum()
    }

    /// Healthcare costs paid by primary and secondary plans
    pub fn total_coverage(&self) -> Money {
        self.plan_history.iter().map(PlanRecord::covered_expenses).sum()
    }

    /// Periods that started in the given calendar year
    pub fn records_started_in(&self, year: i32) -> impl Iterator<Item = &PlanRecord> {
        self.plan_history
            .iter()
            .filter(move |r| r.start.year() == year)
    }

    /// Income left after the out-of-pocket and premium spending of the
    /// latest period started by `time`. At an enrollment boundary, before
    /// the new period is recorded, that is the period just closed.
    pub fn income_remaining(&self, person: &Person, time: DateTime<Utc>) -> Decimal {
        match self.plan_history.iter().rev().find(|r| r.start <= time) {
            Some(record) => {
                person.income
                    - record.out_of_pocket_expenses.amount()
                    - record.insurance_expenses.amount()
            }
            None => person.income,
        }
    }
}
