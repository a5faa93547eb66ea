//! Claims and their cost breakdown

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use core_kernel::{Currency, Money, PersonId, SimRng};
use domain_coverage::{CoverageRecord, InsurancePlan, PlanRecord, SelectionRules};

use crate::entry::BillableEntry;
use crate::error::ClaimError;

/// Financial breakdown of one billable entry
///
/// After adjudication the allocations sum to `cost`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimLine {
    pub entry: BillableEntry,
    pub cost: Money,
    /// Fixed amount paid by the patient
    pub copay: Money,
    /// Paid by the patient against the period deductible
    pub deductible: Money,
    /// Negotiated discount, paid by nobody
    pub adjustment: Money,
    /// Payer share of the balance after deductible and adjustment
    pub coinsurance: Money,
    pub paid_by_primary: Money,
    pub paid_by_secondary: Money,
    pub paid_by_patient: Money,
}

impl ClaimLine {
    pub fn new(entry: BillableEntry) -> Self {
        let zero = Money::zero(entry.cost.currency());
        Self {
            cost: zero,
            copay: zero,
            deductible: zero,
            adjustment: zero,
            coinsurance: zero,
            paid_by_primary: zero,
            paid_by_secondary: zero,
            paid_by_patient: zero,
            entry,
        }
    }

    /// Adds every amount of `other` to this line
    pub fn add_costs(&mut self, other: &ClaimLine) {
        self.cost += other.cost;
        self.copay += other.copay;
        self.deductible += other.deductible;
        self.adjustment += other.adjustment;
        self.coinsurance += other.coinsurance;
        self.paid_by_primary += other.paid_by_primary;
        self.paid_by_secondary += other.paid_by_secondary;
        self.paid_by_patient += other.paid_by_patient;
    }

    /// Sum of all allocations
    pub fn allocated(&self) -> Money {
        self.copay
            + self.deductible
            + self.adjustment
            + self.coinsurance
            + self.paid_by_primary
            + self.paid_by_secondary
            + self.paid_by_patient
    }

    /// Copay, deductible, and patient share
    pub fn patient_cost(&self) -> Money {
        self.copay + self.deductible + self.paid_by_patient
    }

    /// Coinsurance plus the primary payer's full-cover amount
    pub fn covered_cost(&self) -> Money {
        self.coinsurance + self.paid_by_primary
    }

    /// Runs the cascade for this line against one enrollment period.
    ///
    /// Order is copay, deductible, adjustment, coinsurance, secondary
    /// payer, patient. Every step after the copay runs only while a balance
    /// remains.
    fn adjudicate(
        &mut self,
        record: &mut PlanRecord,
        plan: &InsurancePlan,
        secondary: &InsurancePlan,
        rules: &SelectionRules,
        rng: &mut SimRng,
    ) {
        let cost = self.entry.cost;
        let zero = Money::zero(cost.currency());
        self.cost = cost;
        let mut remaining = cost;

        let statistics = plan.payer().statistics();
        if !plan.covers_service(Some(self.entry.service)) {
            statistics.increment_uncovered_entries();
            self.paid_by_patient = remaining;
            return;
        }
        statistics.increment_covered_entries();

        if self.entry.kind.bears_copay() {
            self.copay = plan
                .determine_copay(self.entry.service, self.entry.start, rules)
                .min(remaining)
                .max(zero);
            remaining -= self.copay;
        }

        if remaining.is_positive() {
            self.deductible = record.consume_deductible(remaining);
            remaining -= self.deductible;
        }

        if remaining.is_positive() {
            self.adjustment = plan
                .payer()
                .adjustment()
                .adjust(cost, rng)
                .min(remaining)
                .max(zero);
            remaining -= self.adjustment;
        }

        if remaining.is_positive() {
            let rate = plan.coinsurance();
            if rate.is_zero() {
                self.paid_by_primary = remaining;
                remaining = zero;
            } else {
                self.coinsurance = rate.apply(&remaining);
                remaining -= self.coinsurance;
            }
        }

        if remaining.is_positive() && !secondary.is_no_insurance() {
            self.paid_by_secondary = remaining;
            remaining = zero;
        }

        if remaining.is_positive() {
            self.paid_by_patient = remaining;
        }
    }
}

/// One encounter or medication plus the line items billed under it
#[derive(Debug, Clone)]
pub struct Claim {
    person_id: PersonId,
    main: ClaimLine,
    items: Vec<ClaimLine>,
    totals: ClaimLine,
    plan: Option<Arc<InsurancePlan>>,
    secondary_plan: Option<Arc<InsurancePlan>>,
}

impl Claim {
    /// Opens a claim rooted on `entry`
    ///
    /// # Errors
    ///
    /// Returns [`ClaimError::InvalidRootEntry`] unless the entry is an
    /// encounter or medication.
    pub fn new(person_id: PersonId, entry: BillableEntry) -> Result<Self, ClaimError> {
        if !entry.kind.bears_copay() {
            return Err(ClaimError::InvalidRootEntry(entry.kind));
        }
        entry.validate()?;
        Ok(Self {
            person_id,
            totals: ClaimLine::new(entry.clone()),
            main: ClaimLine::new(entry),
            items: Vec::new(),
            plan: None,
            secondary_plan: None,
        })
    }

    /// Adds a procedure, immunization, or other entry billed with the claim
    pub fn add_line_item(&mut self, entry: BillableEntry) -> Result<(), ClaimError> {
        entry.validate()?;
        self.items.push(ClaimLine::new(entry));
        Ok(())
    }

    /// Divides the cost of every line between the payers and the patient.
    ///
    /// The period in effect at the claim's start is used, falling back to
    /// the most recent period. Totals are credited to the period and to the
    /// payers' statistics.
    ///
    /// # Errors
    ///
    /// - [`ClaimError::AlreadyAdjudicated`] on a second call
    /// - [`ClaimError::MissingCoverage`] when the record holds no period
    pub fn assign_costs(
        &mut self,
        coverage: &mut CoverageRecord,
        rules: &SelectionRules,
        rng: &mut SimRng,
    ) -> Result<(), ClaimError> {
        if self.is_adjudicated() {
            return Err(ClaimError::AlreadyAdjudicated);
        }
        let time = self.main.entry.start;
        let record = coverage
            .resolve_mut(time)
            .ok_or_else(|| ClaimError::MissingCoverage(time.to_rfc3339()))?;
        let plan = Arc::clone(record.plan());
        let secondary = Arc::clone(record.secondary_plan());

        self.main.adjudicate(record, &plan, &secondary, rules, rng);
        let mut totals = ClaimLine::new(self.main.entry.clone());
        totals.add_costs(&self.main);
        for item in &mut self.items {
            item.adjudicate(record, &plan, &secondary, rules, rng);
            totals.add_costs(item);
        }

        record.increment_out_of_pocket_expenses(totals.patient_cost())?;
        record.increment_primary_coverage(totals.covered_cost())?;
        record.increment_secondary_coverage(totals.paid_by_secondary)?;

        debug!(
            person_id = %self.person_id,
            plan_id = %plan.id(),
            lines = 1 + self.items.len(),
            cost = %totals.cost,
            covered = %totals.covered_cost(),
            patient = %totals.patient_cost(),
            "Claim adjudicated"
        );

        self.totals = totals;
        self.plan = Some(plan);
        self.secondary_plan = Some(secondary);
        Ok(())
    }

    pub fn person_id(&self) -> PersonId {
        self.person_id
    }

    pub fn main_line(&self) -> &ClaimLine {
        &self.main
    }

    pub fn items(&self) -> &[ClaimLine] {
        &self.items
    }

    pub fn totals(&self) -> &ClaimLine {
        &self.totals
    }

    /// Plan that paid, once adjudicated
    pub fn plan(&self) -> Option<&Arc<InsurancePlan>> {
        self.plan.as_ref()
    }

    pub fn secondary_plan(&self) -> Option<&Arc<InsurancePlan>> {
        self.secondary_plan.as_ref()
    }

    pub fn is_adjudicated(&self) -> bool {
        self.plan.is_some()
    }

    pub fn total_cost(&self) -> Money {
        self.totals.cost
    }

    pub fn covered_cost(&self) -> Money {
        self.totals.covered_cost()
    }

    pub fn copay_paid(&self) -> Money {
        self.totals.copay
    }

    pub fn deductible_paid(&self) -> Money {
        self.totals.deductible
    }

    /// Coinsurance borne on the patient side: by the secondary payer when
    /// there is one, otherwise by the patient when the plan uses coinsurance
    pub fn coinsurance_paid(&self) -> Money {
        if self.totals.paid_by_secondary.is_positive() {
            self.totals.paid_by_secondary
        } else if self.totals.coinsurance.is_positive() {
            self.totals.paid_by_patient
        } else {
            Money::zero(self.currency())
        }
    }

    pub fn patient_cost(&self) -> Money {
        self.totals.patient_cost()
    }

    fn currency(&self) -> Currency {
        self.main.entry.cost.currency()
    }

    pub fn summary(&self) -> ClaimSummary {
        ClaimSummary {
            person_id: self.person_id,
            plan_id: self.plan.as_ref().map(|p| p.id().to_string()),
            secondary_plan_id: self.secondary_plan.as_ref().map(|p| p.id().to_string()),
            totals: self.totals.clone(),
            coinsurance_paid: self.coinsurance_paid(),
            patient_cost: self.patient_cost(),
        }
    }
}

/// Reportable view of an adjudicated claim
#[derive(Debug, Clone, Serialize)]
pub struct ClaimSummary {
    pub person_id: PersonId,
    pub plan_id: Option<String>,
    pub secondary_plan_id: Option<String>,
    pub totals: ClaimLine,
    pub coinsurance_paid: Money,
    pub patient_cost: Money,
}
