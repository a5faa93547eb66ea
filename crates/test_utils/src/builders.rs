//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Money, Rate};
use domain_claims::{BillableEntry, EntryKind};
use domain_coverage::{
    AttributeValue, CoverageRecord, GeoPoint, InsurancePlan, Payer, Person, PlanBuilder,
    PremiumBasis, ServiceCategory, ServiceCoverage,
};

use crate::fixtures::{builtin_eligibility, PayerFixtures, TemporalFixtures, NO_INSURANCE};

/// Builder for simulated people
pub struct PersonBuilder {
    person: Person,
}

impl Default for PersonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PersonBuilder {
    /// A 40 year old (in 2020) earning 50,000 a year
    pub fn new() -> Self {
        Self {
            person: Person::new(TemporalFixtures::adult_birth_date(), dec!(50000)),
        }
    }

    /// A 75 year old (in 2020) retiree
    pub fn retiree() -> Self {
        Self::new().born(TemporalFixtures::retiree_birth_date())
    }

    pub fn born(mut self, birth_date: NaiveDate) -> Self {
        self.person.birth_date = birth_date;
        self
    }

    pub fn income(mut self, income: Decimal) -> Self {
        self.person.income = income;
        self
    }

    pub fn occupation(mut self, level: f64) -> Self {
        self.person.occupation_level = level;
        self
    }

    pub fn located_at(mut self, lat: f64, lon: f64) -> Self {
        self.person.location = Some(GeoPoint::new(lat, lon));
        self
    }

    pub fn pregnant(mut self) -> Self {
        self.person.pregnant = true;
        self
    }

    pub fn blind(mut self) -> Self {
        self.person.blind = true;
        self
    }

    pub fn esrd(mut self) -> Self {
        self.person.esrd = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.person.disabled = true;
        self
    }

    pub fn attribute(mut self, name: &str, value: AttributeValue) -> Self {
        self.person.attributes.insert(name.to_string(), value);
        self
    }

    pub fn build(self) -> Person {
        self.person
    }
}

/// Builder for insurance plans with a private payer by default
pub struct TestPlanBuilder {
    id: String,
    payer: Option<Arc<Payer>>,
    deductible: Decimal,
    copay: Decimal,
    coinsurance: Decimal,
    premium: PremiumBasis,
    priority: u32,
    services: Option<ServiceCoverage>,
    eligibility: Option<String>,
    active_years: (i32, Option<i32>),
    aca: bool,
}

impl TestPlanBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payer: None,
            deductible: Decimal::ZERO,
            copay: Decimal::ZERO,
            coinsurance: Decimal::ZERO,
            premium: PremiumBasis::default(),
            priority: 0,
            services: None,
            eligibility: None,
            active_years: (1900, None),
            aca: false,
        }
    }

    pub fn with_payer(mut self, payer: Arc<Payer>) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn with_deductible(mut self, amount: Decimal) -> Self {
        self.deductible = amount;
        self
    }

    pub fn with_copay(mut self, amount: Decimal) -> Self {
        self.copay = amount;
        self
    }

    /// Payer share of the post-deductible balance
    pub fn with_coinsurance(mut self, rate: Decimal) -> Self {
        self.coinsurance = rate;
        self
    }

    pub fn with_monthly_premium(mut self, amount: Decimal) -> Self {
        self.premium = PremiumBasis::Flat(Money::usd(amount));
        self
    }

    pub fn with_income_premium(mut self, share: Decimal) -> Self {
        self.premium = PremiumBasis::IncomeShare(Rate::new(share));
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn covering(mut self, services: &[ServiceCategory]) -> Self {
        self.services = Some(ServiceCoverage::Only(services.iter().copied().collect()));
        self
    }

    /// Eligibility name or expression resolved against the built-ins
    pub fn with_eligibility(mut self, expression: &str) -> Self {
        self.eligibility = Some(expression.to_string());
        self
    }

    pub fn active(mut self, start: i32, end: Option<i32>) -> Self {
        self.active_years = (start, end);
        self
    }

    pub fn aca(mut self) -> Self {
        self.aca = true;
        self
    }

    /// Builds the plan, panicking on invalid terms
    pub fn build(self) -> Arc<InsurancePlan> {
        let payer = self
            .payer
            .unwrap_or_else(|| PayerFixtures::private(&format!("{}-payer", self.id)));
        let mut builder = PlanBuilder::new(self.id, payer)
            .deductible(Money::usd(self.deductible))
            .copay(Money::usd(self.copay))
            .coinsurance(Rate::new(self.coinsurance))
            .premium(self.premium)
            .priority(self.priority)
            .active_years(self.active_years.0, self.active_years.1)
            .aca(self.aca);
        if let Some(services) = self.services {
            builder = builder.services(services);
        }
        if let Some(expression) = self.eligibility {
            let eligibility = builtin_eligibility()
                .resolve(&expression)
                .expect("eligibility should resolve");
            builder = builder.eligibility(expression, eligibility);
        }
        Arc::new(builder.build().expect("test plan should be valid"))
    }
}

/// Builder for billable entries
pub struct EntryBuilder {
    kind: EntryKind,
    service: ServiceCategory,
    start: DateTime<Utc>,
    cost: Money,
}

impl EntryBuilder {
    /// An ambulatory encounter mid-2020 costing 1,000
    pub fn encounter() -> Self {
        Self {
            kind: EntryKind::Encounter,
            service: ServiceCategory::Ambulatory,
            start: TemporalFixtures::mid_year(),
            cost: Money::usd(dec!(1000)),
        }
    }

    pub fn medication() -> Self {
        Self {
            kind: EntryKind::Medication,
            service: ServiceCategory::Medication,
            ..Self::encounter()
        }
    }

    pub fn procedure() -> Self {
        Self {
            kind: EntryKind::Procedure,
            service: ServiceCategory::Procedure,
            ..Self::encounter()
        }
    }

    pub fn service(mut self, service: ServiceCategory) -> Self {
        self.service = service;
        self
    }

    pub fn at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub fn cost(mut self, amount: Decimal) -> Self {
        self.cost = Money::usd(amount);
        self
    }

    pub fn build(self) -> BillableEntry {
        BillableEntry::new(self.kind, self.service, self.start, self.cost)
            .expect("test entry should be valid")
    }
}

/// Coverage record with a single period starting at `start`
pub fn coverage_with(
    primary: Arc<InsurancePlan>,
    secondary: Option<Arc<InsurancePlan>>,
    start: DateTime<Utc>,
) -> CoverageRecord {
    let mut record = CoverageRecord::new(start);
    record.new_enrollment_period(start);
    record.set_plan_at_time(
        start,
        primary,
        secondary.unwrap_or_else(|| Arc::clone(&NO_INSURANCE)),
    );
    record
}
