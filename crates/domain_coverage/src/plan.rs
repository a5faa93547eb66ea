//! Insurance plans
//!
//! A plan is the product a person enrolls in. It carries the cost-sharing
//! terms used by claim adjudication (copay, deductible, coinsurance) and the
//! premium and eligibility terms used by plan selection. Plans are immutable
//! once built and shared behind `Arc`; the only mutable state they reach is
//! their payer's atomic statistics.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money, Rate};

use crate::coverage_record::CoverageRecord;
use crate::eligibility::{Eligibility, EligibilityRegistry};
use crate::error::CoverageError;
use crate::payer::Payer;
use crate::person::Person;
use crate::rules::SelectionRules;
use crate::service::ServiceCategory;

/// How the monthly premium is priced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", content = "value", rename_all = "snake_case")]
pub enum PremiumBasis {
    /// A fixed monthly amount
    Flat(Money),
    /// A share of yearly income, charged in twelve installments
    IncomeShare(Rate),
}

impl PremiumBasis {
    /// Monthly premium for a person with the given yearly income
    pub fn monthly(&self, income: Decimal) -> Money {
        match self {
            PremiumBasis::Flat(amount) => *amount,
            PremiumBasis::IncomeShare(rate) => {
                let share = rate
                    .as_decimal()
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                let monthly = (share * income / dec!(12))
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                Money::usd(monthly)
            }
        }
    }
}

impl Default for PremiumBasis {
    fn default() -> Self {
        PremiumBasis::Flat(Money::zero(Currency::USD))
    }
}

/// Which categories of care a plan pays for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceCoverage {
    /// The `*` wildcard
    #[default]
    All,
    Only(BTreeSet<ServiceCategory>),
}

impl ServiceCoverage {
    /// Parses a list of category names; `*` anywhere covers everything
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, CoverageError> {
        if names.iter().any(|n| n.as_ref().trim() == "*") {
            return Ok(ServiceCoverage::All);
        }
        let categories = names
            .iter()
            .map(|n| n.as_ref().parse::<ServiceCategory>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(CoverageError::invalid_plan)?;
        Ok(ServiceCoverage::Only(categories))
    }

    pub fn covers(&self, service: ServiceCategory) -> bool {
        match self {
            ServiceCoverage::All => true,
            ServiceCoverage::Only(set) => set.contains(&service),
        }
    }
}

/// An insurance product offered by a payer
#[derive(Debug)]
pub struct InsurancePlan {
    id: String,
    payer: Arc<Payer>,
    services: ServiceCoverage,
    deductible: Money,
    default_copay: Money,
    /// Share of the post-deductible balance the payer covers
    coinsurance: Rate,
    premium: PremiumBasis,
    max_out_of_pocket: Option<Money>,
    priority: u32,
    eligibility_name: String,
    eligibility: Arc<Eligibility>,
    active_start_year: i32,
    /// Exclusive; `None` means the plan never retires
    active_end_year: Option<i32>,
    dual_eligible: bool,
    medicare_supplement: bool,
    aca: bool,
}

impl InsurancePlan {
    pub const NO_INSURANCE_ID: &'static str = "no-insurance";

    /// The self-pay plan: covers nothing, costs nothing, accepts everyone
    pub fn no_insurance() -> Self {
        Self {
            id: Self::NO_INSURANCE_ID.to_string(),
            payer: Arc::new(Payer::no_insurance()),
            services: ServiceCoverage::Only(BTreeSet::new()),
            deductible: Money::zero(Currency::USD),
            default_copay: Money::zero(Currency::USD),
            coinsurance: Rate::zero(),
            premium: PremiumBasis::default(),
            max_out_of_pocket: None,
            priority: u32::MAX,
            eligibility_name: EligibilityRegistry::GENERIC.to_string(),
            eligibility: Arc::new(Eligibility::Generic),
            active_start_year: i32::MIN,
            active_end_year: None,
            dual_eligible: false,
            medicare_supplement: false,
            aca: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payer(&self) -> &Arc<Payer> {
        &self.payer
    }

    pub fn deductible(&self) -> Money {
        self.deductible
    }

    pub fn default_copay(&self) -> Money {
        self.default_copay
    }

    pub fn coinsurance(&self) -> Rate {
        self.coinsurance
    }

    pub fn premium(&self) -> &PremiumBasis {
        &self.premium
    }

    pub fn max_out_of_pocket(&self) -> Option<Money> {
        self.max_out_of_pocket
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn eligibility_name(&self) -> &str {
        &self.eligibility_name
    }

    pub fn is_dual_eligible(&self) -> bool {
        self.dual_eligible
    }

    pub fn is_medicare_supplement(&self) -> bool {
        self.medicare_supplement
    }

    pub fn is_aca(&self) -> bool {
        self.aca
    }

    pub fn is_government(&self) -> bool {
        self.payer.is_government()
    }

    pub fn is_no_insurance(&self) -> bool {
        self.payer.is_no_insurance()
    }

    /// Whether a Medicare supplement may be bought on top of this plan
    pub fn may_purchase_supplement(&self) -> bool {
        self.is_government() && self.payer.name().eq_ignore_ascii_case("medicare")
    }

    /// `none` for self-pay, the payer name for government programs,
    /// otherwise `private`
    pub fn insurance_status(&self) -> String {
        if self.is_no_insurance() {
            "none".to_string()
        } else if self.is_government() {
            self.payer.name().to_ascii_lowercase()
        } else {
            "private".to_string()
        }
    }

    /// Whether the plan pays for the category. An unspecified category is
    /// always covered.
    pub fn covers_service(&self, service: Option<ServiceCategory>) -> bool {
        match service {
            None => true,
            Some(service) => self.services.covers(service),
        }
    }

    /// Copay owed for an entry of the given category starting at `time`.
    /// Wellness visits after the mandate carry no copay.
    pub fn determine_copay(
        &self,
        service: ServiceCategory,
        time: DateTime<Utc>,
        rules: &SelectionRules,
    ) -> Money {
        if service == ServiceCategory::Wellness && time > rules.mandate_time {
            return Money::zero(self.default_copay.currency());
        }
        self.default_copay
    }

    pub fn monthly_premium(&self, income: Decimal) -> Money {
        self.premium.monthly(income)
    }

    /// Twelve monthly premiums, rounded to whole units
    pub fn yearly_cost(&self, income: Decimal) -> Money {
        let yearly = (self.monthly_premium(income).amount() * dec!(12))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        Money::usd(yearly)
    }

    /// Whether the plan's eligibility criteria admit the person at `time`,
    /// given what `coverage` shows they have already spent
    pub fn accepts(
        &self,
        person: &Person,
        time: DateTime<Utc>,
        coverage: Option<&CoverageRecord>,
    ) -> bool {
        self.eligibility.is_eligible_given(person, time, coverage)
    }

    /// Whether the plan is on offer at `time`
    pub fn is_active(&self, time: DateTime<Utc>) -> bool {
        let year = time.year();
        year >= self.active_start_year && self.active_end_year.map_or(true, |end| year < end)
    }

    /// Pays one month of premium to the payer and returns the share the
    /// person pays. Employers carry most of a private, non-ACA premium for
    /// people above the mandate occupation level.
    pub fn pay_monthly_premium(
        &self,
        person: &Person,
        rules: &SelectionRules,
    ) -> Result<Money, CoverageError> {
        let premium = self.monthly_premium(person.income);
        self.payer.statistics().add_revenue(premium)?;
        if person.occupation_level > rules.mandate_occupation && !self.is_government() && !self.aca {
            let employee_share = Decimal::ONE - rules.employer_coverage.as_decimal();
            return Ok(premium.multiply(employee_share));
        }
        Ok(premium)
    }
}

impl fmt::Display for InsurancePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.payer.name())
    }
}

/// Builder for insurance plans
///
/// # Example
///
/// ```ignore
/// let plan = PlanBuilder::new("acme-gold", payer)
///     .deductible(Money::usd(dec!(500)))
///     .coinsurance(Rate::new(dec!(0.8)))
///     .build()?;
/// ```
#[derive(Debug)]
pub struct PlanBuilder {
    id: String,
    payer: Arc<Payer>,
    services: ServiceCoverage,
    deductible: Money,
    default_copay: Money,
    coinsurance: Rate,
    premium: PremiumBasis,
    max_out_of_pocket: Option<Money>,
    priority: u32,
    eligibility: Option<(String, Arc<Eligibility>)>,
    active_start_year: i32,
    active_end_year: Option<i32>,
    dual_eligible: Option<bool>,
    medicare_supplement: bool,
    aca: bool,
}

impl PlanBuilder {
    pub fn new(id: impl Into<String>, payer: Arc<Payer>) -> Self {
        Self {
            id: id.into(),
            payer,
            services: ServiceCoverage::All,
            deductible: Money::zero(Currency::USD),
            default_copay: Money::zero(Currency::USD),
            coinsurance: Rate::zero(),
            premium: PremiumBasis::default(),
            max_out_of_pocket: None,
            priority: 0,
            eligibility: None,
            active_start_year: 1900,
            active_end_year: None,
            dual_eligible: None,
            medicare_supplement: false,
            aca: false,
        }
    }

    pub fn services(mut self, services: ServiceCoverage) -> Self {
        self.services = services;
        self
    }

    pub fn deductible(mut self, deductible: Money) -> Self {
        self.deductible = deductible;
        self
    }

    pub fn copay(mut self, copay: Money) -> Self {
        self.default_copay = copay;
        self
    }

    pub fn coinsurance(mut self, coinsurance: Rate) -> Self {
        self.coinsurance = coinsurance;
        self
    }

    pub fn premium(mut self, premium: PremiumBasis) -> Self {
        self.premium = premium;
        self
    }

    pub fn max_out_of_pocket(mut self, max: Money) -> Self {
        self.max_out_of_pocket = Some(max);
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the eligibility criteria under a display name
    pub fn eligibility(mut self, name: impl Into<String>, eligibility: Arc<Eligibility>) -> Self {
        self.eligibility = Some((name.into(), eligibility));
        self
    }

    /// Years the plan is offered: `start` inclusive, `end` exclusive
    pub fn active_years(mut self, start: i32, end: Option<i32>) -> Self {
        self.active_start_year = start;
        self.active_end_year = end;
        self
    }

    /// Overrides the dual-eligible flag, which otherwise follows the
    /// eligibility name
    pub fn dual_eligible(mut self, dual: bool) -> Self {
        self.dual_eligible = Some(dual);
        self
    }

    pub fn medicare_supplement(mut self, supplement: bool) -> Self {
        self.medicare_supplement = supplement;
        self
    }

    pub fn aca(mut self, aca: bool) -> Self {
        self.aca = aca;
        self
    }

    /// Builds the plan
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::InvalidPlan`] when an income-share premium
    /// exceeds 100% of income, when the active years are empty, or when a
    /// cost-sharing amount is negative.
    pub fn build(self) -> Result<InsurancePlan, CoverageError> {
        if let PremiumBasis::IncomeShare(rate) = self.premium {
            if rate.as_decimal() > Decimal::ONE || rate.as_decimal() < Decimal::ZERO {
                return Err(CoverageError::invalid_plan(format!(
                    "income based premium for {} must be in range 0.0 - 1.0, given {}",
                    self.id,
                    rate.as_decimal()
                )));
            }
        }
        if let Some(end) = self.active_end_year {
            if self.active_start_year >= end {
                return Err(CoverageError::invalid_plan(format!(
                    "plan {} start year {} must be before its end year {}",
                    self.id, self.active_start_year, end
                )));
            }
        }
        if self.deductible.is_negative() || self.default_copay.is_negative() {
            return Err(CoverageError::invalid_plan(format!(
                "plan {} has a negative deductible or copay",
                self.id
            )));
        }
        let coinsurance = self.coinsurance.as_decimal();
        if coinsurance < Decimal::ZERO || coinsurance > Decimal::ONE {
            return Err(CoverageError::invalid_plan(format!(
                "plan {} coinsurance {} outside 0.0 - 1.0",
                self.id, coinsurance
            )));
        }

        let (eligibility_name, eligibility) = self.eligibility.unwrap_or_else(|| {
            (
                EligibilityRegistry::GENERIC.to_string(),
                Arc::new(Eligibility::Generic),
            )
        });
        let dual_eligible = self.dual_eligible.unwrap_or_else(|| {
            eligibility_name.eq_ignore_ascii_case(EligibilityRegistry::DUAL_ELIGIBLE)
        });

        Ok(InsurancePlan {
            id: self.id,
            payer: self.payer,
            services: self.services,
            deductible: self.deductible,
            default_copay: self.default_copay,
            coinsurance: self.coinsurance,
            premium: self.premium,
            max_out_of_pocket: self.max_out_of_pocket,
            priority: self.priority,
            eligibility_name,
            eligibility,
            active_start_year: self.active_start_year,
            active_end_year: self.active_end_year,
            dual_eligible,
            medicare_supplement: self.medicare_supplement,
            aca: self.aca,
        })
    }
}
