//! Coverage Domain
//!
//! Payers, their insurance plans, and how a simulated person ends up on one.
//!
//! # Components
//!
//! - **Plans and payers**: cost-sharing and premium terms, atomic payer statistics
//! - **Eligibility**: declarative criteria trees with a named registry
//! - **Adjustment**: payer discount strategies applied during adjudication
//! - **Finders**: pluggable plan selection strategies
//! - **Coverage record**: enrollment periods and their running deductible
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_coverage::{FinderInput, SelectionBehavior};
//!
//! let finder = SelectionBehavior::GovernmentPriority.finder();
//! let plan = finder.find(&FinderInput {
//!     plans: &catalog,
//!     person: &person,
//!     service: None,
//!     time,
//!     rules: &rules,
//!     no_insurance: &no_insurance,
//!     coverage: None,
//! }, &mut rng);
//! coverage.set_plan_at_time(time, plan, no_insurance.clone());
//! ```

pub mod person;
pub mod service;
pub mod rules;
pub mod adjustment;
pub mod eligibility;
pub mod payer;
pub mod plan;
pub mod coverage_record;
pub mod finder;
pub mod error;

pub use person::{AttributeValue, GeoPoint, Person};
pub use service::ServiceCategory;
pub use rules::SelectionRules;
pub use adjustment::AdjustmentStrategy;
pub use eligibility::{
    AttributeRule, Eligibility, EligibilityRegistry, Operator, DEFAULT_MONTHLY_SPENDDOWN,
};
pub use payer::{Ownership, Payer, PayerStatistics, PayerSummary};
pub use plan::{InsurancePlan, PlanBuilder, PremiumBasis, ServiceCoverage};
pub use coverage_record::{CoverageRecord, PlanRecord};
pub use finder::{
    meets_basic_requirements, select_plan, BestRatesFinder, FinderInput, GovernmentPriorityFinder,
    NearestFinder, PlanFinder, PriorityFinder, RandomFinder, SelectionBehavior,
};
pub use error::CoverageError;
