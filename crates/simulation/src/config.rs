//! Simulation configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `COVERAGE_SIM_*` environment variables (nested keys joined with
//! `__`, e.g. `COVERAGE_SIM_MANDATE__YEAR=2008`).

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::temporal::start_of_year;
use core_kernel::{Money, Rate};
use domain_coverage::{
    AdjustmentStrategy, EligibilityRegistry, GeoPoint, Ownership, PremiumBasis, SelectionBehavior,
    SelectionRules, DEFAULT_MONTHLY_SPENDDOWN,
};
use domain_enrollment::{ChangeProbabilities, PoolSettings, MAX_YEARS_OF_HISTORY};

use crate::error::SimulationError;

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "COVERAGE_SIM";

/// Individual mandate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MandateConfig {
    pub year: i32,
    /// Occupation level at or above which an employer covers the person
    pub occupation: f64,
}

impl Default for MandateConfig {
    fn default() -> Self {
        Self {
            year: SelectionRules::DEFAULT_MANDATE_YEAR,
            occupation: SelectionRules::DEFAULT_MANDATE_OCCUPATION,
        }
    }
}

/// Contract history generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    pub years_of_history: u32,
    pub open_enrollment_change: f64,
    pub mid_year_change: f64,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        let probabilities = ChangeProbabilities::default();
        Self {
            years_of_history: 10,
            open_enrollment_change: probabilities.open_enrollment,
            mid_year_change: probabilities.mid_year,
        }
    }
}

/// Where each identifier pool starts and how large it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierConfig {
    pub partc_contract_start: String,
    pub partc_contract_count: usize,
    pub partd_contract_start: String,
    pub partd_contract_count: usize,
    pub plan_benefit_package_start: String,
    pub plan_benefit_package_count: usize,
    pub hicn_start: String,
    pub mbi_start: String,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        let part_c = PoolSettings::part_c_default();
        let part_d = PoolSettings::part_d_default();
        let packages = PoolSettings::plan_benefit_package_default();
        Self {
            partc_contract_start: part_c.start,
            partc_contract_count: part_c.count,
            partd_contract_start: part_d.start,
            partd_contract_count: part_d.count,
            plan_benefit_package_start: packages.start,
            plan_benefit_package_count: packages.count,
            hicn_start: "T00000000A".to_string(),
            mbi_start: "1S00A00AA00".to_string(),
        }
    }
}

impl IdentifierConfig {
    pub fn part_c(&self) -> PoolSettings {
        PoolSettings::new(self.partc_contract_start.clone(), self.partc_contract_count)
    }

    pub fn part_d(&self) -> PoolSettings {
        PoolSettings::new(self.partd_contract_start.clone(), self.partd_contract_count)
    }

    pub fn plan_benefit_packages(&self) -> PoolSettings {
        PoolSettings::new(
            self.plan_benefit_package_start.clone(),
            self.plan_benefit_package_count,
        )
    }
}

/// One payer in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayerConfig {
    pub id: String,
    pub name: String,
    pub ownership: Ownership,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Overrides the simulation-wide adjustment behavior
    #[serde(default)]
    pub adjustment_behavior: Option<String>,
    #[serde(default)]
    pub adjustment_rate: Option<Decimal>,
}

/// One plan in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    pub id: String,
    /// Id of the offering payer
    pub payer: String,
    /// Covered service categories; `*` covers everything
    #[serde(default = "PlanConfig::all_services")]
    pub services: Vec<String>,
    #[serde(default)]
    pub deductible: Decimal,
    #[serde(default)]
    pub copay: Decimal,
    /// Share of the post-deductible balance the payer covers
    #[serde(default)]
    pub coinsurance: Decimal,
    /// Flat monthly premium
    #[serde(default)]
    pub monthly_premium: Option<Decimal>,
    /// Share of yearly income charged as premium, instead of a flat amount
    #[serde(default)]
    pub income_premium_share: Option<Decimal>,
    #[serde(default)]
    pub max_out_of_pocket: Option<Decimal>,
    #[serde(default)]
    pub priority: u32,
    /// Eligibility name or expression, resolved against the registry
    #[serde(default = "PlanConfig::generic_eligibility")]
    pub eligibility: String,
    #[serde(default = "PlanConfig::default_start_year")]
    pub start_year: i32,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub medicare_supplement: bool,
    #[serde(default)]
    pub aca: bool,
}

impl PlanConfig {
    fn all_services() -> Vec<String> {
        vec!["*".to_string()]
    }

    fn generic_eligibility() -> String {
        EligibilityRegistry::GENERIC.to_string()
    }

    fn default_start_year() -> i32 {
        1900
    }

    /// Flat or income based premium; both at once is a configuration error
    pub fn premium(&self) -> Result<PremiumBasis, SimulationError> {
        match (self.monthly_premium, self.income_premium_share) {
            (Some(_), Some(_)) => Err(SimulationError::configuration(format!(
                "plan {} sets both monthly_premium and income_premium_share",
                self.id
            ))),
            (Some(flat), None) => Ok(PremiumBasis::Flat(Money::usd(flat))),
            (None, Some(share)) => Ok(PremiumBasis::IncomeShare(Rate::new(share))),
            (None, None) => Ok(PremiumBasis::default()),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master seed; each person's stream derives from it
    pub seed: u64,
    pub log_level: String,
    pub json_logs: bool,
    /// Worker threads; zero uses the available parallelism
    pub workers: usize,
    /// `random`, `nearest`, `best_rate`, `priority` or `government_priority`
    pub selection_behavior: String,
    /// `none`, `fixed` or `random`
    pub adjustment_behavior: String,
    pub adjustment_rate: Decimal,
    pub mandate: MandateConfig,
    pub income_premium_ratio: Decimal,
    pub employer_coverage: Decimal,
    pub poverty_level: Decimal,
    /// Medically needy income limit per month
    pub monthly_spenddown: Decimal,
    pub enrollment: EnrollmentConfig,
    pub identifiers: IdentifierConfig,
    /// Empty payers and plans select the built-in catalog
    pub payers: Vec<PayerConfig>,
    pub plans: Vec<PlanConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let rules = SelectionRules::default();
        Self {
            seed: 0,
            log_level: "info".to_string(),
            json_logs: false,
            workers: 0,
            selection_behavior: "government_priority".to_string(),
            adjustment_behavior: "none".to_string(),
            adjustment_rate: dec!(0.05),
            mandate: MandateConfig::default(),
            income_premium_ratio: rules.income_premium_ratio.as_decimal(),
            employer_coverage: rules.employer_coverage.as_decimal(),
            poverty_level: rules.poverty_level,
            monthly_spenddown: DEFAULT_MONTHLY_SPENDDOWN,
            enrollment: EnrollmentConfig::default(),
            identifiers: IdentifierConfig::default(),
            payers: Vec::new(),
            plans: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Loads defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, SimulationError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads defaults overlaid with TOML text, without the environment
    pub fn from_toml(contents: &str) -> Result<Self, SimulationError> {
        let config: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<(), SimulationError> {
        self.selection_behavior()?;
        self.change_probabilities().validate()?;
        for (name, rate) in [
            ("income_premium_ratio", self.income_premium_ratio),
            ("employer_coverage", self.employer_coverage),
            ("adjustment_rate", self.adjustment_rate),
        ] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(SimulationError::configuration(format!(
                    "{} must be in range 0.0 - 1.0, given {}",
                    name, rate
                )));
            }
        }
        if self.poverty_level.is_sign_negative() {
            return Err(SimulationError::configuration("poverty_level must not be negative"));
        }
        if self.monthly_spenddown.is_sign_negative() {
            return Err(SimulationError::configuration("monthly_spenddown must not be negative"));
        }
        if self.enrollment.years_of_history > MAX_YEARS_OF_HISTORY {
            return Err(SimulationError::configuration(format!(
                "years_of_history must be at most {}, given {}",
                MAX_YEARS_OF_HISTORY, self.enrollment.years_of_history
            )));
        }
        Ok(())
    }

    pub fn selection_behavior(&self) -> Result<SelectionBehavior, SimulationError> {
        self.selection_behavior
            .parse()
            .map_err(|e: domain_coverage::CoverageError| SimulationError::configuration(e.to_string()))
    }

    pub fn selection_rules(&self) -> SelectionRules {
        SelectionRules {
            mandate_time: start_of_year(self.mandate.year),
            mandate_occupation: self.mandate.occupation,
            income_premium_ratio: Rate::new(self.income_premium_ratio),
            employer_coverage: Rate::new(self.employer_coverage),
            poverty_level: self.poverty_level,
        }
    }

    pub fn change_probabilities(&self) -> ChangeProbabilities {
        ChangeProbabilities {
            open_enrollment: self.enrollment.open_enrollment_change,
            mid_year: self.enrollment.mid_year_change,
        }
    }

    /// Adjustment for payers that do not override it
    pub fn default_adjustment(&self) -> AdjustmentStrategy {
        AdjustmentStrategy::from_behavior(&self.adjustment_behavior, self.adjustment_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.selection_behavior().unwrap(),
            SelectionBehavior::GovernmentPriority
        );
        assert_eq!(config.selection_rules(), SelectionRules::default());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = SimulationConfig::from_toml(
            r#"
            seed = 42
            selection_behavior = "best_rate"
            adjustment_behavior = "random"
            adjustment_rate = 0.2

            [mandate]
            year = 2010

            [enrollment]
            years_of_history = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.selection_behavior().unwrap(), SelectionBehavior::BestRate);
        assert_eq!(config.mandate.year, 2010);
        assert_eq!(config.mandate.occupation, 0.2);
        assert_eq!(config.enrollment.years_of_history, 3);
        assert_eq!(config.enrollment.open_enrollment_change, 0.2);
        assert_eq!(config.default_adjustment(), AdjustmentStrategy::random(dec!(0.2)));
    }

    #[test]
    fn test_unknown_selection_behavior_is_error() {
        let result = SimulationConfig::from_toml(r#"selection_behavior = "cheapest""#);
        assert!(matches!(result, Err(SimulationError::Configuration(_))));
    }

    #[test]
    fn test_unknown_adjustment_behavior_falls_back() {
        let config = SimulationConfig::from_toml(r#"adjustment_behavior = "haggle""#).unwrap();
        assert_eq!(config.default_adjustment(), AdjustmentStrategy::None);
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        let result = SimulationConfig::from_toml(
            r#"
            [enrollment]
            mid_year_change = 1.5
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_history_rejected() {
        let result = SimulationConfig::from_toml(
            r#"
            [enrollment]
            years_of_history = 300000
            "#,
        );
        assert!(matches!(result, Err(SimulationError::Configuration(msg)) if msg.contains("years_of_history")));
    }

    #[test]
    fn test_catalog_entries_parse() {
        let config = SimulationConfig::from_toml(
            r#"
            [[payers]]
            id = "acme"
            name = "Acme Health"
            ownership = "private"
            location = { lat = 42.36, lon = -71.06 }

            [[plans]]
            id = "acme-gold"
            payer = "acme"
            deductible = 500
            copay = 20
            coinsurance = 0.8
            monthly_premium = 350
            services = ["ambulatory", "inpatient"]
            "#,
        )
        .unwrap();
        assert_eq!(config.payers.len(), 1);
        assert_eq!(config.payers[0].ownership, Ownership::Private);
        let plan = &config.plans[0];
        assert_eq!(plan.deductible, dec!(500));
        assert_eq!(plan.eligibility, "generic");
        assert_eq!(plan.premium().unwrap(), PremiumBasis::Flat(Money::usd(dec!(350))));
    }

    #[test]
    fn test_both_premium_kinds_rejected() {
        let plan = PlanConfig {
            id: "p".to_string(),
            payer: "x".to_string(),
            services: vec!["*".to_string()],
            deductible: dec!(0),
            copay: dec!(0),
            coinsurance: dec!(0),
            monthly_premium: Some(dec!(10)),
            income_premium_share: Some(dec!(0.1)),
            max_out_of_pocket: None,
            priority: 0,
            eligibility: "generic".to_string(),
            start_year: 1900,
            end_year: None,
            medicare_supplement: false,
            aca: false,
        };
        assert!(plan.premium().is_err());
    }
}
