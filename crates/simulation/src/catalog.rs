//! Payer and plan catalog built from configuration

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal_macros::dec;
use tracing::info;

use core_kernel::{Money, Rate};
use domain_coverage::{
    AdjustmentStrategy, EligibilityRegistry, GeoPoint, InsurancePlan, Ownership, Payer,
    PayerSummary, PlanBuilder, ServiceCoverage,
};

use crate::config::{PayerConfig, PlanConfig, SimulationConfig};
use crate::error::SimulationError;

/// Every payer and plan on offer, shared read-only by all workers
#[derive(Debug)]
pub struct Catalog {
    payers: Vec<Arc<Payer>>,
    plans: Vec<Arc<InsurancePlan>>,
    supplements: Vec<Arc<InsurancePlan>>,
    no_insurance: Arc<InsurancePlan>,
}

impl Catalog {
    /// Builds the catalog, using the built-in payers and plans when the
    /// configuration lists none
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let (payers, plans) = if config.payers.is_empty() && config.plans.is_empty() {
            (default_payers(), default_plans())
        } else {
            (config.payers.clone(), config.plans.clone())
        };
        let registry = EligibilityRegistry::with_builtins(config.poverty_level, config.monthly_spenddown);
        let default_adjustment = config.default_adjustment();

        let mut by_id: HashMap<String, Arc<Payer>> = HashMap::new();
        let mut ordered = Vec::with_capacity(payers.len());
        for entry in &payers {
            if by_id.contains_key(&entry.id) {
                return Err(SimulationError::configuration(format!(
                    "duplicate payer id {}",
                    entry.id
                )));
            }
            let payer = Arc::new(build_payer(entry, default_adjustment));
            by_id.insert(entry.id.clone(), Arc::clone(&payer));
            ordered.push(payer);
        }

        let mut primary = Vec::new();
        let mut supplements = Vec::new();
        let mut seen = Vec::with_capacity(plans.len());
        for entry in &plans {
            if seen.contains(&entry.id.as_str()) {
                return Err(SimulationError::configuration(format!(
                    "duplicate plan id {}",
                    entry.id
                )));
            }
            seen.push(entry.id.as_str());
            let payer = by_id.get(&entry.payer).ok_or_else(|| {
                SimulationError::configuration(format!(
                    "plan {} references unknown payer {}",
                    entry.id, entry.payer
                ))
            })?;
            let plan = Arc::new(build_plan(entry, Arc::clone(payer), &registry)?);
            if plan.is_medicare_supplement() {
                supplements.push(plan);
            } else {
                primary.push(plan);
            }
        }

        info!(
            payers = ordered.len(),
            plans = primary.len(),
            supplements = supplements.len(),
            "Loaded plan catalog"
        );

        Ok(Self {
            payers: ordered,
            plans: primary,
            supplements,
            no_insurance: Arc::new(InsurancePlan::no_insurance()),
        })
    }

    pub fn payers(&self) -> &[Arc<Payer>] {
        &self.payers
    }

    /// Plans a person may hold as primary coverage
    pub fn plans(&self) -> &[Arc<InsurancePlan>] {
        &self.plans
    }

    /// Medicare supplement plans, offered only as secondary coverage
    pub fn supplements(&self) -> &[Arc<InsurancePlan>] {
        &self.supplements
    }

    pub fn no_insurance(&self) -> &Arc<InsurancePlan> {
        &self.no_insurance
    }

    /// Statistics of every configured payer, then the self-pay payer
    pub fn payer_summaries(&self) -> Vec<PayerSummary> {
        self.payers
            .iter()
            .map(|p| p.summary())
            .chain(std::iter::once(self.no_insurance.payer().summary()))
            .collect()
    }
}

fn build_payer(entry: &PayerConfig, default_adjustment: AdjustmentStrategy) -> Payer {
    let adjustment = match &entry.adjustment_behavior {
        Some(behavior) => AdjustmentStrategy::from_behavior(
            behavior,
            entry.adjustment_rate.unwrap_or_default(),
        ),
        None => default_adjustment,
    };
    let payer = Payer::new(entry.id.clone(), entry.name.clone(), entry.ownership)
        .with_adjustment(adjustment);
    match entry.location {
        Some(location) => payer.with_location(location),
        None => payer,
    }
}

fn build_plan(
    entry: &PlanConfig,
    payer: Arc<Payer>,
    registry: &EligibilityRegistry,
) -> Result<InsurancePlan, SimulationError> {
    let eligibility = registry.resolve(&entry.eligibility)?;
    let mut builder = PlanBuilder::new(entry.id.clone(), payer)
        .services(ServiceCoverage::from_names(entry.services.as_slice())?)
        .deductible(Money::usd(entry.deductible))
        .copay(Money::usd(entry.copay))
        .coinsurance(Rate::new(entry.coinsurance))
        .premium(entry.premium()?)
        .priority(entry.priority)
        .eligibility(entry.eligibility.clone(), eligibility)
        .active_years(entry.start_year, entry.end_year)
        .medicare_supplement(entry.medicare_supplement)
        .aca(entry.aca);
    if let Some(max) = entry.max_out_of_pocket {
        builder = builder.max_out_of_pocket(Money::usd(max));
    }
    Ok(builder.build()?)
}

fn payer(id: &str, name: &str, ownership: Ownership, location: Option<GeoPoint>) -> PayerConfig {
    PayerConfig {
        id: id.to_string(),
        name: name.to_string(),
        ownership,
        location,
        adjustment_behavior: None,
        adjustment_rate: None,
    }
}

/// Medicare, Medicaid, a dual-eligible program and two private insurers
pub fn default_payers() -> Vec<PayerConfig> {
    vec![
        payer("medicare", "Medicare", Ownership::Government, None),
        payer("medicaid", "Medicaid", Ownership::Government, None),
        payer("dual-eligible", "Dual Eligible", Ownership::Government, None),
        payer(
            "harbor",
            "Harbor Health",
            Ownership::Private,
            Some(GeoPoint::new(42.3601, -71.0589)),
        ),
        payer(
            "summit",
            "Summit Mutual",
            Ownership::Private,
            Some(GeoPoint::new(41.8240, -71.4128)),
        ),
    ]
}

pub fn default_plans() -> Vec<PlanConfig> {
    let base = PlanConfig {
        id: String::new(),
        payer: String::new(),
        services: vec!["*".to_string()],
        deductible: dec!(0),
        copay: dec!(0),
        coinsurance: dec!(0),
        monthly_premium: None,
        income_premium_share: None,
        max_out_of_pocket: None,
        priority: 0,
        eligibility: EligibilityRegistry::GENERIC.to_string(),
        start_year: 1900,
        end_year: None,
        medicare_supplement: false,
        aca: false,
    };
    vec![
        PlanConfig {
            id: "medicare".to_string(),
            payer: "medicare".to_string(),
            deductible: dec!(226),
            coinsurance: dec!(0.8),
            eligibility: EligibilityRegistry::MEDICARE.to_string(),
            start_year: 1966,
            ..base.clone()
        },
        PlanConfig {
            id: "medicaid".to_string(),
            payer: "medicaid".to_string(),
            coinsurance: dec!(1),
            eligibility: EligibilityRegistry::MEDICAID.to_string(),
            start_year: 1966,
            ..base.clone()
        },
        PlanConfig {
            id: "dual-eligible".to_string(),
            payer: "dual-eligible".to_string(),
            coinsurance: dec!(1),
            eligibility: EligibilityRegistry::DUAL_ELIGIBLE.to_string(),
            start_year: 1966,
            ..base.clone()
        },
        PlanConfig {
            id: "harbor-gold".to_string(),
            payer: "harbor".to_string(),
            deductible: dec!(1000),
            copay: dec!(25),
            coinsurance: dec!(0.8),
            monthly_premium: Some(dec!(450)),
            max_out_of_pocket: Some(dec!(6000)),
            priority: 1,
            ..base.clone()
        },
        PlanConfig {
            id: "harbor-bronze".to_string(),
            payer: "harbor".to_string(),
            deductible: dec!(3000),
            copay: dec!(40),
            coinsurance: dec!(0.6),
            income_premium_share: Some(dec!(0.02)),
            priority: 2,
            aca: true,
            start_year: 2014,
            ..base.clone()
        },
        PlanConfig {
            id: "summit-select".to_string(),
            payer: "summit".to_string(),
            deductible: dec!(500),
            copay: dec!(20),
            coinsurance: dec!(0.7),
            monthly_premium: Some(dec!(320)),
            priority: 1,
            ..base.clone()
        },
        PlanConfig {
            id: "summit-medigap".to_string(),
            payer: "summit".to_string(),
            monthly_premium: Some(dec!(150)),
            eligibility: EligibilityRegistry::MEDICARE.to_string(),
            medicare_supplement: true,
            ..base
        },
    ]
}
