//! Part D specifics: low-income subsidy cost sharing and employer drug plans

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{PartDContractId, SimRng};

use crate::error::EnrollmentError;
use crate::history::{ContractHistory, HistoryRequest};
use crate::pool::{ContractPool, PlanBenefitPackagePool};

/// Percent chance that a beneficiary without subsidy is on an employer PDP
pub const EMPLOYER_PDP_PERCENT: u32 = 1;

/// Part D cost sharing group, determined by income level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostSharingCode {
    /// Subsidy with no copayment
    #[serde(rename = "01")]
    FullSubsidyNoCopay,
    /// Subsidy with low copayment
    #[serde(rename = "02")]
    FullSubsidyLowCopay,
    /// Subsidy with high copayment
    #[serde(rename = "03")]
    FullSubsidyHighCopay,
    /// No premium or cost sharing subsidy
    #[serde(rename = "09")]
    NoSubsidy,
}

impl CostSharingCode {
    pub fn for_income_level(income_level: f64) -> Self {
        if income_level >= 1.0 {
            CostSharingCode::NoSubsidy
        } else if income_level >= 0.6 {
            CostSharingCode::FullSubsidyHighCopay
        } else if income_level >= 0.3 {
            CostSharingCode::FullSubsidyLowCopay
        } else {
            CostSharingCode::FullSubsidyNoCopay
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CostSharingCode::FullSubsidyNoCopay => "01",
            CostSharingCode::FullSubsidyLowCopay => "02",
            CostSharingCode::FullSubsidyHighCopay => "03",
            CostSharingCode::NoSubsidy => "09",
        }
    }
}

impl fmt::Display for CostSharingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A beneficiary's Part D contract history with its subsidy group
#[derive(Debug, Clone, Serialize)]
pub struct PartDEnrollment {
    history: ContractHistory<PartDContractId>,
    cost_sharing: CostSharingCode,
    employer_pdp: bool,
}

impl PartDEnrollment {
    pub fn generate(
        request: &HistoryRequest,
        income_level: f64,
        contracts: &ContractPool<PartDContractId>,
        packages: &PlanBenefitPackagePool,
        rng: &mut SimRng,
    ) -> Result<Self, EnrollmentError> {
        let history = ContractHistory::generate(request, contracts, packages, rng)?;
        let cost_sharing = CostSharingCode::for_income_level(income_level);
        let employer_pdp =
            cost_sharing == CostSharingCode::NoSubsidy && rng.rand_int(100) < EMPLOYER_PDP_PERCENT;
        debug!(
            periods = history.periods().len(),
            cost_sharing = %cost_sharing,
            employer_pdp,
            "Generated Part D enrollment"
        );
        Ok(Self {
            history,
            cost_sharing,
            employer_pdp,
        })
    }

    pub fn history(&self) -> &ContractHistory<PartDContractId> {
        &self.history
    }

    pub fn cost_sharing(&self) -> CostSharingCode {
        self.cost_sharing
    }

    pub fn has_employer_pdp(&self) -> bool {
        self.employer_pdp
    }

    /// `Y`/`N` employer plan indicator, `None` when not on a contract
    pub fn employer_pdp_indicator(&self, contract_id: Option<&PartDContractId>) -> Option<&'static str> {
        contract_id?;
        Some(if self.employer_pdp { "Y" } else { "N" })
    }

    /// Indicator for the contract in force at `time`
    pub fn employer_pdp_indicator_at(&self, time: DateTime<Utc>) -> Option<&'static str> {
        self.employer_pdp_indicator(self.history.contract_id_at(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ChangeProbabilities;
    use crate::pool::PoolSettings;
    use chrono::TimeZone;

    #[test]
    fn test_cost_sharing_thresholds() {
        assert_eq!(CostSharingCode::for_income_level(1.5).code(), "09");
        assert_eq!(CostSharingCode::for_income_level(1.0).code(), "09");
        assert_eq!(CostSharingCode::for_income_level(0.99).code(), "03");
        assert_eq!(CostSharingCode::for_income_level(0.6).code(), "03");
        assert_eq!(CostSharingCode::for_income_level(0.3).code(), "02");
        assert_eq!(CostSharingCode::for_income_level(0.29).code(), "01");
        assert_eq!(CostSharingCode::for_income_level(0.0).code(), "01");
    }

    #[test]
    fn test_cost_sharing_serializes_as_code() {
        let json = serde_json::to_string(&CostSharingCode::FullSubsidyLowCopay).unwrap();
        assert_eq!(json, "\"02\"");
    }

    fn enrollment(seed: u64, income_level: f64) -> PartDEnrollment {
        let contracts = ContractPool::part_d(&PoolSettings::part_d_default()).unwrap();
        let packages = PlanBenefitPackagePool::new(&PoolSettings::plan_benefit_package_default()).unwrap();
        let request = HistoryRequest {
            stop: Utc.with_ymd_and_hms(2020, 12, 31, 0, 0, 0).unwrap(),
            years_of_history: 3,
            probabilities: ChangeProbabilities::default(),
        };
        PartDEnrollment::generate(&request, income_level, &contracts, &packages, &mut SimRng::seed_from(seed))
            .unwrap()
    }

    #[test]
    fn test_subsidized_never_employer_pdp() {
        for seed in 0..200 {
            assert!(!enrollment(seed, 0.5).has_employer_pdp());
        }
    }

    #[test]
    fn test_indicator_requires_contract() {
        let e = enrollment(5, 2.0);
        assert_eq!(e.employer_pdp_indicator(None), None);
        let contract = PartDContractId::parse("Z0001").unwrap();
        let expected = if e.has_employer_pdp() { "Y" } else { "N" };
        assert_eq!(e.employer_pdp_indicator(Some(&contract)), Some(expected));
    }
}
