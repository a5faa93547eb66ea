//! Pools of contract and plan benefit package identifiers
//!
//! Pools are issued once, at engine start-up, from a [`SequentialAllocator`]
//! and then sampled per beneficiary.

use serde::{Deserialize, Serialize};

use core_kernel::{
    PartCContractId, PartDContractId, PlanBenefitPackageId, SequentialAllocator, SequentialCode,
    SimRng,
};

use crate::error::EnrollmentError;

/// Percent of draws with no Part C contract
pub const PART_C_NO_CONTRACT_PERCENT: u32 = 42;

/// Percent of draws with no Part D contract
pub const PART_D_NO_CONTRACT_PERCENT: u32 = 30;

/// Where a pool of identifiers starts and how many it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    pub start: String,
    pub count: usize,
}

impl PoolSettings {
    pub fn new(start: impl Into<String>, count: usize) -> Self {
        Self {
            start: start.into(),
            count,
        }
    }

    pub fn part_c_default() -> Self {
        Self::new("Y0001", 10)
    }

    pub fn part_d_default() -> Self {
        Self::new("Z0001", 10)
    }

    pub fn plan_benefit_package_default() -> Self {
        Self::new("800", 5)
    }
}

fn issue<T: SequentialCode>(
    allocator: &SequentialAllocator<T>,
    count: usize,
) -> Result<Vec<T>, EnrollmentError> {
    if count == 0 {
        return Err(EnrollmentError::invalid_configuration(format!(
            "{} pool must not be empty",
            T::KIND
        )));
    }
    Ok(allocator.allocate_many(count)?)
}

/// Contract identifiers of one kind plus the odds of drawing none
#[derive(Debug, Clone)]
pub struct ContractPool<T> {
    contracts: Vec<T>,
    no_contract_percent: u32,
}

impl<T: SequentialCode> ContractPool<T> {
    /// Issues `count` consecutive identifiers from `allocator`
    pub fn from_allocator(
        allocator: &SequentialAllocator<T>,
        count: usize,
        no_contract_percent: u32,
    ) -> Result<Self, EnrollmentError> {
        if no_contract_percent > 100 {
            return Err(EnrollmentError::invalid_configuration(format!(
                "no contract percent {} above 100",
                no_contract_percent
            )));
        }
        Ok(Self {
            contracts: issue(allocator, count)?,
            no_contract_percent,
        })
    }

    /// Draws a contract, or `None` for a beneficiary who is not enrolled
    pub fn random_contract(&self, rng: &mut SimRng) -> Option<T> {
        if rng.rand_int(100) < self.no_contract_percent {
            return None;
        }
        rng.choose(&self.contracts).cloned()
    }

    pub fn contracts(&self) -> &[T] {
        &self.contracts
    }

    pub fn no_contract_percent(&self) -> u32 {
        self.no_contract_percent
    }
}

impl ContractPool<PartCContractId> {
    /// Medicare Advantage contracts
    pub fn part_c(settings: &PoolSettings) -> Result<Self, EnrollmentError> {
        let allocator = SequentialAllocator::<PartCContractId>::parse_start(&settings.start)?;
        Self::from_allocator(&allocator, settings.count, PART_C_NO_CONTRACT_PERCENT)
    }
}

impl ContractPool<PartDContractId> {
    /// Prescription drug plan contracts
    pub fn part_d(settings: &PoolSettings) -> Result<Self, EnrollmentError> {
        let allocator = SequentialAllocator::<PartDContractId>::parse_start(&settings.start)?;
        Self::from_allocator(&allocator, settings.count, PART_D_NO_CONTRACT_PERCENT)
    }
}

/// Plan benefit packages offered under every contract
#[derive(Debug, Clone)]
pub struct PlanBenefitPackagePool {
    packages: Vec<PlanBenefitPackageId>,
}

impl PlanBenefitPackagePool {
    pub fn new(settings: &PoolSettings) -> Result<Self, EnrollmentError> {
        let allocator = SequentialAllocator::<PlanBenefitPackageId>::parse_start(&settings.start)?;
        Ok(Self {
            packages: issue(&allocator, settings.count)?,
        })
    }

    /// A random package for an enrolled beneficiary; `None` without a contract
    pub fn random_package<T>(
        &self,
        rng: &mut SimRng,
        contract_id: Option<&T>,
    ) -> Option<PlanBenefitPackageId> {
        contract_id?;
        rng.choose(&self.packages).copied()
    }

    pub fn packages(&self) -> &[PlanBenefitPackageId] {
        &self.packages
    }
}
