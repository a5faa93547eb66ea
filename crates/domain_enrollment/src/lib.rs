//! Enrollment Domain
//!
//! Month-granular Medicare contract histories for a beneficiary.
//!
//! - **Periods**: a span of whole months on one contract (or none)
//! - **Histories**: contiguous periods generated from random change points
//! - **Pools**: Part C / Part D contracts and plan benefit packages issued
//!   from sequential allocators
//! - **Part D**: low-income subsidy cost sharing code and employer PDP flag
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_enrollment::{ContractHistory, ContractPool, HistoryRequest, PoolSettings};
//!
//! let contracts = ContractPool::part_c(&PoolSettings::part_c_default())?;
//! let history = ContractHistory::generate(&request, &contracts, &packages, &mut rng)?;
//! let months = history.covered_months_count(2020);
//! ```

pub mod period;
pub mod pool;
pub mod history;
pub mod part_d;
pub mod error;

pub use period::ContractPeriod;
pub use pool::{
    ContractPool, PlanBenefitPackagePool, PoolSettings, PART_C_NO_CONTRACT_PERCENT,
    PART_D_NO_CONTRACT_PERCENT,
};
pub use history::{ChangeProbabilities, ContractHistory, HistoryRequest, MAX_YEARS_OF_HISTORY};
pub use part_d::{CostSharingCode, PartDEnrollment};
pub use error::EnrollmentError;

/// Medicare Advantage contract history
pub type PartCContractHistory = ContractHistory<core_kernel::PartCContractId>;
