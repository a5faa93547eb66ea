//! Core Kernel - Foundational types for the coverage simulator
//!
//! This crate provides the building blocks shared by every domain crate:
//! - Money types with precise decimal arithmetic
//! - Month-granular calendar helpers
//! - Fixed-width identifier codecs and sequential allocation
//! - Deterministic per-person random streams

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod rng;

pub use money::{Money, Currency, MoneyError, Rate};
pub use temporal::{YearMonth, TemporalError};
pub use identifiers::{
    CliaId, CodeFormat, FixedWidthCode, Hicn, IdentifierError, Mbi, PartCContractId,
    PartDContractId, PersonId, PlanBenefitPackageId, SequentialAllocator, SequentialCode,
};
pub use rng::SimRng;
