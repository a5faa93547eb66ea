//! Claims Domain
//!
//! Divides the cost of billable clinical entries between a person's primary
//! payer, secondary payer, and the person.
//!
//! # Adjudication cascade
//!
//! ```text
//! not covered -> patient
//! copay -> deductible -> adjustment -> coinsurance -> secondary -> patient
//! ```
//!
//! Each step after the copay runs only while an unpaid balance remains. The
//! deductible draws down the balance shared by every claim in the same
//! enrollment period.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_claims::{BillableEntry, Claim, EntryKind};
//!
//! let mut claim = Claim::new(person.id, encounter)?;
//! claim.add_line_item(procedure)?;
//! claim.assign_costs(&mut coverage, &rules, &mut rng)?;
//! let owed = claim.patient_cost();
//! ```

pub mod entry;
pub mod claim;
pub mod error;

pub use entry::{BillableEntry, EntryKind};
pub use claim::{Claim, ClaimLine, ClaimSummary};
pub use error::ClaimError;
