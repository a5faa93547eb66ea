//! Claims domain errors

use thiserror::Error;

use domain_coverage::CoverageError;

use crate::entry::EntryKind;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Claims are rooted on encounters and medications only
    #[error("A claim can only be made with an encounter or medication, not {0}")]
    InvalidRootEntry(EntryKind),

    #[error("Invalid billable entry: {0}")]
    InvalidEntry(String),

    /// No plan record at all, not even no insurance
    #[error("No coverage resolvable for claim at {0}")]
    MissingCoverage(String),

    #[error("Claim has already been adjudicated")]
    AlreadyAdjudicated,

    #[error("Coverage error: {0}")]
    Coverage(#[from] CoverageError),
}
