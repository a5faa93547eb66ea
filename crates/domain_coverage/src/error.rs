//! Coverage domain errors

use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the coverage domain
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Eligibility name not present in the registry
    #[error("Plan eligibility {0} does not exist")]
    UnknownEligibility(String),

    /// Eligibility name registered twice
    #[error("Plan eligibility name {0} is reserved or already in use")]
    DuplicateEligibility(String),

    /// Attribute rule that cannot be parsed
    #[error("Invalid attribute logic expression '{0}'")]
    InvalidAttributeRule(String),

    /// Plan selection behavior not recognised
    #[error("Not a valid plan selection behavior: {0}")]
    UnknownSelectionBehavior(String),

    /// Plan definition that violates its own constraints
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// No plan record covers the requested time
    #[error("Person has no coverage at {0}")]
    NoCoverageAt(String),

    /// Money arithmetic failure
    #[error("Financial error: {0}")]
    Financial(#[from] MoneyError),
}

impl CoverageError {
    /// Creates an invalid plan error
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        CoverageError::InvalidPlan(message.into())
    }
}
