//! Simulation errors

use thiserror::Error;

use core_kernel::IdentifierError;
use domain_claims::ClaimError;
use domain_coverage::CoverageError;
use domain_enrollment::EnrollmentError;

/// Errors raised while configuring or running a simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration that cannot be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Coverage error: {0}")]
    Coverage(#[from] CoverageError),

    #[error("Enrollment error: {0}")]
    Enrollment(#[from] EnrollmentError),

    #[error("Claim error: {0}")]
    Claim(#[from] ClaimError),

    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    /// A worker thread panicked
    #[error("Worker failed: {0}")]
    Worker(String),
}

impl SimulationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SimulationError::Configuration(message.into())
    }
}

impl From<config::ConfigError> for SimulationError {
    fn from(err: config::ConfigError) -> Self {
        SimulationError::Configuration(err.to_string())
    }
}
