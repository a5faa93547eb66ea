//! Enrollment domain errors

use thiserror::Error;

use core_kernel::IdentifierError;

/// Errors that can occur while building or querying contract histories
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// A bounded operation was requested on an open-ended period
    #[error("Contract period is unbounded: {0}")]
    UnboundedPeriod(String),

    /// Change probability or pool size outside its legal range
    #[error("Invalid enrollment configuration: {0}")]
    InvalidConfiguration(String),

    /// Contract or package identifiers could not be issued
    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),
}

impl EnrollmentError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        EnrollmentError::InvalidConfiguration(message.into())
    }
}
