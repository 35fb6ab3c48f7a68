//! The one error type every intake operation returns.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failures an operator sees at the till.
///
/// Whatever the variant, the operation that returned it changed nothing, so
/// the operator can correct the input and try again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing required input (e.g. empty document number).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is not allowed at this stage of the lifecycle
    /// (e.g. editing a confirmed delivery).
    #[error("not allowed at this stage: {0}")]
    State(String),

    /// Confirmation was attempted on a delivery with no stock items.
    #[error("there is nothing here to confirm")]
    EmptyDelivery,

    /// Text that should have been a serial number.
    #[error("not a valid id: {0}")]
    InvalidId(String),

    /// A requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or stale-version conflict detected at persistence time.
    ///
    /// The caller must roll back the attempted write and re-prompt.
    #[error("conflicting change: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
