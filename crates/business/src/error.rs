//! Business layer errors
//!
//! Every failure is classified by [`BusinessError::kind`] so callers can tell
//! a bad input row from a wrong state or a storage failure.

use crate::config::ConfigError;
use payroll_core::CoreError;
use payroll_persistence::PersistenceError;
use thiserror::Error;

/// How a failure should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input value; the row is skipped and counted
    Validation,
    /// Wrong state for the operation; nothing was changed
    Precondition,
    /// Uniqueness clash with existing data
    Conflict,
    /// Unreadable input, writer or storage failure; the operation was aborted
    Fatal,
}

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    // === Validation errors ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // === Precondition errors ===
    #[error("Batch #{batch_id} was reversed and cannot be changed")]
    BatchReversed { batch_id: i64 },

    #[error("No salary batch found for {period}")]
    BatchNotFound { period: String },

    #[error("No exported salary batch found for {period}")]
    NoExportedBatch { period: String },

    #[error("Request #{id} is not pending (status {status})")]
    RequestNotPending { id: i64, status: String },

    #[error("Cannot finalize: batch has no transactions")]
    EmptyBatch,

    #[error("Cannot finalize: {count} salaries are on HOLD")]
    OutstandingHolds { count: usize },

    #[error("Cannot export: {count} pending salaries have no bank account")]
    MissingBankSnapshot { count: usize },

    #[error("Cannot export: {count} pending salaries have a non-positive amount")]
    NonPositiveAmount { count: usize },

    #[error("Retry is allowed only for exported or completed batches (status {status})")]
    RetryNotAllowed { status: String },

    #[error("A reason is required")]
    MissingReason,

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    // === Conflict errors ===
    #[error("Employee {emp_code} already has a pending bank change request")]
    PendingBankChange { emp_code: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    // === Fatal errors ===
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Bank file writer failed: {0}")]
    BankFile(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // === Wrapped errors ===
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;

impl From<sqlx::Error> for BusinessError {
    fn from(err: sqlx::Error) -> Self {
        BusinessError::Persistence(err.into())
    }
}

impl BusinessError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BusinessError::InvalidInput(_) => ErrorKind::Validation,

            BusinessError::BatchReversed { .. }
            | BusinessError::BatchNotFound { .. }
            | BusinessError::NoExportedBatch { .. }
            | BusinessError::RequestNotPending { .. }
            | BusinessError::EmptyBatch
            | BusinessError::OutstandingHolds { .. }
            | BusinessError::MissingBankSnapshot { .. }
            | BusinessError::NonPositiveAmount { .. }
            | BusinessError::RetryNotAllowed { .. }
            | BusinessError::MissingReason
            | BusinessError::NotFound { .. } => ErrorKind::Precondition,

            BusinessError::PendingBankChange { .. } | BusinessError::Conflict(_) => {
                ErrorKind::Conflict
            }

            BusinessError::Core(e) if e.is_transition_error() => ErrorKind::Precondition,
            BusinessError::Core(_) => ErrorKind::Validation,

            BusinessError::Persistence(e) if e.is_not_found() => ErrorKind::Precondition,
            BusinessError::Persistence(e) if e.is_unique_violation() => ErrorKind::Conflict,

            BusinessError::InvalidFile(_)
            | BusinessError::BankFile(_)
            | BusinessError::Config(_)
            | BusinessError::Persistence(_)
            | BusinessError::Other(_) => ErrorKind::Fatal,
        }
    }

    /// Map a uniqueness clash to [`BusinessError::Conflict`], keeping other errors as they are
    pub(crate) fn conflict_on_unique(err: PersistenceError, message: impl Into<String>) -> Self {
        if err.is_unique_violation() {
            BusinessError::Conflict(message.into())
        } else {
            BusinessError::Persistence(err)
        }
    }

    /// Precondition failures leave everything untouched and may be retried after fixing the cause
    pub fn is_precondition(&self) -> bool {
        self.kind() == ErrorKind::Precondition
    }
}
