//! # Error Module
//!
//! Domain errors for the payroll core, built with thiserror.

use thiserror::Error;

/// Core domain errors.
///
/// Pure business-rule failures, independent of storage or file formats.
#[derive(Debug, Error)]
pub enum CoreError {
    // === State machine errors ===
    #[error("Cannot {action} {entity} in status {from}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: String,
    },

    #[error("Unknown {entity} status: {value}")]
    UnknownStatus { entity: &'static str, value: String },

    // === Period errors ===
    #[error("Invalid payroll period: {0}")]
    InvalidPeriod(String),

    // === Bank errors ===
    #[error("Routing code must be exactly {expected} characters, got {actual} ({value})")]
    InvalidRoutingCode {
        value: String,
        expected: usize,
        actual: usize,
    },

    #[error("Account number is required")]
    MissingAccountNumber,

    // === Amount errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // === Profile errors ===
    #[error("Unknown profile field: {0}")]
    UnknownProfileField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidProfileValue { field: String, value: String },

    #[error("Unknown hold reason: {0}")]
    UnknownHoldReason(String),

    // === Validation errors ===
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Build an invalid transition error from any displayable status and action
    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        action: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            action: action.to_string(),
        }
    }

    /// Whether this error comes from a rejected state transition
    pub fn is_transition_error(&self) -> bool {
        matches!(self, CoreError::InvalidTransition { .. })
    }
}
