//! # Batch Module
//!
//! Monthly salary batch and its lifecycle.
//!
//! ```text
//! DRAFT ──finalize──> READY ──export──> EXPORTED ──complete──> COMPLETED
//!   │                   │                 │  ^                    │
//!   │                   │                 │  └───────retry────────┘
//!   └───────────────────┴─────reverse─────┴──────────> REVERSED (terminal)
//! ```
//!
//! Every batch mutation goes through [`BatchStatus::apply`]; pairs not in the
//! table are rejected with [`CoreError::InvalidTransition`].

use crate::error::{CoreError, CoreResult};
use crate::period::PayrollPeriod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a salary batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    Draft,
    Ready,
    Exported,
    Completed,
    Reversed,
}

/// Operations that act on a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Upload,
    Exclude,
    Reevaluate,
    Finalize,
    Export,
    IngestResponse,
    Complete,
    Retry,
    Reverse,
}

impl BatchStatus {
    pub const ALL: [BatchStatus; 5] = [
        BatchStatus::Draft,
        BatchStatus::Ready,
        BatchStatus::Exported,
        BatchStatus::Completed,
        BatchStatus::Reversed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Draft => "DRAFT",
            BatchStatus::Ready => "READY",
            BatchStatus::Exported => "EXPORTED",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Reversed => "REVERSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Reversed)
    }

    /// Target status for `action`, or an invalid transition error.
    pub fn apply(self, action: BatchAction) -> CoreResult<BatchStatus> {
        use BatchAction as A;
        use BatchStatus as S;

        let next = match (self, action) {
            (S::Draft, A::Upload | A::Exclude | A::Reevaluate) => S::Draft,
            (S::Draft, A::Finalize) => S::Ready,
            (S::Ready | S::Exported, A::Export) => S::Exported,
            (S::Exported, A::IngestResponse) => S::Exported,
            (S::Exported, A::Complete) => S::Completed,
            (S::Exported | S::Completed, A::Retry) => S::Exported,
            (S::Draft | S::Ready | S::Exported | S::Completed, A::Reverse) => S::Reversed,
            (from, action) => return Err(CoreError::invalid_transition("batch", from, action)),
        };
        Ok(next)
    }

    /// Whether `action` is allowed from this status
    pub fn allows(self, action: BatchAction) -> bool {
        self.apply(action).is_ok()
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_uppercase();
        BatchStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == key)
            .ok_or_else(|| CoreError::UnknownStatus {
                entity: "batch",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for BatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchAction::Upload => "upload salaries to",
            BatchAction::Exclude => "exclude transactions from",
            BatchAction::Reevaluate => "re-evaluate holds of",
            BatchAction::Finalize => "finalize",
            BatchAction::Export => "export",
            BatchAction::IngestResponse => "ingest bank response for",
            BatchAction::Complete => "complete",
            BatchAction::Retry => "retry",
            BatchAction::Reverse => "reverse",
        };
        write!(f, "{}", s)
    }
}

/// Salary batch: one per company and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryBatch {
    pub id: i64,
    pub company_id: i64,
    pub period: PayrollPeriod,
    pub status: BatchStatus,
    pub reversal_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SalaryBatch {
    /// Check that `action` is allowed, returning the status it leads to
    pub fn guard(&self, action: BatchAction) -> CoreResult<BatchStatus> {
        self.status.apply(action)
    }
}

impl fmt::Display for SalaryBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Batch #{} {} [{}]", self.id, self.period, self.status)
    }
}

/// Immutable record of a batch reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReversal {
    pub id: i64,
    pub batch_id: i64,
    pub reason: String,
    pub reversed_by: String,
    pub reversed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BatchAction as A;
    use BatchStatus as S;

    #[test]
    fn test_happy_path() {
        let s = S::Draft.apply(A::Upload).unwrap();
        let s = s.apply(A::Finalize).unwrap();
        assert_eq!(s, S::Ready);
        let s = s.apply(A::Export).unwrap();
        assert_eq!(s, S::Exported);
        let s = s.apply(A::IngestResponse).unwrap();
        let s = s.apply(A::Complete).unwrap();
        assert_eq!(s, S::Completed);
        assert_eq!(s.apply(A::Retry).unwrap(), S::Exported);
    }

    #[test]
    fn test_draft_only_actions() {
        for action in [A::Upload, A::Exclude, A::Reevaluate, A::Finalize] {
            assert!(S::Draft.allows(action));
            assert!(!S::Ready.allows(action));
            assert!(!S::Exported.allows(action));
            assert!(!S::Completed.allows(action));
        }
    }

    #[test]
    fn test_export_requires_ready_or_exported() {
        assert!(!S::Draft.allows(A::Export));
        assert!(S::Ready.allows(A::Export));
        assert!(S::Exported.allows(A::Export));
        assert!(!S::Completed.allows(A::Export));
    }

    #[test]
    fn test_retry_sources() {
        assert!(!S::Draft.allows(A::Retry));
        assert!(!S::Ready.allows(A::Retry));
        assert!(S::Exported.allows(A::Retry));
        assert!(S::Completed.allows(A::Retry));
    }

    #[test]
    fn test_reversed_is_terminal() {
        for status in [S::Draft, S::Ready, S::Exported, S::Completed] {
            assert_eq!(status.apply(A::Reverse).unwrap(), S::Reversed);
        }
        for action in [
            A::Upload,
            A::Exclude,
            A::Reevaluate,
            A::Finalize,
            A::Export,
            A::IngestResponse,
            A::Complete,
            A::Retry,
            A::Reverse,
        ] {
            let err = S::Reversed.apply(action).unwrap_err();
            assert!(err.is_transition_error());
        }
    }

    #[test]
    fn test_error_message() {
        let err = S::Reversed.apply(A::Export).unwrap_err();
        assert_eq!(err.to_string(), "Cannot export batch in status REVERSED");
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("exported".parse::<BatchStatus>().unwrap(), S::Exported);
        assert!("OPEN".parse::<BatchStatus>().is_err());
    }
}
