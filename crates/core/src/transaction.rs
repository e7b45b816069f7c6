//! # Transaction Module
//!
//! Per-employee salary transaction inside a batch, its status table, hold
//! reasons and the bank response literals.

use crate::bank::BankSnapshot;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a salary transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxnStatus {
    Pending,
    Hold,
    Processed,
    Failed,
    Cancelled,
}

/// Operations that move a transaction between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnAction {
    /// Re-upload in a draft batch, evaluated payable
    UploadPayable,
    /// Re-upload in a draft batch, evaluated held
    UploadHeld,
    Release,
    Rehold,
    Exclude,
    BankSuccess,
    BankFailure,
    Cancel,
}

impl TxnStatus {
    pub const ALL: [TxnStatus; 5] = [
        TxnStatus::Pending,
        TxnStatus::Hold,
        TxnStatus::Processed,
        TxnStatus::Failed,
        TxnStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TxnStatus::Pending => "PENDING",
            TxnStatus::Hold => "HOLD",
            TxnStatus::Processed => "PROCESSED",
            TxnStatus::Failed => "FAILED",
            TxnStatus::Cancelled => "CANCELLED",
        }
    }

    /// Live rows count toward the one-per-(batch, employee) limit
    pub fn is_live(&self) -> bool {
        !matches!(self, TxnStatus::Failed | TxnStatus::Cancelled)
    }

    pub fn apply(self, action: TxnAction) -> CoreResult<TxnStatus> {
        use TxnAction as A;
        use TxnStatus as S;

        let next = match (self, action) {
            (S::Pending | S::Hold | S::Cancelled, A::UploadPayable) => S::Pending,
            (S::Pending | S::Hold | S::Cancelled, A::UploadHeld) => S::Hold,
            (S::Hold, A::Release) => S::Pending,
            (S::Hold, A::Rehold) => S::Hold,
            (S::Pending | S::Hold, A::Exclude) => S::Cancelled,
            (S::Pending, A::BankSuccess) => S::Processed,
            (S::Pending, A::BankFailure) => S::Failed,
            (S::Pending | S::Hold | S::Failed, A::Cancel) => S::Cancelled,
            (from, action) => {
                return Err(CoreError::invalid_transition("transaction", from, action))
            }
        };
        Ok(next)
    }
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TxnStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_uppercase();
        TxnStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == key)
            .ok_or_else(|| CoreError::UnknownStatus {
                entity: "transaction",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for TxnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxnAction::UploadPayable | TxnAction::UploadHeld => "re-upload",
            TxnAction::Release => "release",
            TxnAction::Rehold => "re-hold",
            TxnAction::Exclude => "exclude",
            TxnAction::BankSuccess => "mark processed",
            TxnAction::BankFailure => "mark failed",
            TxnAction::Cancel => "cancel",
        };
        write!(f, "{}", s)
    }
}

/// Why a salary transaction is withheld.
///
/// Stored by [`HoldReason::code`]; `Display` gives the operator-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldReason {
    EmployeeExited,
    JoiningDateInFuture,
    JoinedAfterPayrollMonth,
    PendingProfileChange,
    PendingBankChange,
    NoActiveBankAccount,
}

impl HoldReason {
    pub const ALL: [HoldReason; 6] = [
        HoldReason::EmployeeExited,
        HoldReason::JoiningDateInFuture,
        HoldReason::JoinedAfterPayrollMonth,
        HoldReason::PendingProfileChange,
        HoldReason::PendingBankChange,
        HoldReason::NoActiveBankAccount,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            HoldReason::EmployeeExited => "employee_exited",
            HoldReason::JoiningDateInFuture => "joining_date_in_future",
            HoldReason::JoinedAfterPayrollMonth => "joined_after_payroll_month",
            HoldReason::PendingProfileChange => "pending_profile_change",
            HoldReason::PendingBankChange => "pending_bank_change",
            HoldReason::NoActiveBankAccount => "no_active_bank_account",
        }
    }

    pub fn from_code(code: &str) -> CoreResult<Self> {
        HoldReason::ALL
            .into_iter()
            .find(|r| r.code() == code.trim())
            .ok_or_else(|| CoreError::UnknownHoldReason(code.to_string()))
    }

    /// Reasons cleared by a bank account activation
    pub fn is_bank_class(&self) -> bool {
        matches!(
            self,
            HoldReason::NoActiveBankAccount | HoldReason::PendingBankChange
        )
    }
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HoldReason::EmployeeExited => "Employee has exited",
            HoldReason::JoiningDateInFuture => "Joining date in future",
            HoldReason::JoinedAfterPayrollMonth => "Joined after payroll month",
            HoldReason::PendingProfileChange => "Pending profile change",
            HoldReason::PendingBankChange => "Pending bank change",
            HoldReason::NoActiveBankAccount => "No active bank account",
        };
        write!(f, "{}", s)
    }
}

/// Status literal of a bank response row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl ResponseStatus {
    /// Trimmed, case-insensitive. Unknown literals yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "SUCCESS" => Some(ResponseStatus::Success),
            "FAILED" => Some(ResponseStatus::Failed),
            _ => None,
        }
    }

    pub fn action(&self) -> TxnAction {
        match self {
            ResponseStatus::Success => TxnAction::BankSuccess,
            ResponseStatus::Failed => TxnAction::BankFailure,
        }
    }
}

/// A salary transaction row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryTransaction {
    pub id: i64,
    pub batch_id: i64,
    pub employee_id: i64,
    pub amount: Decimal,
    /// Bank details captured at upload, not a live reference
    pub snapshot: Option<BankSnapshot>,
    pub status: TxnStatus,
    pub hold_reason: Option<HoldReason>,
    pub failure_reason: Option<String>,
    pub utr: Option<String>,
    pub bank_response_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SalaryTransaction {
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// Ready to appear in a bank file
    pub fn is_exportable(&self) -> bool {
        self.status == TxnStatus::Pending && self.snapshot.is_some() && self.amount > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use TxnAction as A;
    use TxnStatus as S;

    #[test]
    fn test_upload_transitions() {
        for from in [S::Pending, S::Hold, S::Cancelled] {
            assert_eq!(from.apply(A::UploadPayable).unwrap(), S::Pending);
            assert_eq!(from.apply(A::UploadHeld).unwrap(), S::Hold);
        }
        assert!(S::Processed.apply(A::UploadPayable).is_err());
        assert!(S::Failed.apply(A::UploadHeld).is_err());
    }

    #[test]
    fn test_bank_outcomes_only_from_pending() {
        assert_eq!(S::Pending.apply(A::BankSuccess).unwrap(), S::Processed);
        assert_eq!(S::Pending.apply(A::BankFailure).unwrap(), S::Failed);
        for from in [S::Hold, S::Processed, S::Failed, S::Cancelled] {
            assert!(from.apply(A::BankSuccess).is_err());
            assert!(from.apply(A::BankFailure).is_err());
        }
    }

    #[test]
    fn test_cancel_and_exclude() {
        assert_eq!(S::Failed.apply(A::Cancel).unwrap(), S::Cancelled);
        assert!(S::Processed.apply(A::Cancel).is_err());
        assert!(S::Cancelled.apply(A::Cancel).is_err());
        assert_eq!(S::Hold.apply(A::Exclude).unwrap(), S::Cancelled);
        assert!(S::Failed.apply(A::Exclude).is_err());
    }

    #[test]
    fn test_release() {
        assert_eq!(S::Hold.apply(A::Release).unwrap(), S::Pending);
        assert_eq!(S::Hold.apply(A::Rehold).unwrap(), S::Hold);
        assert!(S::Pending.apply(A::Release).is_err());
    }

    #[test]
    fn test_live_statuses() {
        assert!(S::Pending.is_live());
        assert!(S::Hold.is_live());
        assert!(S::Processed.is_live());
        assert!(!S::Failed.is_live());
        assert!(!S::Cancelled.is_live());
    }

    #[test]
    fn test_hold_reason_codes() {
        for reason in HoldReason::ALL {
            assert_eq!(HoldReason::from_code(reason.code()).unwrap(), reason);
        }
        assert!(HoldReason::from_code("on_vacation").is_err());
        assert_eq!(HoldReason::NoActiveBankAccount.to_string(), "No active bank account");
        assert!(HoldReason::PendingBankChange.is_bank_class());
        assert!(!HoldReason::PendingProfileChange.is_bank_class());
    }

    #[test]
    fn test_response_status_parse() {
        assert_eq!(ResponseStatus::parse(" success "), Some(ResponseStatus::Success));
        assert_eq!(ResponseStatus::parse("Failed"), Some(ResponseStatus::Failed));
        assert_eq!(ResponseStatus::parse("REJECTED"), None);
    }

    #[test]
    fn test_exportable() {
        let mut txn = SalaryTransaction {
            id: 1,
            batch_id: 1,
            employee_id: 1,
            amount: dec!(5000),
            snapshot: None,
            status: S::Pending,
            hold_reason: None,
            failure_reason: None,
            utr: None,
            bank_response_at: None,
            created_at: Utc::now(),
        };
        assert!(!txn.is_exportable());
        txn.snapshot = Some(BankSnapshot {
            account_number: "123".to_string(),
            routing_code: "HDFC0001234".to_string(),
        });
        assert!(txn.is_exportable());
        txn.amount = dec!(0);
        assert!(!txn.is_exportable());
    }
}
