//! # Hold Module
//!
//! Decides whether an employee's salary for a period is payable or withheld.
//!
//! The evaluator is a pure function of the employee facts, the batch period and
//! today's date. Rules are checked in order and the first match wins:
//!
//! 1. exit date recorded
//! 2. joining date after today
//! 3. joining date after the first day of the batch month
//! 4. pending profile change request
//! 5. pending bank change request
//! 6. no active bank account

use crate::period::PayrollPeriod;
use crate::transaction::HoldReason;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything the evaluator needs to know about one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldFacts {
    pub joining_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub has_pending_profile_change: bool,
    pub has_pending_bank_change: bool,
    pub has_active_bank_account: bool,
}

/// Evaluation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldDecision {
    Payable,
    Hold(HoldReason),
}

impl HoldDecision {
    pub fn is_held(&self) -> bool {
        matches!(self, HoldDecision::Hold(_))
    }

    pub fn reason(&self) -> Option<HoldReason> {
        match self {
            HoldDecision::Payable => None,
            HoldDecision::Hold(reason) => Some(*reason),
        }
    }
}

/// Run the hold rules. See the module docs for precedence.
pub fn evaluate(facts: &HoldFacts, period: PayrollPeriod, today: NaiveDate) -> HoldDecision {
    if facts.exit_date.is_some() {
        return HoldDecision::Hold(HoldReason::EmployeeExited);
    }
    if facts.joining_date > today {
        return HoldDecision::Hold(HoldReason::JoiningDateInFuture);
    }
    if facts.joining_date > period.first_day() {
        return HoldDecision::Hold(HoldReason::JoinedAfterPayrollMonth);
    }
    if facts.has_pending_profile_change {
        return HoldDecision::Hold(HoldReason::PendingProfileChange);
    }
    if facts.has_pending_bank_change {
        return HoldDecision::Hold(HoldReason::PendingBankChange);
    }
    if !facts.has_active_bank_account {
        return HoldDecision::Hold(HoldReason::NoActiveBankAccount);
    }
    HoldDecision::Payable
}

/// Which held transactions a re-evaluation may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldScope {
    /// Bank-class reasons, used after an account activation or bank request rejection
    Bank,
    /// Pending profile change, used after a profile request is reviewed
    Profile,
    /// Every hold reason
    All,
}

impl HoldScope {
    pub fn contains(&self, reason: HoldReason) -> bool {
        match self {
            HoldScope::Bank => reason.is_bank_class(),
            HoldScope::Profile => reason == HoldReason::PendingProfileChange,
            HoldScope::All => true,
        }
    }
}
