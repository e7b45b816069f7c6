//! # Bank Module
//!
//! Bank account details, approved accounts and bank change requests.

use crate::error::{CoreError, CoreResult};
use crate::period::PayrollPeriod;
use crate::request::RequestStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a bank routing code (IFSC)
pub const ROUTING_CODE_LENGTH: usize = 11;

/// Bank branch routing code, normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingCode(String);

impl RoutingCode {
    /// Parse with the standard length
    pub fn parse(raw: &str) -> CoreResult<Self> {
        Self::parse_with_length(raw, ROUTING_CODE_LENGTH)
    }

    /// Parse a routing code that must be exactly `expected` characters after trimming
    pub fn parse_with_length(raw: &str, expected: usize) -> CoreResult<Self> {
        let code = raw.trim().to_uppercase();
        let actual = code.chars().count();
        if actual != expected {
            return Err(CoreError::InvalidRoutingCode {
                value: code,
                expected,
                actual,
            });
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account number + routing code copied onto a salary transaction at upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankSnapshot {
    pub account_number: String,
    pub routing_code: String,
}

/// Validated details of a bank account to activate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountDetails {
    pub bank_name: String,
    pub account_number: String,
    pub routing_code: RoutingCode,
    pub effective_from: PayrollPeriod,
}

impl BankAccountDetails {
    pub fn new(
        bank_name: &str,
        account_number: &str,
        routing_code: RoutingCode,
        effective_from: PayrollPeriod,
    ) -> CoreResult<Self> {
        let account_number = account_number.trim();
        if account_number.is_empty() {
            return Err(CoreError::MissingAccountNumber);
        }
        Ok(Self {
            bank_name: bank_name.trim().to_string(),
            account_number: account_number.to_string(),
            routing_code,
            effective_from,
        })
    }
}

/// An employee's bank account. At most one is active per employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: i64,
    pub employee_id: i64,
    pub bank_name: String,
    pub account_number: String,
    pub routing_code: String,
    pub effective_from: PayrollPeriod,
    pub is_active: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl BankAccount {
    pub fn snapshot(&self) -> BankSnapshot {
        BankSnapshot {
            account_number: self.account_number.clone(),
            routing_code: self.routing_code.clone(),
        }
    }

    /// Account number with all but the last four digits masked
    pub fn masked_number(&self) -> String {
        mask_account_number(&self.account_number)
    }
}

pub fn mask_account_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() <= 4 {
        return number.to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// Request to replace an employee's active bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankChangeRequest {
    pub id: i64,
    pub employee_id: i64,
    pub new_bank_name: String,
    pub new_account_number: String,
    pub new_routing_code: String,
    pub effective_from: PayrollPeriod,
    pub status: RequestStatus,
    pub submitted_by: String,
    pub approved_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl BankChangeRequest {
    /// Details the request would activate, re-checked against the routing code length
    pub fn details(&self, routing_code_length: usize) -> CoreResult<BankAccountDetails> {
        BankAccountDetails::new(
            &self.new_bank_name,
            &self.new_account_number,
            RoutingCode::parse_with_length(&self.new_routing_code, routing_code_length)?,
            self.effective_from,
        )
    }
}
