//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables, and their conversion into
//! core domain types. Schema is defined in migrations/20260301000000_init.sql

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, NaiveDate, Utc};
use payroll_core::{
    BankAccount, BankChangeRequest, BankSnapshot, BatchReversal, BatchStatus, Company, Employee,
    FieldChange, HoldReason, PayrollPeriod, ProfileChangeRequest, RequestStatus, SalaryBatch,
    SalaryTransaction, TxnStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Row type for table `companies`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CompanyRow {
    pub id: i64,
    pub organisation: Option<String>,
    pub name: String,
    pub site_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `employees`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EmployeeRow {
    pub id: i64,
    pub company_id: i64,
    pub emp_code: String,
    pub name: String,
    pub father_name: Option<String>,
    pub uan_number: Option<String>,
    pub esic_number: Option<String>,
    pub document_number: Option<String>,
    pub default_salary: Option<String>, // Decimal stored as TEXT
    pub joining_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `bank_accounts`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BankAccountRow {
    pub id: i64,
    pub employee_id: i64,
    pub bank_name: String,
    pub account_number: String,
    pub routing_code: String,
    pub effective_year: i64,
    pub effective_month: i64,
    pub is_active: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `bank_change_requests`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BankChangeRequestRow {
    pub id: i64,
    pub employee_id: i64,
    pub new_bank_name: String,
    pub new_account_number: String,
    pub new_routing_code: String,
    pub effective_year: i64,
    pub effective_month: i64,
    pub status: String,
    pub submitted_by: String,
    pub approved_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

/// Row type for table `profile_change_requests`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProfileChangeRequestRow {
    pub id: i64,
    pub employee_id: i64,
    pub changes: String, // JSON list of FieldChange
    pub status: String,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

/// Row type for table `salary_batches`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SalaryBatchRow {
    pub id: i64,
    pub company_id: i64,
    pub month: i64,
    pub year: i64,
    pub status: String,
    pub reversal_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `salary_transactions`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SalaryTransactionRow {
    pub id: i64,
    pub batch_id: i64,
    pub employee_id: i64,
    pub salary_amount: String, // Decimal stored as TEXT
    pub account_number: Option<String>,
    pub routing_code: Option<String>,
    pub status: String,
    pub hold_reason: Option<String>,
    pub failure_reason: Option<String>,
    pub utr: Option<String>,
    pub bank_response_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Salary transaction joined with its employee and batch period
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TransactionDetailRow {
    #[sqlx(flatten)]
    pub txn: SalaryTransactionRow,
    pub emp_code: String,
    pub employee_name: String,
    pub company_id: i64,
    pub month: i64,
    pub year: i64,
}

/// Row type for table `salary_batch_reversals`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BatchReversalRow {
    pub id: i64,
    pub batch_id: i64,
    pub reason: String,
    pub reversed_by: String,
    pub reversed_at: DateTime<Utc>,
}

// === Conversion helpers ===

pub(crate) fn parse_decimal(value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value).map_err(|e| PersistenceError::InvalidDecimal(format!("{}: {}", value, e)))
}

fn period(year: i64, month: i64) -> PersistenceResult<PayrollPeriod> {
    let year = i32::try_from(year)
        .map_err(|_| PersistenceError::Other(format!("year out of range: {}", year)))?;
    let month = u32::try_from(month)
        .map_err(|_| PersistenceError::Other(format!("month out of range: {}", month)))?;
    Ok(PayrollPeriod::new(year, month)?)
}

// === Conversion implementations ===

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Self {
            id: row.id,
            organisation: row.organisation,
            name: row.name,
            site_code: row.site_code,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = PersistenceError;

    fn try_from(row: EmployeeRow) -> PersistenceResult<Self> {
        Ok(Self {
            id: row.id,
            company_id: row.company_id,
            emp_code: row.emp_code,
            name: row.name,
            father_name: row.father_name,
            uan_number: row.uan_number,
            esic_number: row.esic_number,
            document_number: row.document_number,
            default_salary: row.default_salary.as_deref().map(parse_decimal).transpose()?,
            joining_date: row.joining_date,
            exit_date: row.exit_date,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<BankAccountRow> for BankAccount {
    type Error = PersistenceError;

    fn try_from(row: BankAccountRow) -> PersistenceResult<Self> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            bank_name: row.bank_name,
            account_number: row.account_number,
            routing_code: row.routing_code,
            effective_from: period(row.effective_year, row.effective_month)?,
            is_active: row.is_active,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
        })
    }
}

impl TryFrom<BankChangeRequestRow> for BankChangeRequest {
    type Error = PersistenceError;

    fn try_from(row: BankChangeRequestRow) -> PersistenceResult<Self> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            new_bank_name: row.new_bank_name,
            new_account_number: row.new_account_number,
            new_routing_code: row.new_routing_code,
            effective_from: period(row.effective_year, row.effective_month)?,
            status: RequestStatus::from_str(&row.status)?,
            submitted_by: row.submitted_by,
            approved_by: row.approved_by,
            submitted_at: row.submitted_at,
            approved_at: row.approved_at,
            rejection_reason: row.rejection_reason,
        })
    }
}

impl TryFrom<ProfileChangeRequestRow> for ProfileChangeRequest {
    type Error = PersistenceError;

    fn try_from(row: ProfileChangeRequestRow) -> PersistenceResult<Self> {
        let changes: Vec<FieldChange> = serde_json::from_str(&row.changes)?;
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            changes,
            status: RequestStatus::from_str(&row.status)?,
            requested_by: row.requested_by,
            requested_at: row.requested_at,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            rejection_reason: row.rejection_reason,
        })
    }
}

impl TryFrom<SalaryBatchRow> for SalaryBatch {
    type Error = PersistenceError;

    fn try_from(row: SalaryBatchRow) -> PersistenceResult<Self> {
        Ok(Self {
            id: row.id,
            company_id: row.company_id,
            period: period(row.year, row.month)?,
            status: BatchStatus::from_str(&row.status)?,
            reversal_reason: row.reversal_reason,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<SalaryTransactionRow> for SalaryTransaction {
    type Error = PersistenceError;

    fn try_from(row: SalaryTransactionRow) -> PersistenceResult<Self> {
        let snapshot = match (row.account_number, row.routing_code) {
            (Some(account_number), Some(routing_code)) => Some(BankSnapshot {
                account_number,
                routing_code,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            batch_id: row.batch_id,
            employee_id: row.employee_id,
            amount: parse_decimal(&row.salary_amount)?,
            snapshot,
            status: TxnStatus::from_str(&row.status)?,
            hold_reason: row.hold_reason.as_deref().map(HoldReason::from_code).transpose()?,
            failure_reason: row.failure_reason,
            utr: row.utr,
            bank_response_at: row.bank_response_at,
            created_at: row.created_at,
        })
    }
}

impl From<BatchReversalRow> for BatchReversal {
    fn from(row: BatchReversalRow) -> Self {
        Self {
            id: row.id,
            batch_id: row.batch_id,
            reason: row.reason,
            reversed_by: row.reversed_by,
            reversed_at: row.reversed_at,
        }
    }
}

impl TransactionDetailRow {
    pub fn period(&self) -> PersistenceResult<PayrollPeriod> {
        period(self.year, self.month)
    }

    pub fn amount(&self) -> PersistenceResult<Decimal> {
        parse_decimal(&self.txn.salary_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn txn_row() -> SalaryTransactionRow {
        SalaryTransactionRow {
            id: 1,
            batch_id: 2,
            employee_id: 3,
            salary_amount: "5000.00".to_string(),
            account_number: Some("123456".to_string()),
            routing_code: Some("HDFC0001234".to_string()),
            status: "HOLD".to_string(),
            hold_reason: Some("pending_bank_change".to_string()),
            failure_reason: None,
            utr: None,
            bank_response_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_transaction_conversion() {
        let txn = SalaryTransaction::try_from(txn_row()).unwrap();
        assert_eq!(txn.amount, dec!(5000.00));
        assert_eq!(txn.status, TxnStatus::Hold);
        assert_eq!(txn.hold_reason, Some(HoldReason::PendingBankChange));
        assert!(txn.snapshot.is_some());
    }

    #[test]
    fn test_partial_snapshot_is_none() {
        let row = SalaryTransactionRow {
            routing_code: None,
            ..txn_row()
        };
        assert!(SalaryTransaction::try_from(row).unwrap().snapshot.is_none());
    }

    #[test]
    fn test_bad_values_rejected() {
        let row = SalaryTransactionRow {
            status: "SETTLED".to_string(),
            ..txn_row()
        };
        assert!(matches!(
            SalaryTransaction::try_from(row),
            Err(PersistenceError::InvalidData(_))
        ));

        let row = SalaryTransactionRow {
            salary_amount: "abc".to_string(),
            ..txn_row()
        };
        assert!(matches!(
            SalaryTransaction::try_from(row),
            Err(PersistenceError::InvalidDecimal(_))
        ));
    }

    #[test]
    fn test_batch_period() {
        let row = SalaryBatchRow {
            id: 1,
            company_id: 1,
            month: 13,
            year: 2026,
            status: "DRAFT".to_string(),
            reversal_reason: None,
            created_at: Utc::now(),
        };
        assert!(SalaryBatch::try_from(row).is_err());
    }
}
