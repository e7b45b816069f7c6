//! Repository implementations for SQLite
//!
//! Every repository function takes `&mut SqliteConnection` so services can run
//! several of them inside one `sqlx::Transaction` (`&mut *tx`).

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, NaiveDate, Utc};
use payroll_core::{
    BankAccount, BankAccountDetails, BankChangeRequest, BankSnapshot, BatchReversal, BatchStatus,
    Company, Employee, FieldChange, HoldReason, PayrollPeriod, ProfileChangeRequest,
    RequestStatus, SalaryBatch, SalaryTransaction, TxnStatus,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;

fn convert_all<R, T>(rows: Vec<R>) -> PersistenceResult<Vec<T>>
where
    T: TryFrom<R, Error = PersistenceError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// Company Repository
// ============================================================================

/// Repository for the companies table
pub struct CompanyRepo;

impl CompanyRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        organisation: Option<&str>,
        name: &str,
        site_code: &str,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO companies (organisation, name, site_code, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(organisation)
        .bind(name)
        .bind(site_code)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("Company", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> PersistenceResult<Company> {
        sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .map(Company::from)
            .ok_or_else(|| PersistenceError::not_found("Company", id))
    }

    pub async fn find_by_site_code(
        conn: &mut SqliteConnection,
        site_code: &str,
    ) -> PersistenceResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT * FROM companies WHERE site_code = ? COLLATE NOCASE",
        )
        .bind(site_code.trim())
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Company::from))
    }

    pub async fn list(conn: &mut SqliteConnection) -> PersistenceResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(Company::from).collect())
    }
}

// ============================================================================
// Employee Repository
// ============================================================================

/// Values for a new employee row
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub company_id: i64,
    pub emp_code: String,
    pub name: String,
    pub father_name: Option<String>,
    pub uan_number: Option<String>,
    pub esic_number: Option<String>,
    pub document_number: Option<String>,
    pub default_salary: Option<Decimal>,
    pub joining_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
}

/// Repository for the employees table
pub struct EmployeeRepo;

impl EmployeeRepo {
    pub async fn insert(conn: &mut SqliteConnection, emp: &NewEmployee) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees (company_id, emp_code, name, father_name, uan_number, esic_number,
                                   document_number, default_salary, joining_date, exit_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(emp.company_id)
        .bind(&emp.emp_code)
        .bind(&emp.name)
        .bind(&emp.father_name)
        .bind(&emp.uan_number)
        .bind(&emp.esic_number)
        .bind(&emp.document_number)
        .bind(emp.default_salary.map(|d| d.to_string()))
        .bind(emp.joining_date)
        .bind(emp.exit_date)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("Employee", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> PersistenceResult<Employee> {
        sqlx::query_as::<_, EmployeeRow>("SELECT * FROM employees WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Employee", id))?
            .try_into()
    }

    /// Look up by employee code within a company
    pub async fn find_by_code(
        conn: &mut SqliteConnection,
        company_id: i64,
        emp_code: &str,
    ) -> PersistenceResult<Option<Employee>> {
        sqlx::query_as::<_, EmployeeRow>(
            "SELECT * FROM employees WHERE company_id = ? AND emp_code = ?",
        )
        .bind(company_id)
        .bind(emp_code.trim())
        .fetch_optional(&mut *conn)
        .await?
        .map(Employee::try_from)
        .transpose()
    }

    pub async fn list_by_company(
        conn: &mut SqliteConnection,
        company_id: i64,
    ) -> PersistenceResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            "SELECT * FROM employees WHERE company_id = ? ORDER BY emp_code",
        )
        .bind(company_id)
        .fetch_all(&mut *conn)
        .await?;
        convert_all(rows)
    }

    /// Employees with no active bank account
    pub async fn list_without_active_account(
        conn: &mut SqliteConnection,
        company_id: i64,
    ) -> PersistenceResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT e.* FROM employees e
            WHERE e.company_id = ?
              AND NOT EXISTS (
                  SELECT 1 FROM bank_accounts a WHERE a.employee_id = e.id AND a.is_active = 1
              )
            ORDER BY e.emp_code
            "#,
        )
        .bind(company_id)
        .fetch_all(&mut *conn)
        .await?;
        convert_all(rows)
    }

    /// Write back every profile field
    pub async fn update_profile(
        conn: &mut SqliteConnection,
        emp: &Employee,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET name = ?, father_name = ?, uan_number = ?, esic_number = ?, document_number = ?,
                default_salary = ?, exit_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&emp.name)
        .bind(&emp.father_name)
        .bind(&emp.uan_number)
        .bind(&emp.esic_number)
        .bind(&emp.document_number)
        .bind(emp.default_salary.map(|d| d.to_string()))
        .bind(emp.exit_date)
        .bind(emp.id)
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("Employee", e))?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Employee", emp.id));
        }
        Ok(())
    }
}

// ============================================================================
// Bank Account Repository
// ============================================================================

/// Repository for the bank_accounts table
pub struct BankAccountRepo;

impl BankAccountRepo {
    pub async fn get_active(
        conn: &mut SqliteConnection,
        employee_id: i64,
    ) -> PersistenceResult<Option<BankAccount>> {
        sqlx::query_as::<_, BankAccountRow>(
            "SELECT * FROM bank_accounts WHERE employee_id = ? AND is_active = 1",
        )
        .bind(employee_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(BankAccount::try_from)
        .transpose()
    }

    /// Deactivate every active account of the employee. Returns rows touched.
    pub async fn deactivate_all(
        conn: &mut SqliteConnection,
        employee_id: i64,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            "UPDATE bank_accounts SET is_active = 0 WHERE employee_id = ? AND is_active = 1",
        )
        .bind(employee_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Insert a new active account
    pub async fn insert_active(
        conn: &mut SqliteConnection,
        employee_id: i64,
        details: &BankAccountDetails,
        approved_by: Option<&str>,
        approved_at: Option<DateTime<Utc>>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO bank_accounts (employee_id, bank_name, account_number, routing_code,
                                       effective_year, effective_month, is_active,
                                       approved_by, approved_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(&details.bank_name)
        .bind(&details.account_number)
        .bind(details.routing_code.as_str())
        .bind(details.effective_from.year())
        .bind(details.effective_from.month())
        .bind(approved_by)
        .bind(approved_at)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("BankAccount", e))?;
        Ok(result.last_insert_rowid())
    }

    /// All accounts of an employee, newest first
    pub async fn list_for_employee(
        conn: &mut SqliteConnection,
        employee_id: i64,
    ) -> PersistenceResult<Vec<BankAccount>> {
        let rows = sqlx::query_as::<_, BankAccountRow>(
            "SELECT * FROM bank_accounts WHERE employee_id = ? ORDER BY id DESC",
        )
        .bind(employee_id)
        .fetch_all(&mut *conn)
        .await?;
        convert_all(rows)
    }

    pub async fn count_active(
        conn: &mut SqliteConnection,
        employee_id: i64,
    ) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bank_accounts WHERE employee_id = ? AND is_active = 1",
        )
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Bank Change Request Repository
// ============================================================================

/// Bank change request joined with the employee it belongs to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankChangeDetailRow {
    #[sqlx(flatten)]
    pub request: BankChangeRequestRow,
    pub emp_code: String,
    pub employee_name: String,
}

/// Repository for the bank_change_requests table
pub struct BankChangeRepo;

impl BankChangeRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        employee_id: i64,
        details: &BankAccountDetails,
        submitted_by: &str,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO bank_change_requests (employee_id, new_bank_name, new_account_number,
                                              new_routing_code, effective_year, effective_month,
                                              status, submitted_by, submitted_at)
            VALUES (?, ?, ?, ?, ?, ?, 'PENDING', ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(&details.bank_name)
        .bind(&details.account_number)
        .bind(details.routing_code.as_str())
        .bind(details.effective_from.year())
        .bind(details.effective_from.month())
        .bind(submitted_by)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("BankChangeRequest", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> PersistenceResult<BankChangeRequest> {
        sqlx::query_as::<_, BankChangeRequestRow>("SELECT * FROM bank_change_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PersistenceError::not_found("BankChangeRequest", id))?
            .try_into()
    }

    pub async fn has_pending(
        conn: &mut SqliteConnection,
        employee_id: i64,
    ) -> PersistenceResult<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bank_change_requests WHERE employee_id = ? AND status = 'PENDING'",
        )
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.0 > 0)
    }

    /// Record a review decision. Only touches PENDING requests; returns rows updated.
    pub async fn record_review(
        conn: &mut SqliteConnection,
        id: i64,
        status: RequestStatus,
        reviewer: &str,
        rejection_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE bank_change_requests
            SET status = ?, approved_by = ?, approved_at = ?, rejection_reason = ?
            WHERE id = ? AND status = 'PENDING'
            "#,
        )
        .bind(status.as_str())
        .bind(reviewer)
        .bind(at)
        .bind(rejection_reason)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Requests of a company with employee code and name, newest first
    pub async fn list_by_company(
        conn: &mut SqliteConnection,
        company_id: i64,
        status: Option<RequestStatus>,
    ) -> PersistenceResult<Vec<(BankChangeRequest, String, String)>> {
        let rows = sqlx::query_as::<_, BankChangeDetailRow>(
            r#"
            SELECT r.*, e.emp_code, e.name AS employee_name
            FROM bank_change_requests r
            JOIN employees e ON e.id = r.employee_id
            WHERE e.company_id = ? AND (? IS NULL OR r.status = ?)
            ORDER BY r.submitted_at DESC, r.id DESC
            "#,
        )
        .bind(company_id)
        .bind(status.map(|s| s.as_str()))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok((
                    BankChangeRequest::try_from(row.request)?,
                    row.emp_code,
                    row.employee_name,
                ))
            })
            .collect()
    }
}

// ============================================================================
// Profile Change Request Repository
// ============================================================================

/// Repository for the profile_change_requests table
pub struct ProfileChangeRepo;

impl ProfileChangeRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        employee_id: i64,
        changes: &[FieldChange],
        requested_by: &str,
    ) -> PersistenceResult<i64> {
        let json = serde_json::to_string(changes)?;
        let result = sqlx::query(
            r#"
            INSERT INTO profile_change_requests (employee_id, changes, status, requested_by, requested_at)
            VALUES (?, ?, 'PENDING', ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(json)
        .bind(requested_by)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> PersistenceResult<ProfileChangeRequest> {
        sqlx::query_as::<_, ProfileChangeRequestRow>(
            "SELECT * FROM profile_change_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| PersistenceError::not_found("ProfileChangeRequest", id))?
        .try_into()
    }

    pub async fn has_pending(
        conn: &mut SqliteConnection,
        employee_id: i64,
    ) -> PersistenceResult<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM profile_change_requests WHERE employee_id = ? AND status = 'PENDING'",
        )
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.0 > 0)
    }

    pub async fn list_pending(
        conn: &mut SqliteConnection,
        company_id: i64,
    ) -> PersistenceResult<Vec<ProfileChangeRequest>> {
        let rows = sqlx::query_as::<_, ProfileChangeRequestRow>(
            r#"
            SELECT r.* FROM profile_change_requests r
            JOIN employees e ON e.id = r.employee_id
            WHERE e.company_id = ? AND r.status = 'PENDING'
            ORDER BY r.id
            "#,
        )
        .bind(company_id)
        .fetch_all(&mut *conn)
        .await?;
        convert_all(rows)
    }

    /// Record a review decision on a PENDING request; returns rows updated
    pub async fn record_review(
        conn: &mut SqliteConnection,
        id: i64,
        status: RequestStatus,
        reviewer: &str,
        rejection_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE profile_change_requests
            SET status = ?, reviewed_by = ?, reviewed_at = ?, rejection_reason = ?
            WHERE id = ? AND status = 'PENDING'
            "#,
        )
        .bind(status.as_str())
        .bind(reviewer)
        .bind(at)
        .bind(rejection_reason)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Salary Batch Repository
// ============================================================================

/// Repository for the salary_batches table
pub struct BatchRepo;

impl BatchRepo {
    pub async fn find(
        conn: &mut SqliteConnection,
        company_id: i64,
        period: PayrollPeriod,
    ) -> PersistenceResult<Option<SalaryBatch>> {
        sqlx::query_as::<_, SalaryBatchRow>(
            "SELECT * FROM salary_batches WHERE company_id = ? AND month = ? AND year = ?",
        )
        .bind(company_id)
        .bind(period.month())
        .bind(period.year())
        .fetch_optional(&mut *conn)
        .await?
        .map(SalaryBatch::try_from)
        .transpose()
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> PersistenceResult<SalaryBatch> {
        sqlx::query_as::<_, SalaryBatchRow>("SELECT * FROM salary_batches WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PersistenceError::not_found("SalaryBatch", id))?
            .try_into()
    }

    /// Insert a new DRAFT batch
    pub async fn insert(
        conn: &mut SqliteConnection,
        company_id: i64,
        period: PayrollPeriod,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO salary_batches (company_id, month, year, status, created_at) VALUES (?, ?, ?, 'DRAFT', ?)",
        )
        .bind(company_id)
        .bind(period.month())
        .bind(period.year())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("SalaryBatch", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: i64,
        status: BatchStatus,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE salary_batches SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("SalaryBatch", id));
        }
        Ok(())
    }

    pub async fn mark_reversed(
        conn: &mut SqliteConnection,
        id: i64,
        reason: &str,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE salary_batches SET status = 'REVERSED', reversal_reason = ? WHERE id = ?",
        )
        .bind(reason)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("SalaryBatch", id));
        }
        Ok(())
    }

    /// Batches of a company, newest period first
    pub async fn list_by_company(
        conn: &mut SqliteConnection,
        company_id: i64,
    ) -> PersistenceResult<Vec<SalaryBatch>> {
        let rows = sqlx::query_as::<_, SalaryBatchRow>(
            "SELECT * FROM salary_batches WHERE company_id = ? ORDER BY year DESC, month DESC",
        )
        .bind(company_id)
        .fetch_all(&mut *conn)
        .await?;
        convert_all(rows)
    }
}

// ============================================================================
// Salary Transaction Repository
// ============================================================================

/// Values for a new salary transaction row
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub batch_id: i64,
    pub employee_id: i64,
    pub amount: Decimal,
    pub snapshot: Option<BankSnapshot>,
    pub status: TxnStatus,
    pub hold_reason: Option<HoldReason>,
}

const DETAIL_SELECT: &str = r#"
    SELECT t.*, e.emp_code, e.name AS employee_name, b.company_id, b.month, b.year
    FROM salary_transactions t
    JOIN employees e ON e.id = t.employee_id
    JOIN salary_batches b ON b.id = t.batch_id
"#;

/// Repository for the salary_transactions table
pub struct SalaryTxnRepo;

impl SalaryTxnRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        txn: &NewTransaction,
    ) -> PersistenceResult<i64> {
        let (account_number, routing_code) = split_snapshot(txn.snapshot.as_ref());
        let result = sqlx::query(
            r#"
            INSERT INTO salary_transactions (batch_id, employee_id, salary_amount, account_number,
                                             routing_code, status, hold_reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(txn.batch_id)
        .bind(txn.employee_id)
        .bind(txn.amount.to_string())
        .bind(account_number)
        .bind(routing_code)
        .bind(txn.status.as_str())
        .bind(txn.hold_reason.map(|r| r.code()))
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("SalaryTransaction", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> PersistenceResult<SalaryTransaction> {
        sqlx::query_as::<_, SalaryTransactionRow>("SELECT * FROM salary_transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PersistenceError::not_found("SalaryTransaction", id))?
            .try_into()
    }

    /// Row a draft re-upload should overwrite: the live row if any, else the latest cancelled one
    pub async fn find_reusable(
        conn: &mut SqliteConnection,
        batch_id: i64,
        employee_id: i64,
    ) -> PersistenceResult<Option<SalaryTransaction>> {
        sqlx::query_as::<_, SalaryTransactionRow>(
            r#"
            SELECT * FROM salary_transactions
            WHERE batch_id = ? AND employee_id = ? AND status IN ('PENDING', 'HOLD', 'CANCELLED')
            ORDER BY (status = 'CANCELLED'), id DESC
            LIMIT 1
            "#,
        )
        .bind(batch_id)
        .bind(employee_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(SalaryTransaction::try_from)
        .transpose()
    }

    /// Overwrite amount, snapshot and evaluation result of a draft row
    pub async fn update_upload(
        conn: &mut SqliteConnection,
        id: i64,
        amount: Decimal,
        snapshot: Option<&BankSnapshot>,
        status: TxnStatus,
        hold_reason: Option<HoldReason>,
    ) -> PersistenceResult<()> {
        let (account_number, routing_code) = split_snapshot(snapshot);
        sqlx::query(
            r#"
            UPDATE salary_transactions
            SET salary_amount = ?, account_number = ?, routing_code = ?, status = ?, hold_reason = ?,
                failure_reason = NULL, utr = NULL, bank_response_at = NULL
            WHERE id = ?
            "#,
        )
        .bind(amount.to_string())
        .bind(account_number)
        .bind(routing_code)
        .bind(status.as_str())
        .bind(hold_reason.map(|r| r.code()))
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("SalaryTransaction", e))?;
        Ok(())
    }

    /// Store a re-evaluation result. The snapshot is only replaced when one is given.
    pub async fn update_hold(
        conn: &mut SqliteConnection,
        id: i64,
        status: TxnStatus,
        hold_reason: Option<HoldReason>,
        snapshot: Option<&BankSnapshot>,
    ) -> PersistenceResult<()> {
        let (account_number, routing_code) = split_snapshot(snapshot);
        sqlx::query(
            r#"
            UPDATE salary_transactions
            SET status = ?, hold_reason = ?,
                account_number = COALESCE(?, account_number),
                routing_code = COALESCE(?, routing_code)
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(hold_reason.map(|r| r.code()))
        .bind(account_number)
        .bind(routing_code)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: i64,
        status: TxnStatus,
    ) -> PersistenceResult<()> {
        sqlx::query("UPDATE salary_transactions SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| PersistenceError::on_write("SalaryTransaction", e))?;
        Ok(())
    }

    /// Apply a bank outcome to one transaction
    pub async fn record_response(
        conn: &mut SqliteConnection,
        id: i64,
        status: TxnStatus,
        utr: Option<&str>,
        failure_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            UPDATE salary_transactions
            SET status = ?, utr = ?, failure_reason = ?, bank_response_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(utr)
        .bind(failure_reason)
        .bind(at)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn list_by_batch(
        conn: &mut SqliteConnection,
        batch_id: i64,
    ) -> PersistenceResult<Vec<SalaryTransaction>> {
        let rows = sqlx::query_as::<_, SalaryTransactionRow>(
            "SELECT * FROM salary_transactions WHERE batch_id = ? ORDER BY id",
        )
        .bind(batch_id)
        .fetch_all(&mut *conn)
        .await?;
        convert_all(rows)
    }

    pub async fn list_by_batch_and_status(
        conn: &mut SqliteConnection,
        batch_id: i64,
        status: TxnStatus,
    ) -> PersistenceResult<Vec<SalaryTransaction>> {
        let rows = sqlx::query_as::<_, SalaryTransactionRow>(
            "SELECT * FROM salary_transactions WHERE batch_id = ? AND status = ? ORDER BY id",
        )
        .bind(batch_id)
        .bind(status.as_str())
        .fetch_all(&mut *conn)
        .await?;
        convert_all(rows)
    }

    pub async fn count_by_status(
        conn: &mut SqliteConnection,
        batch_id: i64,
        status: TxnStatus,
    ) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM salary_transactions WHERE batch_id = ? AND status = ?",
        )
        .bind(batch_id)
        .bind(status.as_str())
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.0)
    }

    pub async fn count_live(
        conn: &mut SqliteConnection,
        batch_id: i64,
        employee_id: i64,
    ) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM salary_transactions
            WHERE batch_id = ? AND employee_id = ? AND status NOT IN ('FAILED', 'CANCELLED')
            "#,
        )
        .bind(batch_id)
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.0)
    }

    /// PENDING transaction of the employee with this code in the batch
    pub async fn find_pending_by_emp_code(
        conn: &mut SqliteConnection,
        batch_id: i64,
        emp_code: &str,
    ) -> PersistenceResult<Option<SalaryTransaction>> {
        sqlx::query_as::<_, SalaryTransactionRow>(
            r#"
            SELECT t.* FROM salary_transactions t
            JOIN employees e ON e.id = t.employee_id
            WHERE t.batch_id = ? AND e.emp_code = ? AND t.status = 'PENDING'
            ORDER BY t.id
            LIMIT 1
            "#,
        )
        .bind(batch_id)
        .bind(emp_code.trim())
        .fetch_optional(&mut *conn)
        .await?
        .map(SalaryTransaction::try_from)
        .transpose()
    }

    /// Latest FAILED row per employee that has no live row in the batch
    pub async fn retry_candidates(
        conn: &mut SqliteConnection,
        batch_id: i64,
    ) -> PersistenceResult<Vec<SalaryTransaction>> {
        let rows = sqlx::query_as::<_, SalaryTransactionRow>(
            r#"
            SELECT t.* FROM salary_transactions t
            WHERE t.batch_id = ? AND t.status = 'FAILED'
              AND t.id = (
                  SELECT MAX(f.id) FROM salary_transactions f
                  WHERE f.batch_id = t.batch_id AND f.employee_id = t.employee_id
                    AND f.status = 'FAILED'
              )
              AND NOT EXISTS (
                  SELECT 1 FROM salary_transactions l
                  WHERE l.batch_id = t.batch_id AND l.employee_id = t.employee_id
                    AND l.status NOT IN ('FAILED', 'CANCELLED')
              )
            ORDER BY t.id
            "#,
        )
        .bind(batch_id)
        .fetch_all(&mut *conn)
        .await?;
        convert_all(rows)
    }

    /// Cancel every row not yet PROCESSED or CANCELLED; returns rows touched
    pub async fn cancel_open(
        conn: &mut SqliteConnection,
        batch_id: i64,
        at: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE salary_transactions
            SET status = 'CANCELLED', bank_response_at = ?
            WHERE batch_id = ? AND status NOT IN ('PROCESSED', 'CANCELLED')
            "#,
        )
        .bind(at)
        .bind(batch_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// HOLD rows of the employee in DRAFT batches
    pub async fn held_in_draft_for_employee(
        conn: &mut SqliteConnection,
        employee_id: i64,
    ) -> PersistenceResult<Vec<TransactionDetailRow>> {
        let sql = format!(
            "{} WHERE t.employee_id = ? AND t.status = 'HOLD' AND b.status = 'DRAFT' ORDER BY t.id",
            DETAIL_SELECT
        );
        let rows = sqlx::query_as::<_, TransactionDetailRow>(&sql)
            .bind(employee_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    pub async fn details_by_batch(
        conn: &mut SqliteConnection,
        batch_id: i64,
    ) -> PersistenceResult<Vec<TransactionDetailRow>> {
        let sql = format!("{} WHERE t.batch_id = ? ORDER BY e.emp_code, t.id", DETAIL_SELECT);
        let rows = sqlx::query_as::<_, TransactionDetailRow>(&sql)
            .bind(batch_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    pub async fn details_by_batch_and_status(
        conn: &mut SqliteConnection,
        batch_id: i64,
        status: TxnStatus,
    ) -> PersistenceResult<Vec<TransactionDetailRow>> {
        let sql = format!(
            "{} WHERE t.batch_id = ? AND t.status = ? ORDER BY e.emp_code, t.id",
            DETAIL_SELECT
        );
        let rows = sqlx::query_as::<_, TransactionDetailRow>(&sql)
            .bind(batch_id)
            .bind(status.as_str())
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    /// Every transaction of a company in a calendar year
    pub async fn details_for_company_year(
        conn: &mut SqliteConnection,
        company_id: i64,
        year: i32,
    ) -> PersistenceResult<Vec<TransactionDetailRow>> {
        let sql = format!(
            "{} WHERE b.company_id = ? AND b.year = ? ORDER BY b.month, e.emp_code, t.id",
            DETAIL_SELECT
        );
        let rows = sqlx::query_as::<_, TransactionDetailRow>(&sql)
            .bind(company_id)
            .bind(year)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    pub async fn details_for_employee(
        conn: &mut SqliteConnection,
        employee_id: i64,
    ) -> PersistenceResult<Vec<TransactionDetailRow>> {
        let sql = format!(
            "{} WHERE t.employee_id = ? ORDER BY b.year DESC, b.month DESC, t.id DESC",
            DETAIL_SELECT
        );
        let rows = sqlx::query_as::<_, TransactionDetailRow>(&sql)
            .bind(employee_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }
}

fn split_snapshot(snapshot: Option<&BankSnapshot>) -> (Option<&str>, Option<&str>) {
    match snapshot {
        Some(s) => (Some(s.account_number.as_str()), Some(s.routing_code.as_str())),
        None => (None, None),
    }
}

// ============================================================================
// Batch Reversal Repository
// ============================================================================

/// Repository for the salary_batch_reversals table
pub struct ReversalRepo;

impl ReversalRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        batch_id: i64,
        reason: &str,
        reversed_by: &str,
        at: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO salary_batch_reversals (batch_id, reason, reversed_by, reversed_at) VALUES (?, ?, ?, ?)",
        )
        .bind(batch_id)
        .bind(reason)
        .bind(reversed_by)
        .bind(at)
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::on_write("BatchReversal", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_batch(
        conn: &mut SqliteConnection,
        batch_id: i64,
    ) -> PersistenceResult<Option<BatchReversal>> {
        let row = sqlx::query_as::<_, BatchReversalRow>(
            "SELECT * FROM salary_batch_reversals WHERE batch_id = ?",
        )
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(BatchReversal::from))
    }

    pub async fn count_by_batch(
        conn: &mut SqliteConnection,
        batch_id: i64,
    ) -> PersistenceResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM salary_batch_reversals WHERE batch_id = ?")
                .bind(batch_id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Database initialization
// ============================================================================

/// Open a connection pool, creating the database file if missing
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

/// Run migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Open the database and bring the schema up to date
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Fresh in-memory database with the schema applied.
///
/// Uses a single connection that is never recycled, since every connection to
/// `:memory:` would otherwise see its own empty database.
pub async fn memory_pool() -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use payroll_core::RoutingCode;
    use rust_decimal_macros::dec;

    async fn seed(conn: &mut SqliteConnection) -> (i64, i64) {
        let company_id = CompanyRepo::insert(conn, None, "Acme", "ACM").await.unwrap();
        let employee_id = EmployeeRepo::insert(
            conn,
            &NewEmployee {
                company_id,
                emp_code: "E001".to_string(),
                name: "Asha".to_string(),
                father_name: None,
                uan_number: Some("UAN1".to_string()),
                esic_number: None,
                document_number: None,
                default_salary: Some(dec!(12000)),
                joining_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                exit_date: None,
            },
        )
        .await
        .unwrap();
        (company_id, employee_id)
    }

    fn details(account: &str) -> BankAccountDetails {
        BankAccountDetails::new(
            "HDFC",
            account,
            RoutingCode::parse("HDFC0001234").unwrap(),
            PayrollPeriod::new(2026, 3).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_employee_round_trip() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (company_id, employee_id) = seed(&mut conn).await;

        let emp = EmployeeRepo::get_by_id(&mut conn, employee_id).await.unwrap();
        assert_eq!(emp.emp_code, "E001");
        assert_eq!(emp.default_salary, Some(dec!(12000)));

        let found = EmployeeRepo::find_by_code(&mut conn, company_id, " E001 ")
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_identifier_is_unique_violation() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (company_id, _) = seed(&mut conn).await;

        let err = EmployeeRepo::insert(
            &mut conn,
            &NewEmployee {
                company_id,
                emp_code: "E002".to_string(),
                name: "Ravi".to_string(),
                father_name: None,
                uan_number: Some("UAN1".to_string()),
                esic_number: None,
                document_number: None,
                default_salary: None,
                joining_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                exit_date: None,
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_single_active_account_enforced() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (_, employee_id) = seed(&mut conn).await;

        BankAccountRepo::insert_active(&mut conn, employee_id, &details("111"), None, None)
            .await
            .unwrap();
        let err = BankAccountRepo::insert_active(&mut conn, employee_id, &details("222"), None, None)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        assert_eq!(BankAccountRepo::deactivate_all(&mut conn, employee_id).await.unwrap(), 1);
        BankAccountRepo::insert_active(&mut conn, employee_id, &details("222"), None, None)
            .await
            .unwrap();

        let active = BankAccountRepo::get_active(&mut conn, employee_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.account_number, "222");
        assert_eq!(
            BankAccountRepo::list_for_employee(&mut conn, employee_id)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_live_transaction_index() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (company_id, employee_id) = seed(&mut conn).await;
        let period = PayrollPeriod::new(2026, 3).unwrap();
        let batch_id = BatchRepo::insert(&mut conn, company_id, period).await.unwrap();

        let new = NewTransaction {
            batch_id,
            employee_id,
            amount: dec!(5000),
            snapshot: None,
            status: TxnStatus::Hold,
            hold_reason: Some(HoldReason::NoActiveBankAccount),
        };
        let id = SalaryTxnRepo::insert(&mut conn, &new).await.unwrap();
        assert!(SalaryTxnRepo::insert(&mut conn, &new)
            .await
            .unwrap_err()
            .is_unique_violation());

        SalaryTxnRepo::set_status(&mut conn, id, TxnStatus::Failed).await.unwrap();
        SalaryTxnRepo::insert(&mut conn, &new).await.unwrap();
        assert_eq!(
            SalaryTxnRepo::count_live(&mut conn, batch_id, employee_id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_batch_unique_per_period() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (company_id, _) = seed(&mut conn).await;
        let period = PayrollPeriod::new(2026, 3).unwrap();

        let id = BatchRepo::insert(&mut conn, company_id, period).await.unwrap();
        assert!(BatchRepo::insert(&mut conn, company_id, period).await.is_err());

        let batch = BatchRepo::find(&mut conn, company_id, period).await.unwrap().unwrap();
        assert_eq!(batch.id, id);
        assert_eq!(batch.status, BatchStatus::Draft);
    }
}
