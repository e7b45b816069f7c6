//! Bank account ledger - change requests, approvals, bulk upload
//!
//! The ledger is the only place that activates or deactivates bank accounts.
//! Every activation re-evaluates the employee's bank-class holds in the same
//! database transaction.

use crate::error::{BusinessError, BusinessResult};
use crate::hold::reevaluate_employee;
use crate::rows::BankUploadRow;
use crate::services::{AuditLog, BankUploadSummary, ReevaluationSummary, RowError, ServiceContext};
use payroll_core::{
    AuditAction, BankAccount, BankAccountDetails, BankChangeRequest, Employee, HoldScope,
    PayrollPeriod, RequestAction, RequestStatus, RoutingCode,
};
use payroll_persistence::{BankAccountRepo, BankChangeRepo, EmployeeRepo, PersistenceError};
use sqlx::SqliteConnection;

/// Result of activating an account
#[derive(Debug, Clone)]
pub struct AccountChange {
    pub account: BankAccount,
    pub reevaluation: ReevaluationSummary,
}

/// Bank account ledger service
pub struct BankLedger<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BankLedger<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn get_active_account(&self, employee_id: i64) -> BusinessResult<Option<BankAccount>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(BankAccountRepo::get_active(&mut conn, employee_id).await?)
    }

    /// Every account the employee ever had, newest first
    pub async fn account_history(&self, employee_id: i64) -> BusinessResult<Vec<BankAccount>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(BankAccountRepo::list_for_employee(&mut conn, employee_id).await?)
    }

    /// Submit a bank change request for approval.
    ///
    /// `effective_from` defaults to the current period.
    pub async fn submit_change_request(
        &self,
        company_id: i64,
        emp_code: &str,
        bank_name: &str,
        account_number: &str,
        routing_code: &str,
        effective_from: Option<PayrollPeriod>,
        submitter: &str,
    ) -> BusinessResult<BankChangeRequest> {
        let routing_code =
            RoutingCode::parse_with_length(routing_code, self.ctx.settings().routing_code_length)?;
        let effective_from = effective_from.unwrap_or_else(|| self.ctx.current_period());
        let details = BankAccountDetails::new(bank_name, account_number, routing_code, effective_from)?;

        let mut tx = self.ctx.pool().begin().await?;

        let employee = find_employee(&mut tx, company_id, emp_code).await?;

        // One pending request per employee
        if BankChangeRepo::has_pending(&mut tx, employee.id).await? {
            return Err(BusinessError::PendingBankChange {
                emp_code: employee.emp_code,
            });
        }

        let request_id = BankChangeRepo::insert(&mut tx, employee.id, &details, submitter)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    BusinessError::PendingBankChange {
                        emp_code: employee.emp_code.clone(),
                    }
                } else {
                    e.into()
                }
            })?;

        // Held rows now wait on the request rather than on a missing account
        reevaluate_employee(&mut tx, employee.id, HoldScope::Bank, self.ctx.today()).await?;

        let request = BankChangeRepo::get_by_id(&mut tx, request_id).await?;
        tx.commit().await?;

        let mut log = AuditLog::new(submitter);
        log.push(
            log.event(AuditAction::BankChangeSubmitted)
                .with_company(company_id)
                .with_employee(&employee.emp_code)
                .with_description(format!("request #{}", request_id)),
        );
        self.ctx.record(log);

        tracing::info!(request_id, emp_code = %employee.emp_code, "bank change request submitted");
        Ok(request)
    }

    /// Approve a pending request and activate the new account
    pub async fn approve_request(
        &self,
        request_id: i64,
        approver: &str,
    ) -> BusinessResult<AccountChange> {
        let mut tx = self.ctx.pool().begin().await?;

        let request = pending_request(&mut tx, request_id, RequestAction::Approve).await?;
        let employee = EmployeeRepo::get_by_id(&mut tx, request.employee_id).await?;
        let details = request.details(self.ctx.settings().routing_code_length)?;

        // Close the request first so the evaluator no longer sees it as pending
        let now = self.ctx.now();
        BankChangeRepo::record_review(&mut tx, request_id, RequestStatus::Approved, approver, None, now)
            .await?;

        let change = self
            .activate(&mut tx, &employee, &details, Some(approver))
            .await?;

        tx.commit().await?;

        let mut log = AuditLog::new(approver);
        log.push(
            log.event(AuditAction::BankChangeApproved)
                .with_company(employee.company_id)
                .with_employee(&employee.emp_code)
                .with_description(format!(
                    "request #{}, account {}, released {} held salaries",
                    request_id,
                    change.account.masked_number(),
                    change.reevaluation.released
                )),
        );
        self.ctx.record(log);

        tracing::info!(
            request_id,
            emp_code = %employee.emp_code,
            released = change.reevaluation.released,
            "bank change approved"
        );
        Ok(change)
    }

    /// Reject a pending request. A blank reason falls back to the configured default.
    pub async fn reject_request(
        &self,
        request_id: i64,
        approver: &str,
        reason: Option<&str>,
    ) -> BusinessResult<BankChangeRequest> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.ctx.settings().default_rejection_reason.as_str())
            .to_string();

        let mut tx = self.ctx.pool().begin().await?;

        let request = pending_request(&mut tx, request_id, RequestAction::Reject).await?;
        let employee = EmployeeRepo::get_by_id(&mut tx, request.employee_id).await?;

        BankChangeRepo::record_review(
            &mut tx,
            request_id,
            RequestStatus::Rejected,
            approver,
            Some(&reason),
            self.ctx.now(),
        )
        .await?;

        reevaluate_employee(&mut tx, employee.id, HoldScope::Bank, self.ctx.today()).await?;

        let request = BankChangeRepo::get_by_id(&mut tx, request_id).await?;
        tx.commit().await?;

        let mut log = AuditLog::new(approver);
        log.push(
            log.event(AuditAction::BankChangeRejected)
                .with_company(employee.company_id)
                .with_employee(&employee.emp_code)
                .with_description(format!("request #{}: {}", request_id, reason)),
        );
        self.ctx.record(log);

        tracing::info!(request_id, emp_code = %employee.emp_code, "bank change rejected");
        Ok(request)
    }

    /// Activate an account directly, bypassing the request workflow
    pub async fn apply_change(
        &self,
        employee_id: i64,
        details: &BankAccountDetails,
        approver: &str,
    ) -> BusinessResult<AccountChange> {
        let mut tx = self.ctx.pool().begin().await?;
        let employee = EmployeeRepo::get_by_id(&mut tx, employee_id).await?;
        let change = self
            .activate(&mut tx, &employee, details, Some(approver))
            .await?;
        tx.commit().await?;

        let mut log = AuditLog::new(approver);
        log.push(
            log.event(AuditAction::BankChangeApproved)
                .with_company(employee.company_id)
                .with_employee(&employee.emp_code)
                .with_description(format!("account {}", change.account.masked_number())),
        );
        self.ctx.record(log);

        Ok(change)
    }

    /// Create active accounts from an uploaded sheet. All rows commit together.
    pub async fn bulk_upload(
        &self,
        company_id: i64,
        rows: &[BankUploadRow],
        actor: &str,
    ) -> BusinessResult<BankUploadSummary> {
        let settings = self.ctx.settings();
        let period = self.ctx.current_period();
        let mut summary = BankUploadSummary::default();

        let mut tx = self.ctx.pool().begin().await?;

        for row in rows {
            let emp_code = row.emp_code.trim();
            let details = match self.validate_upload_row(row, period) {
                Ok(details) => details,
                Err(message) => {
                    tracing::warn!(row = row.row, emp_code, %message, "bank upload row skipped");
                    summary.skipped += 1;
                    summary.errors.push(RowError::new(row.row, emp_code, message));
                    continue;
                }
            };

            let Some(employee) = EmployeeRepo::find_by_code(&mut tx, company_id, emp_code).await?
            else {
                tracing::warn!(row = row.row, emp_code, "bank upload row has unknown employee");
                summary.skipped += 1;
                summary
                    .errors
                    .push(RowError::new(row.row, emp_code, "Unknown employee code"));
                continue;
            };

            let change = self.activate(&mut tx, &employee, &details, None).await?;
            tracing::debug!(row = row.row, emp_code, "bank account created");
            summary.created += 1;
            summary.released += change.reevaluation.released;
        }

        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::BankBulkUpload)
                .with_company(company_id)
                .with_description(format!(
                    "created {}, skipped {} ({})",
                    summary.created, summary.skipped, settings.bulk_upload_bank_name
                )),
        );
        self.ctx.record(log);

        tracing::info!(
            company_id,
            created = summary.created,
            skipped = summary.skipped,
            "bank accounts uploaded"
        );
        Ok(summary)
    }

    /// Employees of the company without an active account
    pub async fn employees_missing_bank(&self, company_id: i64) -> BusinessResult<Vec<Employee>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(EmployeeRepo::list_without_active_account(&mut conn, company_id).await?)
    }

    /// Pending and reviewed requests of a company with employee code and name
    pub async fn list_requests(
        &self,
        company_id: i64,
        status: Option<RequestStatus>,
    ) -> BusinessResult<Vec<(BankChangeRequest, String, String)>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(BankChangeRepo::list_by_company(&mut conn, company_id, status).await?)
    }

    fn validate_upload_row(
        &self,
        row: &BankUploadRow,
        period: PayrollPeriod,
    ) -> Result<BankAccountDetails, String> {
        let settings = self.ctx.settings();
        if row.emp_code.trim().is_empty() {
            return Err("Missing employee code".to_string());
        }
        if row.account_number.trim().is_empty() {
            return Err("Missing account number".to_string());
        }
        if row.routing_code.trim().is_empty() {
            return Err("Missing routing code".to_string());
        }
        let routing_code = RoutingCode::parse_with_length(&row.routing_code, settings.routing_code_length)
            .map_err(|e| e.to_string())?;
        BankAccountDetails::new(
            &settings.bulk_upload_bank_name,
            &row.account_number,
            routing_code,
            period,
        )
        .map_err(|e| e.to_string())
    }

    /// Deactivate the old account, insert the new one and release bank-class holds
    async fn activate(
        &self,
        conn: &mut SqliteConnection,
        employee: &Employee,
        details: &BankAccountDetails,
        approver: Option<&str>,
    ) -> BusinessResult<AccountChange> {
        let approved_at = approver.map(|_| self.ctx.now());

        BankAccountRepo::deactivate_all(conn, employee.id).await?;
        BankAccountRepo::insert_active(conn, employee.id, details, approver, approved_at).await?;

        let account = BankAccountRepo::get_active(conn, employee.id)
            .await?
            .ok_or_else(|| PersistenceError::not_found("BankAccount", employee.id))?;

        let reevaluation =
            reevaluate_employee(conn, employee.id, HoldScope::Bank, self.ctx.today()).await?;

        Ok(AccountChange {
            account,
            reevaluation,
        })
    }
}

pub(crate) async fn find_employee(
    conn: &mut SqliteConnection,
    company_id: i64,
    emp_code: &str,
) -> BusinessResult<Employee> {
    EmployeeRepo::find_by_code(conn, company_id, emp_code)
        .await?
        .ok_or_else(|| BusinessError::not_found("Employee", emp_code.trim()))
}

async fn pending_request(
    conn: &mut SqliteConnection,
    request_id: i64,
    action: RequestAction,
) -> BusinessResult<BankChangeRequest> {
    let request = BankChangeRepo::get_by_id(conn, request_id).await?;
    if request.status.apply(action).is_err() {
        return Err(BusinessError::RequestNotPending {
            id: request_id,
            status: request.status.to_string(),
        });
    }
    Ok(request)
}
