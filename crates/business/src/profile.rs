//! Employee profile change requests
//!
//! A pending request holds the employee's salaries; approval writes the new
//! values and re-evaluates the "pending profile change" holds.

use crate::error::{BusinessError, BusinessResult};
use crate::hold::reevaluate_employee;
use crate::ledger::find_employee;
use crate::services::{AuditLog, ReevaluationSummary, ServiceContext};
use payroll_core::{
    AuditAction, Employee, FieldChange, HoldScope, ProfileChangeRequest, ProfileField,
    RequestAction, RequestStatus,
};
use payroll_persistence::{EmployeeRepo, ProfileChangeRepo};
use sqlx::SqliteConnection;

/// Result of approving a profile change
#[derive(Debug, Clone)]
pub struct ProfileApproval {
    pub employee: Employee,
    pub reevaluation: ReevaluationSummary,
}

/// Profile change service
pub struct ProfileService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ProfileService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Submit new values for some profile fields. `None` clears a field.
    pub async fn submit(
        &self,
        company_id: i64,
        emp_code: &str,
        values: Vec<(ProfileField, Option<String>)>,
        requester: &str,
    ) -> BusinessResult<ProfileChangeRequest> {
        let mut tx = self.ctx.pool().begin().await?;

        let employee = find_employee(&mut tx, company_id, emp_code).await?;

        let changes: Vec<FieldChange> = values
            .into_iter()
            .map(|(field, new)| FieldChange::against(&employee, field, new))
            .filter(|c| !c.is_noop())
            .collect();
        if changes.is_empty() {
            return Err(BusinessError::InvalidInput(
                "profile change does not change anything".to_string(),
            ));
        }

        // Reject values that could never be applied
        employee.clone().apply_changes(&changes)?;

        let request_id = ProfileChangeRepo::insert(&mut tx, employee.id, &changes, requester).await?;

        // Every held row now waits on the request
        reevaluate_employee(&mut tx, employee.id, HoldScope::All, self.ctx.today()).await?;

        let request = ProfileChangeRepo::get_by_id(&mut tx, request_id).await?;
        tx.commit().await?;

        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        let mut log = AuditLog::new(requester);
        log.push(
            log.event(AuditAction::ProfileChangeSubmitted)
                .with_company(company_id)
                .with_employee(&employee.emp_code)
                .with_description(format!("request #{}: {}", request_id, fields.join(", "))),
        );
        self.ctx.record(log);

        tracing::info!(request_id, emp_code = %employee.emp_code, "profile change submitted");
        Ok(request)
    }

    /// Apply a pending request to the employee
    pub async fn approve(&self, request_id: i64, reviewer: &str) -> BusinessResult<ProfileApproval> {
        let mut tx = self.ctx.pool().begin().await?;

        let request = pending_request(&mut tx, request_id, RequestAction::Approve).await?;
        let mut employee = EmployeeRepo::get_by_id(&mut tx, request.employee_id).await?;

        employee.apply_changes(&request.changes)?;
        EmployeeRepo::update_profile(&mut tx, &employee)
            .await
            .map_err(|e| {
                BusinessError::conflict_on_unique(
                    e,
                    format!("identifier of {} already in use", employee.emp_code),
                )
            })?;

        ProfileChangeRepo::record_review(
            &mut tx,
            request_id,
            RequestStatus::Approved,
            reviewer,
            None,
            self.ctx.now(),
        )
        .await?;

        let reevaluation =
            reevaluate_employee(&mut tx, employee.id, HoldScope::Profile, self.ctx.today()).await?;

        tx.commit().await?;

        let mut log = AuditLog::new(reviewer);
        log.push(
            log.event(AuditAction::ProfileChangeApproved)
                .with_company(employee.company_id)
                .with_employee(&employee.emp_code)
                .with_description(format!("request #{}", request_id)),
        );
        self.ctx.record(log);

        tracing::info!(
            request_id,
            emp_code = %employee.emp_code,
            released = reevaluation.released,
            "profile change approved"
        );
        Ok(ProfileApproval {
            employee,
            reevaluation,
        })
    }

    pub async fn reject(
        &self,
        request_id: i64,
        reviewer: &str,
        reason: Option<&str>,
    ) -> BusinessResult<ReevaluationSummary> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.ctx.settings().default_rejection_reason.as_str())
            .to_string();

        let mut tx = self.ctx.pool().begin().await?;

        let request = pending_request(&mut tx, request_id, RequestAction::Reject).await?;
        let employee = EmployeeRepo::get_by_id(&mut tx, request.employee_id).await?;

        ProfileChangeRepo::record_review(
            &mut tx,
            request_id,
            RequestStatus::Rejected,
            reviewer,
            Some(&reason),
            self.ctx.now(),
        )
        .await?;

        let reevaluation =
            reevaluate_employee(&mut tx, employee.id, HoldScope::Profile, self.ctx.today()).await?;

        tx.commit().await?;

        let mut log = AuditLog::new(reviewer);
        log.push(
            log.event(AuditAction::ProfileChangeRejected)
                .with_company(employee.company_id)
                .with_employee(&employee.emp_code)
                .with_description(format!("request #{}: {}", request_id, reason)),
        );
        self.ctx.record(log);

        tracing::info!(request_id, emp_code = %employee.emp_code, "profile change rejected");
        Ok(reevaluation)
    }

    pub async fn list_pending(&self, company_id: i64) -> BusinessResult<Vec<ProfileChangeRequest>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(ProfileChangeRepo::list_pending(&mut conn, company_id).await?)
    }
}

async fn pending_request(
    conn: &mut SqliteConnection,
    request_id: i64,
    action: RequestAction,
) -> BusinessResult<ProfileChangeRequest> {
    let request = ProfileChangeRepo::get_by_id(conn, request_id).await?;
    if request.status.apply(action).is_err() {
        return Err(BusinessError::RequestNotPending {
            id: request_id,
            status: request.status.to_string(),
        });
    }
    Ok(request)
}
