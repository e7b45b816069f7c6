//! Hold evaluation against stored state
//!
//! Gathers [`HoldFacts`] from the database and re-runs the evaluator on HOLD
//! rows of DRAFT batches when something an employee is held for changes.

use crate::error::{BusinessError, BusinessResult};
use crate::services::{AuditLog, ReevaluationSummary, ServiceContext};
use chrono::NaiveDate;
use payroll_core::{
    evaluate, AuditAction, BankAccount, BatchAction, BatchStatus, Employee, HoldDecision,
    HoldFacts, HoldReason, HoldScope, PayrollPeriod, SalaryBatch, TxnAction, TxnStatus,
};
use payroll_persistence::{
    BankAccountRepo, BankChangeRepo, BatchRepo, EmployeeRepo, ProfileChangeRepo, SalaryTxnRepo,
};
use sqlx::SqliteConnection;

/// Facts about one employee as currently stored
pub(crate) async fn facts_for(
    conn: &mut SqliteConnection,
    employee: &Employee,
) -> BusinessResult<(HoldFacts, Option<BankAccount>)> {
    let active = BankAccountRepo::get_active(conn, employee.id).await?;
    let facts = HoldFacts {
        joining_date: employee.joining_date,
        exit_date: employee.exit_date,
        has_pending_profile_change: ProfileChangeRepo::has_pending(conn, employee.id).await?,
        has_pending_bank_change: BankChangeRepo::has_pending(conn, employee.id).await?,
        has_active_bank_account: active.is_some(),
    };
    Ok((facts, active))
}

/// Store a decision on a HOLD row. A released row takes the snapshot of the active account.
async fn apply_decision(
    conn: &mut SqliteConnection,
    txn_id: i64,
    decision: HoldDecision,
    active: Option<&BankAccount>,
) -> BusinessResult<bool> {
    match decision {
        HoldDecision::Payable => {
            let status = TxnStatus::Hold.apply(TxnAction::Release)?;
            let snapshot = active.map(BankAccount::snapshot);
            SalaryTxnRepo::update_hold(conn, txn_id, status, None, snapshot.as_ref()).await?;
            Ok(true)
        }
        HoldDecision::Hold(reason) => {
            let status = TxnStatus::Hold.apply(TxnAction::Rehold)?;
            SalaryTxnRepo::update_hold(conn, txn_id, status, Some(reason), None).await?;
            Ok(false)
        }
    }
}

/// Re-evaluate the employee's HOLD rows in DRAFT batches whose reason falls in `scope`.
///
/// Rows held for a reason outside the scope are left untouched.
pub(crate) async fn reevaluate_employee(
    conn: &mut SqliteConnection,
    employee_id: i64,
    scope: HoldScope,
    today: NaiveDate,
) -> BusinessResult<ReevaluationSummary> {
    let held = SalaryTxnRepo::held_in_draft_for_employee(conn, employee_id).await?;
    let mut summary = ReevaluationSummary::default();
    if held.is_empty() {
        return Ok(summary);
    }

    let employee = EmployeeRepo::get_by_id(conn, employee_id).await?;
    let (facts, active) = facts_for(conn, &employee).await?;

    for row in held {
        let in_scope = match row.txn.hold_reason.as_deref() {
            Some(code) => scope.contains(HoldReason::from_code(code)?),
            None => true,
        };
        if !in_scope {
            continue;
        }

        let decision = evaluate(&facts, row.period()?, today);
        if apply_decision(conn, row.txn.id, decision, active.as_ref()).await? {
            summary.released += 1;
        } else {
            summary.still_held += 1;
        }
    }

    if summary.released > 0 {
        tracing::info!(
            employee_id,
            released = summary.released,
            still_held = summary.still_held,
            "held salaries re-evaluated"
        );
    }
    Ok(summary)
}

/// Hold evaluation service
pub struct HoldService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> HoldService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Decide whether the employee would be payable in `period` today
    pub async fn evaluate_employee(
        &self,
        employee_id: i64,
        period: PayrollPeriod,
    ) -> BusinessResult<HoldDecision> {
        let mut conn = self.ctx.pool().acquire().await?;
        let employee = EmployeeRepo::get_by_id(&mut conn, employee_id).await?;
        let (facts, _) = facts_for(&mut conn, &employee).await?;
        Ok(evaluate(&facts, period, self.ctx.today()))
    }

    /// Re-evaluate one employee's held rows for reasons in `scope`
    pub async fn reevaluate_holds(
        &self,
        employee_id: i64,
        scope: HoldScope,
    ) -> BusinessResult<ReevaluationSummary> {
        let mut tx = self.ctx.pool().begin().await?;
        let summary = reevaluate_employee(&mut tx, employee_id, scope, self.ctx.today()).await?;
        tx.commit().await?;
        Ok(summary)
    }

    /// Re-evaluate every HOLD row of a DRAFT batch against current facts
    pub async fn reevaluate_batch(
        &self,
        company_id: i64,
        period: PayrollPeriod,
        actor: &str,
    ) -> BusinessResult<ReevaluationSummary> {
        let mut tx = self.ctx.pool().begin().await?;

        let batch = require_batch(&mut tx, company_id, period).await?;
        guard(&batch, BatchAction::Reevaluate)?;

        let held =
            SalaryTxnRepo::details_by_batch_and_status(&mut tx, batch.id, TxnStatus::Hold).await?;
        let mut summary = ReevaluationSummary::default();
        let today = self.ctx.today();

        for row in held {
            let employee = EmployeeRepo::get_by_id(&mut tx, row.txn.employee_id).await?;
            let (facts, active) = facts_for(&mut tx, &employee).await?;
            let decision = evaluate(&facts, period, today);
            if apply_decision(&mut tx, row.txn.id, decision, active.as_ref()).await? {
                summary.released += 1;
            } else {
                summary.still_held += 1;
            }
        }

        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::HoldsReevaluated)
                .with_company(company_id)
                .with_batch(batch.id)
                .with_description(format!(
                    "released {}, still held {}",
                    summary.released, summary.still_held
                )),
        );
        self.ctx.record(log);

        tracing::info!(batch_id = batch.id, released = summary.released, "batch holds re-evaluated");
        Ok(summary)
    }
}

/// Batch of a company for a period, or a precondition error
pub(crate) async fn require_batch(
    conn: &mut SqliteConnection,
    company_id: i64,
    period: PayrollPeriod,
) -> BusinessResult<SalaryBatch> {
    BatchRepo::find(conn, company_id, period)
        .await?
        .ok_or_else(|| BusinessError::BatchNotFound {
            period: period.to_string(),
        })
}

/// Check that `action` is allowed on the batch; reversed batches get their own error
pub(crate) fn guard(batch: &SalaryBatch, action: BatchAction) -> BusinessResult<BatchStatus> {
    if batch.status == BatchStatus::Reversed {
        return Err(BusinessError::BatchReversed { batch_id: batch.id });
    }
    Ok(batch.guard(action)?)
}
