//! Bank response reconciliation
//!
//! Applies a bank result file to the PENDING transactions of an exported
//! batch and completes the batch once nothing is pending.

use crate::error::{BusinessError, BusinessResult};
use crate::hold::guard;
use crate::rows::BankResponseRow;
use crate::services::{AuditLog, IngestSummary, RowError, ServiceContext};
use payroll_core::{AuditAction, BatchAction, BatchStatus, PayrollPeriod, ResponseStatus, TxnStatus};
use payroll_persistence::{BatchRepo, SalaryTxnRepo};

/// Bank response service
pub struct ReconcileService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReconcileService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Apply bank outcomes to the EXPORTED batch of the period.
    ///
    /// Rows are matched to PENDING transactions by employee code. Rows with an
    /// unknown status or without a pending match are skipped.
    pub async fn ingest(
        &self,
        company_id: i64,
        period: PayrollPeriod,
        rows: &[BankResponseRow],
        actor: &str,
    ) -> BusinessResult<IngestSummary> {
        let mut tx = self.ctx.pool().begin().await?;

        let batch = BatchRepo::find(&mut tx, company_id, period)
            .await?
            .filter(|b| matches!(b.status, BatchStatus::Exported | BatchStatus::Reversed))
            .ok_or_else(|| BusinessError::NoExportedBatch {
                period: period.to_string(),
            })?;
        guard(&batch, BatchAction::IngestResponse)?;

        let now = self.ctx.now();
        let mut summary = IngestSummary {
            batch_id: batch.id,
            updated: 0,
            skipped: 0,
            completed: false,
            errors: Vec::new(),
        };

        for row in rows {
            let emp_code = row.emp_code.trim();

            let Some(status) = ResponseStatus::parse(&row.status) else {
                tracing::warn!(row = row.row, emp_code, status = %row.status, "unknown response status");
                summary.skipped += 1;
                summary.errors.push(RowError::new(
                    row.row,
                    emp_code,
                    format!("Unknown status: {}", row.status.trim()),
                ));
                continue;
            };

            let Some(txn) =
                SalaryTxnRepo::find_pending_by_emp_code(&mut tx, batch.id, emp_code).await?
            else {
                tracing::debug!(row = row.row, emp_code, "no pending transaction");
                summary.skipped += 1;
                summary.errors.push(RowError::new(
                    row.row,
                    emp_code,
                    "No pending transaction for employee",
                ));
                continue;
            };

            let next = txn.status.apply(status.action())?;
            match status {
                ResponseStatus::Success => {
                    let utr = non_blank(row.utr.as_deref());
                    SalaryTxnRepo::record_response(&mut tx, txn.id, next, utr, None, now).await?;
                }
                ResponseStatus::Failed => {
                    let reason = non_blank(row.reason.as_deref())
                        .unwrap_or(self.ctx.settings().default_failure_reason.as_str());
                    SalaryTxnRepo::record_response(
                        &mut tx,
                        txn.id,
                        next,
                        txn.utr.as_deref(),
                        Some(reason),
                        now,
                    )
                    .await?;
                }
            }
            summary.updated += 1;
        }

        // Completion is checked even when no row applied
        let pending = SalaryTxnRepo::count_by_status(&mut tx, batch.id, TxnStatus::Pending).await?;
        if pending == 0 {
            let next = batch.status.apply(BatchAction::Complete)?;
            BatchRepo::set_status(&mut tx, batch.id, next).await?;
            summary.completed = true;
        }

        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::BankResponseIngested)
                .with_company(company_id)
                .with_batch(batch.id)
                .with_description(format!(
                    "updated {}, skipped {}",
                    summary.updated, summary.skipped
                )),
        );
        if summary.completed {
            log.push(
                log.event(AuditAction::BatchCompleted)
                    .with_company(company_id)
                    .with_batch(batch.id),
            );
        }
        self.ctx.record(log);

        tracing::info!(
            company_id,
            %period,
            batch_id = batch.id,
            updated = summary.updated,
            skipped = summary.skipped,
            completed = summary.completed,
            "bank response ingested"
        );
        Ok(summary)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
