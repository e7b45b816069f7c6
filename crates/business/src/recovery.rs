//! Retry of failed salaries and full batch reversal

use crate::error::{BusinessError, BusinessResult};
use crate::hold::require_batch;
use crate::services::{AuditLog, RetrySummary, ReversalSummary, ServiceContext};
use payroll_core::{
    AuditAction, BatchAction, BatchReversal, BatchStatus, PayrollPeriod, SalaryBatch, TxnStatus,
};
use payroll_persistence::{BatchRepo, NewTransaction, ReversalRepo, SalaryTxnRepo};

/// Retry and reversal service
pub struct RecoveryService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RecoveryService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Re-open failed salaries of the period's batch
    pub async fn retry_failed_for(
        &self,
        company_id: i64,
        period: PayrollPeriod,
        actor: &str,
    ) -> BusinessResult<RetrySummary> {
        let batch = {
            let mut conn = self.ctx.pool().acquire().await?;
            require_batch(&mut conn, company_id, period).await?
        };
        self.retry_failed(batch.id, actor).await
    }

    /// Create a new PENDING row for every employee whose latest row failed.
    ///
    /// The FAILED rows stay as history. With nothing to retry the batch is left as is.
    pub async fn retry_failed(&self, batch_id: i64, actor: &str) -> BusinessResult<RetrySummary> {
        let mut tx = self.ctx.pool().begin().await?;

        let batch = BatchRepo::get_by_id(&mut tx, batch_id).await?;
        let next = retry_guard(&batch)?;

        let candidates = SalaryTxnRepo::retry_candidates(&mut tx, batch.id).await?;
        if candidates.is_empty() {
            tracing::info!(batch_id, "no failed transactions to retry");
            return Ok(RetrySummary {
                batch_id,
                retried: 0,
            });
        }

        for failed in &candidates {
            SalaryTxnRepo::insert(
                &mut tx,
                &NewTransaction {
                    batch_id: batch.id,
                    employee_id: failed.employee_id,
                    amount: failed.amount,
                    snapshot: failed.snapshot.clone(),
                    status: TxnStatus::Pending,
                    hold_reason: None,
                },
            )
            .await?;
        }
        BatchRepo::set_status(&mut tx, batch.id, next).await?;
        tx.commit().await?;

        let summary = RetrySummary {
            batch_id,
            retried: candidates.len(),
        };

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::FailedRetried)
                .with_company(batch.company_id)
                .with_batch(batch.id)
                .with_description(summary.to_string()),
        );
        self.ctx.record(log);

        tracing::info!(batch_id, retried = summary.retried, "failed salaries re-opened");
        Ok(summary)
    }

    /// Reverse the period's batch
    pub async fn reverse_for(
        &self,
        company_id: i64,
        period: PayrollPeriod,
        reason: &str,
        actor: &str,
    ) -> BusinessResult<ReversalSummary> {
        let batch = {
            let mut conn = self.ctx.pool().acquire().await?;
            require_batch(&mut conn, company_id, period).await?
        };
        self.reverse(batch.id, reason, actor).await
    }

    /// Reverse a batch: record the reason once and cancel every open transaction.
    ///
    /// PROCESSED rows are kept; the money has already left.
    pub async fn reverse(
        &self,
        batch_id: i64,
        reason: &str,
        actor: &str,
    ) -> BusinessResult<ReversalSummary> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BusinessError::MissingReason);
        }

        let mut tx = self.ctx.pool().begin().await?;

        let batch = BatchRepo::get_by_id(&mut tx, batch_id).await?;
        if batch.status == BatchStatus::Reversed {
            return Err(BusinessError::BatchReversed { batch_id });
        }
        batch.guard(BatchAction::Reverse)?;

        let now = self.ctx.now();
        BatchRepo::mark_reversed(&mut tx, batch.id, reason).await?;
        let reversal_id = ReversalRepo::insert(&mut tx, batch.id, reason, actor, now).await?;
        let cancelled = SalaryTxnRepo::cancel_open(&mut tx, batch.id, now).await?;

        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::BatchReversed)
                .with_company(batch.company_id)
                .with_batch(batch.id)
                .with_description(format!("{} (cancelled {})", reason, cancelled)),
        );
        self.ctx.record(log);

        tracing::info!(batch_id, cancelled, from = %batch.status, "batch reversed");
        Ok(ReversalSummary {
            batch_id,
            reversal_id,
            cancelled,
        })
    }

    pub async fn reversal_record(&self, batch_id: i64) -> BusinessResult<Option<BatchReversal>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(ReversalRepo::find_by_batch(&mut conn, batch_id).await?)
    }
}

fn retry_guard(batch: &SalaryBatch) -> BusinessResult<BatchStatus> {
    match batch.status {
        BatchStatus::Reversed => Err(BusinessError::BatchReversed { batch_id: batch.id }),
        BatchStatus::Exported | BatchStatus::Completed => Ok(batch.guard(BatchAction::Retry)?),
        other => Err(BusinessError::RetryNotAllowed {
            status: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn batch(status: BatchStatus) -> SalaryBatch {
        SalaryBatch {
            id: 7,
            company_id: 1,
            period: PayrollPeriod::new(2026, 3).unwrap(),
            status,
            reversal_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_retry_guard() {
        assert_eq!(retry_guard(&batch(BatchStatus::Exported)).unwrap(), BatchStatus::Exported);
        assert_eq!(retry_guard(&batch(BatchStatus::Completed)).unwrap(), BatchStatus::Exported);
        assert!(matches!(
            retry_guard(&batch(BatchStatus::Draft)),
            Err(BusinessError::RetryNotAllowed { .. })
        ));
        assert!(matches!(
            retry_guard(&batch(BatchStatus::Reversed)),
            Err(BusinessError::BatchReversed { batch_id: 7 })
        ));
    }
}
