//! Salary batch lifecycle - upload, finalize, export, exclude
//!
//! Transitions go through [`payroll_core::BatchStatus::apply`]; this module adds the
//! row-level preconditions and runs each operation in one transaction.

use crate::error::{BusinessError, BusinessResult};
use crate::hold::{facts_for, guard, require_batch};
use crate::ledger::find_employee;
use crate::rows::SalaryRow;
use crate::services::{
    AuditLog, BatchSummary, ExportSummary, RowError, ServiceContext, StatusTotal, UploadSummary,
};
use payroll_core::{
    evaluate, AuditAction, BatchAction, Company, HoldDecision, PayrollPeriod, SalaryBatch,
    SalaryTransaction, TxnAction, TxnStatus,
};
use payroll_persistence::{BatchRepo, CompanyRepo, EmployeeRepo, NewTransaction, SalaryTxnRepo};
use rust_decimal::Decimal;

/// One line of the bank file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankFileLine {
    pub emp_code: String,
    pub name: String,
    pub account_number: String,
    pub routing_code: String,
    pub amount: Decimal,
}

/// Destination of the bank file written on export.
///
/// Called inside the export transaction; an error aborts the export.
pub trait BankFileSink {
    fn write(&mut self, batch: &SalaryBatch, lines: &[BankFileLine]) -> BusinessResult<()>;
}

/// Keeps the lines in memory
impl BankFileSink for Vec<BankFileLine> {
    fn write(&mut self, _batch: &SalaryBatch, lines: &[BankFileLine]) -> BusinessResult<()> {
        self.extend_from_slice(lines);
        Ok(())
    }
}

/// Salary batch service
pub struct BatchService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BatchService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn get_batch(&self, company_id: i64, period: PayrollPeriod) -> BusinessResult<SalaryBatch> {
        let mut conn = self.ctx.pool().acquire().await?;
        require_batch(&mut conn, company_id, period).await
    }

    pub async fn list_batches(&self, company_id: i64) -> BusinessResult<Vec<SalaryBatch>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(BatchRepo::list_by_company(&mut conn, company_id).await?)
    }

    pub async fn transactions(&self, batch_id: i64) -> BusinessResult<Vec<SalaryTransaction>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(SalaryTxnRepo::list_by_batch(&mut conn, batch_id).await?)
    }

    /// Upload salaries into the DRAFT batch of the period, creating it on first upload.
    ///
    /// Bad rows are skipped and reported; a batch past DRAFT rejects the whole upload.
    pub async fn upload_salaries(
        &self,
        company_id: i64,
        period: PayrollPeriod,
        rows: &[SalaryRow],
        actor: &str,
    ) -> BusinessResult<UploadSummary> {
        let mut tx = self.ctx.pool().begin().await?;

        let company = CompanyRepo::get_by_id(&mut tx, company_id).await?;

        let (batch, batch_created) = match BatchRepo::find(&mut tx, company_id, period).await? {
            Some(batch) => (batch, false),
            None => {
                let id = BatchRepo::insert(&mut tx, company_id, period).await?;
                (BatchRepo::get_by_id(&mut tx, id).await?, true)
            }
        };
        guard(&batch, BatchAction::Upload)?;

        let today = self.ctx.today();
        let mut summary = UploadSummary {
            batch_id: batch.id,
            batch_created,
            created: 0,
            updated: 0,
            held: 0,
            skipped: 0,
            errors: Vec::new(),
        };

        for row in rows {
            let emp_code = row.emp_code.trim();

            let amount = match validate_salary_row(row, &company) {
                Ok(amount) => amount,
                Err(message) => {
                    tracing::warn!(row = row.row, emp_code, %message, "salary row skipped");
                    summary.skipped += 1;
                    summary.errors.push(RowError::new(row.row, emp_code, message));
                    continue;
                }
            };

            let Some(employee) = EmployeeRepo::find_by_code(&mut tx, company_id, emp_code).await?
            else {
                tracing::warn!(row = row.row, emp_code, "salary row has unknown employee");
                summary.skipped += 1;
                summary
                    .errors
                    .push(RowError::new(row.row, emp_code, "Unknown employee code"));
                continue;
            };

            let (facts, active) = facts_for(&mut tx, &employee).await?;
            let decision = evaluate(&facts, period, today);
            let snapshot = active.as_ref().map(|a| a.snapshot());
            let action = match decision {
                HoldDecision::Payable => TxnAction::UploadPayable,
                HoldDecision::Hold(_) => TxnAction::UploadHeld,
            };

            match SalaryTxnRepo::find_reusable(&mut tx, batch.id, employee.id).await? {
                Some(existing) => {
                    let status = existing.status.apply(action)?;
                    SalaryTxnRepo::update_upload(
                        &mut tx,
                        existing.id,
                        amount,
                        snapshot.as_ref(),
                        status,
                        decision.reason(),
                    )
                    .await?;
                    summary.updated += 1;
                }
                None => {
                    let status = if decision.is_held() {
                        TxnStatus::Hold
                    } else {
                        TxnStatus::Pending
                    };
                    SalaryTxnRepo::insert(
                        &mut tx,
                        &NewTransaction {
                            batch_id: batch.id,
                            employee_id: employee.id,
                            amount,
                            snapshot,
                            status,
                            hold_reason: decision.reason(),
                        },
                    )
                    .await?;
                    summary.created += 1;
                }
            }

            if let HoldDecision::Hold(reason) = decision {
                tracing::debug!(emp_code, %reason, "salary held");
                summary.held += 1;
            }
        }

        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::SalaryUploaded)
                .with_company(company_id)
                .with_batch(batch.id)
                .with_description(format!(
                    "{}: created {}, updated {}, held {}, skipped {}",
                    period, summary.created, summary.updated, summary.held, summary.skipped
                )),
        );
        self.ctx.record(log);

        tracing::info!(
            company_id,
            %period,
            batch_id = batch.id,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "salaries uploaded"
        );
        Ok(summary)
    }

    /// DRAFT -> READY. Needs at least one transaction and no HOLD rows.
    pub async fn finalize(
        &self,
        company_id: i64,
        period: PayrollPeriod,
        actor: &str,
    ) -> BusinessResult<SalaryBatch> {
        let mut tx = self.ctx.pool().begin().await?;

        let batch = require_batch(&mut tx, company_id, period).await?;
        let next = guard(&batch, BatchAction::Finalize)?;

        let transactions = SalaryTxnRepo::list_by_batch(&mut tx, batch.id).await?;
        if transactions.is_empty() {
            tracing::warn!(batch_id = batch.id, "finalize rejected: empty batch");
            return Err(BusinessError::EmptyBatch);
        }
        let held = transactions
            .iter()
            .filter(|t| t.status == TxnStatus::Hold)
            .count();
        if held > 0 {
            tracing::warn!(batch_id = batch.id, held, "finalize rejected: salaries on hold");
            return Err(BusinessError::OutstandingHolds { count: held });
        }

        BatchRepo::set_status(&mut tx, batch.id, next).await?;
        let batch = BatchRepo::get_by_id(&mut tx, batch.id).await?;
        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::BatchFinalized)
                .with_company(company_id)
                .with_batch(batch.id)
                .with_description(format!("{} transactions", transactions.len())),
        );
        self.ctx.record(log);

        tracing::info!(company_id, %period, batch_id = batch.id, "batch finalized");
        Ok(batch)
    }

    /// READY/EXPORTED -> EXPORTED. Writes the PENDING rows to `sink` before committing.
    pub async fn export(
        &self,
        company_id: i64,
        period: PayrollPeriod,
        sink: &mut dyn BankFileSink,
        actor: &str,
    ) -> BusinessResult<ExportSummary> {
        let mut tx = self.ctx.pool().begin().await?;

        let batch = require_batch(&mut tx, company_id, period).await?;
        let next = guard(&batch, BatchAction::Export)?;

        let pending =
            SalaryTxnRepo::details_by_batch_and_status(&mut tx, batch.id, TxnStatus::Pending).await?;

        let mut lines = Vec::with_capacity(pending.len());
        let mut missing_snapshot = 0;
        let mut non_positive = 0;
        for row in &pending {
            let amount = row.amount()?;
            if amount <= Decimal::ZERO {
                non_positive += 1;
            }
            match (&row.txn.account_number, &row.txn.routing_code) {
                (Some(account_number), Some(routing_code)) => lines.push(BankFileLine {
                    emp_code: row.emp_code.clone(),
                    name: row.employee_name.clone(),
                    account_number: account_number.clone(),
                    routing_code: routing_code.clone(),
                    amount,
                }),
                _ => missing_snapshot += 1,
            }
        }
        if missing_snapshot > 0 {
            tracing::warn!(batch_id = batch.id, missing_snapshot, "export rejected");
            return Err(BusinessError::MissingBankSnapshot {
                count: missing_snapshot,
            });
        }
        if non_positive > 0 {
            tracing::warn!(batch_id = batch.id, non_positive, "export rejected");
            return Err(BusinessError::NonPositiveAmount {
                count: non_positive,
            });
        }

        sink.write(&batch, &lines)?;

        BatchRepo::set_status(&mut tx, batch.id, next).await?;
        tx.commit().await?;

        let summary = ExportSummary {
            batch_id: batch.id,
            exported: lines.len(),
            total_amount: lines.iter().map(|l| l.amount).sum(),
            status: next,
        };

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::BatchExported)
                .with_company(company_id)
                .with_batch(batch.id)
                .with_description(format!(
                    "{} salaries, total {}",
                    summary.exported, summary.total_amount
                )),
        );
        self.ctx.record(log);

        tracing::info!(
            company_id,
            %period,
            batch_id = batch.id,
            exported = summary.exported,
            "bank file exported"
        );
        Ok(summary)
    }

    /// Cancel the employee's live row in a DRAFT batch
    pub async fn exclude_transaction(
        &self,
        company_id: i64,
        period: PayrollPeriod,
        emp_code: &str,
        actor: &str,
    ) -> BusinessResult<SalaryTransaction> {
        let mut tx = self.ctx.pool().begin().await?;

        let batch = require_batch(&mut tx, company_id, period).await?;
        guard(&batch, BatchAction::Exclude)?;

        let employee = find_employee(&mut tx, company_id, emp_code).await?;
        let txn = SalaryTxnRepo::find_reusable(&mut tx, batch.id, employee.id)
            .await?
            .filter(SalaryTransaction::is_live)
            .ok_or_else(|| BusinessError::not_found("SalaryTransaction", &employee.emp_code))?;

        let status = txn.status.apply(TxnAction::Exclude)?;
        SalaryTxnRepo::set_status(&mut tx, txn.id, status).await?;
        let txn = SalaryTxnRepo::get_by_id(&mut tx, txn.id).await?;
        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::TransactionExcluded)
                .with_company(company_id)
                .with_batch(batch.id)
                .with_employee(&employee.emp_code),
        );
        self.ctx.record(log);

        tracing::info!(batch_id = batch.id, emp_code = %employee.emp_code, "transaction excluded");
        Ok(txn)
    }

    /// Counts and amounts per transaction status
    pub async fn batch_summary(
        &self,
        company_id: i64,
        period: PayrollPeriod,
    ) -> BusinessResult<BatchSummary> {
        let mut conn = self.ctx.pool().acquire().await?;
        let batch = require_batch(&mut conn, company_id, period).await?;
        let transactions = SalaryTxnRepo::list_by_batch(&mut conn, batch.id).await?;
        Ok(summarize(batch, &transactions))
    }
}

/// Amount of a usable row, or the message for skipping it
fn validate_salary_row(row: &SalaryRow, company: &Company) -> Result<Decimal, String> {
    if row.emp_code.trim().is_empty() {
        return Err("Missing employee code".to_string());
    }
    let amount = match row.amount {
        None => return Err("Invalid salary amount".to_string()),
        Some(amount) if amount <= Decimal::ZERO => {
            return Err(format!("Salary must be positive, got {}", amount))
        }
        Some(amount) => amount,
    };
    if !company.matches_site(row.site_code.as_deref()) {
        return Err(format!(
            "Site code {} does not belong to {}",
            row.site_code.as_deref().unwrap_or_default(),
            company.site_code
        ));
    }
    Ok(amount)
}

pub(crate) fn summarize(batch: SalaryBatch, transactions: &[SalaryTransaction]) -> BatchSummary {
    let totals = TxnStatus::ALL
        .iter()
        .filter_map(|&status| {
            let rows: Vec<&SalaryTransaction> =
                transactions.iter().filter(|t| t.status == status).collect();
            (!rows.is_empty()).then(|| StatusTotal {
                status,
                count: rows.len(),
                amount: rows.iter().map(|t| t.amount).sum(),
            })
        })
        .collect();
    BatchSummary { batch, totals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use payroll_core::BatchStatus;
    use rust_decimal_macros::dec;

    fn company() -> Company {
        Company {
            id: 1,
            organisation: None,
            name: "Acme".to_string(),
            site_code: "ACM".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn row(amount: Option<Decimal>, site: Option<&str>) -> SalaryRow {
        SalaryRow {
            row: 1,
            emp_code: "E001".to_string(),
            name: "Asha".to_string(),
            amount,
            site_code: site.map(str::to_string),
        }
    }

    #[test]
    fn test_salary_row_validation() {
        assert_eq!(validate_salary_row(&row(Some(dec!(5000)), None), &company()), Ok(dec!(5000)));
        assert!(validate_salary_row(&row(Some(dec!(5000)), Some("acm")), &company()).is_ok());
        assert!(validate_salary_row(&row(Some(dec!(0)), None), &company()).is_err());
        assert!(validate_salary_row(&row(None, None), &company()).is_err());

        let err = validate_salary_row(&row(Some(dec!(5000)), Some("XYZ")), &company()).unwrap_err();
        assert!(err.contains("XYZ"));
    }

    #[test]
    fn test_summarize_skips_empty_statuses() {
        let batch = SalaryBatch {
            id: 1,
            company_id: 1,
            period: PayrollPeriod::new(2026, 3).unwrap(),
            status: BatchStatus::Exported,
            reversal_reason: None,
            created_at: Utc::now(),
        };
        let txn = |id, status, amount| SalaryTransaction {
            id,
            batch_id: 1,
            employee_id: id,
            amount,
            snapshot: None,
            status,
            hold_reason: None,
            failure_reason: None,
            utr: None,
            bank_response_at: None,
            created_at: Utc::now(),
        };
        let summary = summarize(
            batch,
            &[
                txn(1, TxnStatus::Processed, dec!(1000)),
                txn(2, TxnStatus::Processed, dec!(2000)),
                txn(3, TxnStatus::Failed, dec!(500)),
            ],
        );
        assert_eq!(summary.totals.len(), 2);
        assert_eq!(summary.amount(TxnStatus::Processed), dec!(3000));
        assert_eq!(summary.count(TxnStatus::Failed), 1);
    }
}
