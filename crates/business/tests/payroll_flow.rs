mod common;

use common::*;
use payroll_business::{
    BankFileLine, BankFileSink, BankLedger, BankResponseRow, BankUploadRow, BatchService,
    BusinessError, BusinessResult, ErrorKind, HoldService, ProfileService, ReconcileService, RecoveryService,
};
use payroll_core::{
    AuditAction, BatchStatus, HoldDecision, HoldReason, ProfileField, SalaryBatch, TxnStatus,
};
use rust_decimal_macros::dec;

fn response(row: usize, code: &str, status: &str, utr: Option<&str>, reason: Option<&str>) -> BankResponseRow {
    BankResponseRow {
        row,
        emp_code: code.to_string(),
        status: status.to_string(),
        utr: utr.map(str::to_string),
        reason: reason.map(str::to_string),
    }
}

/// Bank file writer that always fails
struct DiskFull;

impl BankFileSink for DiskFull {
    fn write(&mut self, _batch: &SalaryBatch, _lines: &[BankFileLine]) -> BusinessResult<()> {
        Err(BusinessError::BankFile("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_salary_without_bank_is_held_until_approval_then_paid() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    let batches = BatchService::new(&h.ctx);

    // Upload without any bank account
    let summary = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    assert!(summary.batch_created);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.held, 1);

    let txns = batches.transactions(summary.batch_id).await.unwrap();
    assert_eq!(txns[0].status, TxnStatus::Hold);
    assert_eq!(txns[0].hold_reason, Some(HoldReason::NoActiveBankAccount));

    // Submit and approve a bank change
    let ledger = BankLedger::new(&h.ctx);
    let request = ledger
        .submit_change_request(h.company_id, "E001", "HDFC", "50100012345", "hdfc0001234", None, "hr")
        .await
        .unwrap();
    let txns = batches.transactions(summary.batch_id).await.unwrap();
    assert_eq!(txns[0].hold_reason, Some(HoldReason::PendingBankChange));

    let change = ledger.approve_request(request.id, ACTOR).await.unwrap();
    assert_eq!(change.reevaluation.released, 1);
    assert_eq!(change.account.routing_code, "HDFC0001234");

    let txns = batches.transactions(summary.batch_id).await.unwrap();
    assert_eq!(txns[0].status, TxnStatus::Pending);
    assert_eq!(txns[0].hold_reason, None);
    assert_eq!(
        txns[0].snapshot.as_ref().map(|s| s.account_number.as_str()),
        Some("50100012345")
    );

    // Finalize and export
    let batch = batches.finalize(h.company_id, march(), ACTOR).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Ready);

    let mut file: Vec<BankFileLine> = Vec::new();
    let export = batches
        .export(h.company_id, march(), &mut file, ACTOR)
        .await
        .unwrap();
    assert_eq!(export.status, BatchStatus::Exported);
    assert_eq!(export.exported, 1);
    assert_eq!(file[0].emp_code, "E001");
    assert_eq!(file[0].amount, dec!(5000));

    // Bank confirms
    let ingest = ReconcileService::new(&h.ctx)
        .ingest(
            h.company_id,
            march(),
            &[response(1, "E001", "success", Some("UTR123"), None)],
            ACTOR,
        )
        .await
        .unwrap();
    assert_eq!(ingest.updated, 1);
    assert!(ingest.completed);

    let txns = batches.transactions(summary.batch_id).await.unwrap();
    assert_eq!(txns[0].status, TxnStatus::Processed);
    assert_eq!(txns[0].utr.as_deref(), Some("UTR123"));
    assert!(txns[0].bank_response_at.is_some());

    let batch = batches.get_batch(h.company_id, march()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(rows_of(&txns, &emp).len(), 1);
}

#[tokio::test]
async fn test_failed_salary_is_retried_without_duplicate_live_rows() {
    let h = harness().await;
    let e = employee(&h, "E001").await;
    let f = employee(&h, "F001").await;
    with_account(&h, &e, "111").await;
    with_account(&h, &f, "222").await;

    let batches = BatchService::new(&h.ctx);
    let reconcile = ReconcileService::new(&h.ctx);
    let recovery = RecoveryService::new(&h.ctx);

    let upload = batches
        .upload_salaries(
            h.company_id,
            march(),
            &[salary(1, "E001", dec!(5000)), salary(2, "F001", dec!(7000))],
            ACTOR,
        )
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();
    let mut file = Vec::new();
    batches.export(h.company_id, march(), &mut file, ACTOR).await.unwrap();
    assert_eq!(file.len(), 2);

    let ingest = reconcile
        .ingest(
            h.company_id,
            march(),
            &[
                response(1, "E001", "SUCCESS", Some("UTR1"), None),
                response(2, "F001", " Failed ", None, Some("account closed")),
            ],
            ACTOR,
        )
        .await
        .unwrap();
    assert_eq!(ingest.updated, 2);
    assert!(ingest.completed);

    let txns = batches.transactions(upload.batch_id).await.unwrap();
    let failed = &rows_of(&txns, &f)[0];
    assert_eq!(failed.status, TxnStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("account closed"));

    // Retry re-opens the batch with a new row for F only
    let retry = recovery.retry_failed(upload.batch_id, ACTOR).await.unwrap();
    assert_eq!(retry.retried, 1);
    let batch = batches.get_batch(h.company_id, march()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Exported);

    let txns = batches.transactions(upload.batch_id).await.unwrap();
    let f_rows = rows_of(&txns, &f);
    assert_eq!(f_rows.len(), 2);
    assert_eq!(f_rows[0].status, TxnStatus::Failed);
    assert_eq!(f_rows[1].status, TxnStatus::Pending);
    assert_eq!(f_rows[1].amount, dec!(7000));
    assert_eq!(f_rows[1].snapshot, failed.snapshot);

    // A second retry finds nothing: F already has a live row
    let again = recovery.retry_failed(upload.batch_id, ACTOR).await.unwrap();
    assert_eq!(again.retried, 0);

    // Re-export only carries the retried row
    let mut file = Vec::new();
    let export = batches.export(h.company_id, march(), &mut file, ACTOR).await.unwrap();
    assert_eq!(export.exported, 1);
    assert_eq!(file[0].emp_code, "F001");

    // Fail again, retry again; at most one live row throughout
    reconcile
        .ingest(h.company_id, march(), &[response(1, "F001", "FAILED", None, None)], ACTOR)
        .await
        .unwrap();
    let txns = batches.transactions(upload.batch_id).await.unwrap();
    assert_eq!(
        rows_of(&txns, &f)[1].failure_reason.as_deref(),
        Some("Bank processing failed")
    );

    recovery.retry_failed(upload.batch_id, ACTOR).await.unwrap();
    let txns = batches.transactions(upload.batch_id).await.unwrap();
    let live = rows_of(&txns, &f).iter().filter(|t| t.is_live()).count();
    assert_eq!(live, 1);
    assert_eq!(rows_of(&txns, &e).len(), 1);
}

#[tokio::test]
async fn test_missing_bank_account_has_lowest_precedence() {
    let h = harness().await;
    employee(&h, "E001").await;

    ProfileService::new(&h.ctx)
        .submit(
            h.company_id,
            "E001",
            vec![(ProfileField::FatherName, Some("Suresh".to_string()))],
            "hr",
        )
        .await
        .unwrap();

    let batches = BatchService::new(&h.ctx);
    let upload = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    let txns = batches.transactions(upload.batch_id).await.unwrap();
    assert_eq!(txns[0].hold_reason, Some(HoldReason::PendingProfileChange));
}

#[tokio::test]
async fn test_joining_after_period_start_is_held() {
    let h = harness().await;
    let emp = employee_joined(&h, "E001", date(2026, 3, 10)).await;
    with_account(&h, &emp, "111").await;

    let decision = HoldService::new(&h.ctx)
        .evaluate_employee(emp.id, march())
        .await
        .unwrap();
    assert_eq!(decision, HoldDecision::Hold(HoldReason::JoinedAfterPayrollMonth));

    let april = march().next();
    let decision = HoldService::new(&h.ctx)
        .evaluate_employee(emp.id, april)
        .await
        .unwrap();
    assert_eq!(decision, HoldDecision::Payable);
}

#[tokio::test]
async fn test_profile_approval_releases_only_profile_holds() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let profiles = ProfileService::new(&h.ctx);
    let request = profiles
        .submit(
            h.company_id,
            "E001",
            vec![(ProfileField::UanNumber, Some("UAN-77".to_string()))],
            "hr",
        )
        .await
        .unwrap();

    let batches = BatchService::new(&h.ctx);
    let upload = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    assert_eq!(upload.held, 1);

    let approval = profiles.approve(request.id, ACTOR).await.unwrap();
    assert_eq!(approval.employee.uan_number.as_deref(), Some("UAN-77"));
    assert_eq!(approval.reevaluation.released, 1);

    let txns = batches.transactions(upload.batch_id).await.unwrap();
    assert_eq!(txns[0].status, TxnStatus::Pending);
    assert!(txns[0].snapshot.is_some());

    let err = profiles.approve(request.id, ACTOR).await.unwrap_err();
    assert!(matches!(err, BusinessError::RequestNotPending { .. }));
}

#[tokio::test]
async fn test_bank_approval_leaves_single_active_account() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let ledger = BankLedger::new(&h.ctx);
    let request = ledger
        .submit_change_request(h.company_id, "E001", "ICICI", "999", "ICIC0000999", None, "hr")
        .await
        .unwrap();

    // Only one pending request per employee
    let err = ledger
        .submit_change_request(h.company_id, "E001", "SBI", "888", "SBIN0000888", None, "hr")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    ledger.approve_request(request.id, ACTOR).await.unwrap();

    let history = ledger.account_history(emp.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|a| a.is_active).count(), 1);

    let active = ledger.get_active_account(emp.id).await.unwrap().unwrap();
    assert_eq!(active.account_number, "999");
    assert_eq!(active.bank_name, "ICICI");
    assert_eq!(active.approved_by.as_deref(), Some(ACTOR));
}

#[tokio::test]
async fn test_wrong_routing_code_length_is_rejected() {
    let h = harness().await;
    employee(&h, "E001").await;

    let err = BankLedger::new(&h.ctx)
        .submit_change_request(h.company_id, "E001", "HDFC", "111", "HDFC01", None, "hr")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_rejected_bank_change_falls_back_to_missing_account_hold() {
    let h = harness().await;
    employee(&h, "E001").await;
    let ledger = BankLedger::new(&h.ctx);
    let batches = BatchService::new(&h.ctx);

    let request = ledger
        .submit_change_request(h.company_id, "E001", "HDFC", "111", ROUTING, None, "hr")
        .await
        .unwrap();
    let upload = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();

    let rejected = ledger.reject_request(request.id, ACTOR, None).await.unwrap();
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Rejected by admin"));

    let txns = batches.transactions(upload.batch_id).await.unwrap();
    assert_eq!(txns[0].status, TxnStatus::Hold);
    assert_eq!(txns[0].hold_reason, Some(HoldReason::NoActiveBankAccount));
}

#[tokio::test]
async fn test_bulk_bank_upload_counts_bad_rows() {
    let h = harness().await;
    employee(&h, "E001").await;
    employee(&h, "E002").await;

    let row = |row, code: &str, account: &str, routing: &str| BankUploadRow {
        row,
        emp_code: code.to_string(),
        account_number: account.to_string(),
        routing_code: routing.to_string(),
    };

    let ledger = BankLedger::new(&h.ctx);
    let summary = ledger
        .bulk_upload(
            h.company_id,
            &[
                row(1, "E001", "111", ROUTING),
                row(2, "E002", "", ROUTING),
                row(3, "E002", "222", "SHORT"),
                row(4, "X999", "333", ROUTING),
                row(5, "", "444", ROUTING),
            ],
            ACTOR,
        )
        .await
        .unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.errors[2].message, "Unknown employee code");

    let missing = ledger.employees_missing_bank(h.company_id).await.unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].emp_code, "E002");

    let emp = &ledger.employees_missing_bank(h.company_id).await.unwrap()[0];
    assert!(ledger.get_active_account(emp.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upload_skips_bad_rows_and_updates_existing() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let batches = BatchService::new(&h.ctx);
    let mut wrong_site = salary(3, "E001", dec!(5000));
    wrong_site.site_code = Some("XYZ".to_string());

    let first = batches
        .upload_salaries(
            h.company_id,
            march(),
            &[
                salary(1, "E001", dec!(5000)),
                salary(2, "E001", dec!(-5)),
                wrong_site,
                salary(4, "NOPE", dec!(100)),
            ],
            ACTOR,
        )
        .await
        .unwrap();
    assert_eq!(first.created, 1);
    assert_eq!(first.skipped, 3);

    let second = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(6500))], ACTOR)
        .await
        .unwrap();
    assert!(!second.batch_created);
    assert_eq!(second.updated, 1);

    let txns = batches.transactions(first.batch_id).await.unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].amount, dec!(6500));
}

#[tokio::test]
async fn test_upload_into_finalized_batch_is_rejected() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let batches = BatchService::new(&h.ctx);
    let upload = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();

    let err = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(9000))], ACTOR)
        .await
        .unwrap_err();
    assert!(err.is_precondition());

    let txns = batches.transactions(upload.batch_id).await.unwrap();
    assert_eq!(txns[0].amount, dec!(5000));
}

#[tokio::test]
async fn test_finalize_preconditions() {
    let h = harness().await;
    employee(&h, "E001").await;
    let batches = BatchService::new(&h.ctx);

    let err = batches.finalize(h.company_id, march(), ACTOR).await.unwrap_err();
    assert!(matches!(err, BusinessError::BatchNotFound { .. }));

    batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    let err = batches.finalize(h.company_id, march(), ACTOR).await.unwrap_err();
    assert!(matches!(err, BusinessError::OutstandingHolds { count: 1 }));

    // Excluding the held row resolves it
    let excluded = batches
        .exclude_transaction(h.company_id, march(), "E001", ACTOR)
        .await
        .unwrap();
    assert_eq!(excluded.status, TxnStatus::Cancelled);

    let batch = batches.finalize(h.company_id, march(), ACTOR).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Ready);
}

#[tokio::test]
async fn test_export_with_missing_snapshot_keeps_status() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let batches = BatchService::new(&h.ctx);
    batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();

    sqlx::query("UPDATE salary_transactions SET account_number = NULL, routing_code = NULL")
        .execute(h.ctx.pool())
        .await
        .unwrap();

    let mut file = Vec::new();
    let err = batches
        .export(h.company_id, march(), &mut file, ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::MissingBankSnapshot { count: 1 }));
    assert!(file.is_empty());

    let batch = batches.get_batch(h.company_id, march()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Ready);
}

#[tokio::test]
async fn test_export_with_non_positive_amount_keeps_status() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let batches = BatchService::new(&h.ctx);
    batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();

    sqlx::query("UPDATE salary_transactions SET salary_amount = '0'")
        .execute(h.ctx.pool())
        .await
        .unwrap();

    let mut file = Vec::new();
    let err = batches
        .export(h.company_id, march(), &mut file, ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::NonPositiveAmount { count: 1 }));
    assert!(err.is_precondition());
    assert!(file.is_empty());

    let batch = batches.get_batch(h.company_id, march()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Ready);
}

#[tokio::test]
async fn test_failed_bank_file_write_keeps_status() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let batches = BatchService::new(&h.ctx);
    batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();

    let err = batches
        .export(h.company_id, march(), &mut DiskFull, ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::BankFile(_)));
    assert_eq!(err.kind(), ErrorKind::Fatal);

    let batch = batches.get_batch(h.company_id, march()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Ready);

    // A working writer still exports afterwards
    let mut file = Vec::new();
    let summary = batches
        .export(h.company_id, march(), &mut file, ACTOR)
        .await
        .unwrap();
    assert_eq!(summary.status, BatchStatus::Exported);
    assert_eq!(file.len(), 1);
}

#[tokio::test]
async fn test_fully_excluded_batch_completes_on_empty_response() {
    let h = harness().await;
    employee(&h, "E001").await;

    let batches = BatchService::new(&h.ctx);
    batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    batches
        .exclude_transaction(h.company_id, march(), "E001", ACTOR)
        .await
        .unwrap();

    // Cancelled rows still count towards finalize; the bank file is empty
    let batch = batches.finalize(h.company_id, march(), ACTOR).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Ready);
    let mut file = Vec::new();
    let export = batches
        .export(h.company_id, march(), &mut file, ACTOR)
        .await
        .unwrap();
    assert_eq!(export.exported, 0);
    assert_eq!(export.status, BatchStatus::Exported);
    assert!(file.is_empty());

    let summary = ReconcileService::new(&h.ctx)
        .ingest(h.company_id, march(), &[], ACTOR)
        .await
        .unwrap();
    assert_eq!(summary.updated, 0);
    assert!(summary.completed);

    let batch = batches.get_batch(h.company_id, march()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
}

#[tokio::test]
async fn test_ingest_requires_exported_batch_and_skips_unmatched() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    let other = employee(&h, "E002").await;
    with_account(&h, &emp, "111").await;
    with_account(&h, &other, "222").await;

    let batches = BatchService::new(&h.ctx);
    let reconcile = ReconcileService::new(&h.ctx);

    let err = reconcile
        .ingest(h.company_id, march(), &[], ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::NoExportedBatch { .. }));

    batches
        .upload_salaries(
            h.company_id,
            march(),
            &[salary(1, "E001", dec!(5000)), salary(2, "E002", dec!(6000))],
            ACTOR,
        )
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();
    batches
        .export(h.company_id, march(), &mut Vec::new(), ACTOR)
        .await
        .unwrap();

    let summary = reconcile
        .ingest(
            h.company_id,
            march(),
            &[
                response(1, "E001", "PAID", None, None),
                response(2, "ZZZ", "SUCCESS", None, None),
                response(3, "E001", "SUCCESS", Some("UTR9"), None),
            ],
            ACTOR,
        )
        .await
        .unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 2);
    assert!(!summary.completed);

    let batch = batches.get_batch(h.company_id, march()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Exported);

    // Resolving the last pending row completes the batch
    let summary = reconcile
        .ingest(
            h.company_id,
            march(),
            &[response(1, "E002", "SUCCESS", Some("UTR10"), None)],
            ACTOR,
        )
        .await
        .unwrap();
    assert!(summary.completed);
}

#[tokio::test]
async fn test_reversal_is_terminal() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let batches = BatchService::new(&h.ctx);
    let recovery = RecoveryService::new(&h.ctx);
    let upload = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();

    let err = recovery.reverse(upload.batch_id, "  ", ACTOR).await.unwrap_err();
    assert!(matches!(err, BusinessError::MissingReason));

    let reversal = recovery
        .reverse(upload.batch_id, "Wrong salary sheet", ACTOR)
        .await
        .unwrap();
    assert_eq!(reversal.cancelled, 1);

    let batch = batches.get_batch(h.company_id, march()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Reversed);
    assert_eq!(batch.reversal_reason.as_deref(), Some("Wrong salary sheet"));

    let record = recovery.reversal_record(upload.batch_id).await.unwrap().unwrap();
    assert_eq!(record.reversed_by, ACTOR);

    let txns = batches.transactions(upload.batch_id).await.unwrap();
    assert_eq!(txns[0].status, TxnStatus::Cancelled);
    assert!(txns[0].bank_response_at.is_some());

    // Everything afterwards is refused
    let export = batches.export(h.company_id, march(), &mut Vec::new(), ACTOR).await;
    assert!(matches!(export, Err(BusinessError::BatchReversed { .. })));
    let finalize = batches.finalize(h.company_id, march(), ACTOR).await;
    assert!(finalize.unwrap_err().is_precondition());
    let retry = recovery.retry_failed(upload.batch_id, ACTOR).await;
    assert!(retry.unwrap_err().is_precondition());
    let again = recovery.reverse(upload.batch_id, "again", ACTOR).await;
    assert!(again.unwrap_err().is_precondition());
    let upload = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await;
    assert!(upload.unwrap_err().is_precondition());
}

#[tokio::test]
async fn test_reversal_keeps_processed_rows() {
    let h = harness().await;
    let mut staff = Vec::new();
    for (code, account) in [("E001", "111"), ("E002", "222"), ("E003", "333")] {
        let emp = employee(&h, code).await;
        with_account(&h, &emp, account).await;
        staff.push(emp);
    }

    let batches = BatchService::new(&h.ctx);
    let upload = batches
        .upload_salaries(
            h.company_id,
            march(),
            &[
                salary(1, "E001", dec!(5000)),
                salary(2, "E002", dec!(6000)),
                salary(3, "E003", dec!(7000)),
            ],
            ACTOR,
        )
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();
    batches
        .export(h.company_id, march(), &mut Vec::new(), ACTOR)
        .await
        .unwrap();
    ReconcileService::new(&h.ctx)
        .ingest(
            h.company_id,
            march(),
            &[
                response(1, "E001", "SUCCESS", Some("UTR1"), None),
                response(2, "E002", "FAILED", None, Some("Account closed")),
            ],
            ACTOR,
        )
        .await
        .unwrap();

    let recovery = RecoveryService::new(&h.ctx);
    let reversal = recovery
        .reverse(upload.batch_id, "Duplicate run", ACTOR)
        .await
        .unwrap();
    assert_eq!(reversal.cancelled, 2);

    let txns = batches.transactions(upload.batch_id).await.unwrap();
    let statuses: Vec<TxnStatus> = staff
        .iter()
        .map(|emp| rows_of(&txns, emp)[0].status)
        .collect();
    assert_eq!(
        statuses,
        vec![TxnStatus::Processed, TxnStatus::Cancelled, TxnStatus::Cancelled]
    );
    assert_eq!(rows_of(&txns, &staff[0])[0].utr.as_deref(), Some("UTR1"));

    let records: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM salary_batch_reversals WHERE batch_id = ?")
            .bind(upload.batch_id)
            .fetch_one(h.ctx.pool())
            .await
            .unwrap();
    assert_eq!(records, 1);
}

#[tokio::test]
async fn test_retry_requires_exported_batch() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let batches = BatchService::new(&h.ctx);
    let upload = batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();

    let err = RecoveryService::new(&h.ctx)
        .retry_failed(upload.batch_id, ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, BusinessError::RetryNotAllowed { .. }));
}

#[tokio::test]
async fn test_duplicate_identifiers_conflict() {
    let h = harness().await;
    employee(&h, "E001").await;

    let err = payroll_business::EmployeeService::new(&h.ctx)
        .register_employee(
            h.company_id,
            payroll_business::EmployeeRegistration::new("E001", "Someone", date(2025, 1, 1)),
            ACTOR,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_operations_are_audited() {
    let h = harness().await;
    let emp = employee(&h, "E001").await;
    with_account(&h, &emp, "111").await;

    let batches = BatchService::new(&h.ctx);
    batches
        .upload_salaries(h.company_id, march(), &[salary(1, "E001", dec!(5000))], ACTOR)
        .await
        .unwrap();
    batches.finalize(h.company_id, march(), ACTOR).await.unwrap();

    let events = h.events().read_all().unwrap();
    let actions: Vec<AuditAction> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::CompanyCreated,
            AuditAction::EmployeeRegistered,
            AuditAction::BankChangeApproved,
            AuditAction::SalaryUploaded,
            AuditAction::BatchFinalized,
        ]
    );
    assert!(events.iter().all(|e| e.event_id.starts_with("EVT_")));
    assert_eq!(events[3].batch_id, events[4].batch_id);
}
