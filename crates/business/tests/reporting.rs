mod common;

use common::*;
use payroll_business::{BankLedger, BatchService, ProfileService, ReportingService};
use payroll_core::{PayrollPeriod, ProfileField, RequestStatus, TxnStatus};
use rust_decimal_macros::dec;

/// E001 payable, E002 held with a pending bank change
async fn march_batch(h: &Harness) {
    let paid = employee(h, "E001").await;
    with_account(h, &paid, "111").await;
    employee(h, "E002").await;

    BatchService::new(&h.ctx)
        .upload_salaries(
            h.company_id,
            march(),
            &[salary(1, "E002", dec!(4000)), salary(2, "E001", dec!(5000))],
            ACTOR,
        )
        .await
        .unwrap();

    BankLedger::new(&h.ctx)
        .submit_change_request(h.company_id, "E002", "HDFC", "222", ROUTING, None, ACTOR)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_batch_lines_are_ordered_by_employee() {
    let h = harness().await;
    march_batch(&h).await;

    let (batch, lines) = ReportingService::new(&h.ctx)
        .batch_lines(h.company_id, march())
        .await
        .unwrap();

    assert_eq!(batch.period, march());
    let codes: Vec<&str> = lines.iter().map(|l| l.emp_code.as_str()).collect();
    assert_eq!(codes, vec!["E001", "E002"]);
    assert_eq!(lines[0].employee_name, "Employee E001");
    assert_eq!(lines[0].txn.status, TxnStatus::Pending);
    assert_eq!(lines[1].txn.status, TxnStatus::Hold);
    assert!(lines.iter().all(|l| l.period == march()));
}

#[tokio::test]
async fn test_year_and_employee_lines() {
    let h = harness().await;
    march_batch(&h).await;
    let reporting = ReportingService::new(&h.ctx);

    assert_eq!(reporting.year_lines(h.company_id, 2026).await.unwrap().len(), 2);
    assert!(reporting.year_lines(h.company_id, 2025).await.unwrap().is_empty());

    let (employee, lines) = reporting.employee_lines(h.company_id, "E001").await.unwrap();
    assert_eq!(employee.emp_code, "E001");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].txn.amount, dec!(5000));

    let err = reporting
        .employee_lines(h.company_id, "E999")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("E999"));
}

#[tokio::test]
async fn test_bank_change_filters() {
    let h = harness().await;
    march_batch(&h).await;
    let reporting = ReportingService::new(&h.ctx);

    let all = reporting.bank_changes(h.company_id, None, None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].emp_code, "E002");
    assert_eq!(all[0].request.status, RequestStatus::Pending);

    assert!(reporting
        .bank_changes(h.company_id, Some(RequestStatus::Approved), None)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        reporting
            .bank_changes(h.company_id, None, Some(march()))
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(reporting
        .bank_changes(h.company_id, None, Some(march().next()))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_dashboard_counts() {
    let h = harness().await;
    march_batch(&h).await;
    ProfileService::new(&h.ctx)
        .submit(
            h.company_id,
            "E001",
            vec![(ProfileField::UanNumber, Some("100200300".to_string()))],
            ACTOR,
        )
        .await
        .unwrap();
    let reporting = ReportingService::new(&h.ctx);

    let facts = reporting.dashboard(h.company_id, march()).await.unwrap();
    assert_eq!(facts.company.site_code, "ACM");
    assert_eq!(facts.total_employees, 2);
    assert_eq!(facts.active_employees, 2);
    assert_eq!(facts.missing_bank, 1);
    assert_eq!(facts.pending_bank_changes, 1);
    assert_eq!(facts.pending_profile_changes, 1);

    let summary = facts.batch.unwrap();
    // Submitting a request only re-evaluates rows already on hold
    assert_eq!(summary.count(TxnStatus::Pending), 1);
    assert_eq!(summary.count(TxnStatus::Hold), 1);
    assert_eq!(summary.total_amount(), dec!(9000));

    let april = PayrollPeriod::new(2026, 4).unwrap();
    let empty = reporting.dashboard(h.company_id, april).await.unwrap();
    assert!(empty.batch.is_none());
}
