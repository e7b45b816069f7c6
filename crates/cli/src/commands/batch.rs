//! Salary batch commands

use anyhow::{Context, Result};
use payroll_business::{
    BatchService, HoldService, ReconcileService, RecoveryService, ReportingService,
    ServiceContext,
};
use payroll_core::TxnStatus;
use payroll_ingest::{read_bank_response, read_salary_sheet, BankFileOnDisk};
use std::fs::File;
use std::path::Path;

use super::{company_by_site, or_dash, print_row_errors, truncate};
use crate::{BatchAction, BatchTarget};

/// Upload a salary sheet into the DRAFT batch of the period
pub async fn upload(
    ctx: &ServiceContext,
    target: &BatchTarget,
    file: &Path,
    actor: &str,
) -> Result<()> {
    let company = company_by_site(ctx, &target.company).await?;
    let reader = File::open(file).with_context(|| format!("Failed to open {:?}", file))?;
    let rows = read_salary_sheet(reader)?;

    let summary = BatchService::new(ctx)
        .upload_salaries(company.id, target.period, &rows, actor)
        .await?;
    if summary.batch_created {
        println!("📦 Created batch #{} for {}", summary.batch_id, target.period);
    }
    println!("✅ {}", summary);
    print_row_errors(&summary.errors);
    Ok(())
}

/// Apply a bank response file
pub async fn ingest(
    ctx: &ServiceContext,
    target: &BatchTarget,
    file: &Path,
    actor: &str,
) -> Result<()> {
    let company = company_by_site(ctx, &target.company).await?;
    let reader = File::open(file).with_context(|| format!("Failed to open {:?}", file))?;
    let rows = read_bank_response(reader)?;

    let summary = ReconcileService::new(ctx)
        .ingest(company.id, target.period, &rows, actor)
        .await?;
    println!("✅ {}", summary);
    print_row_errors(&summary.errors);
    Ok(())
}

/// Re-open failed salaries for another export
pub async fn retry(ctx: &ServiceContext, target: &BatchTarget, actor: &str) -> Result<()> {
    let company = company_by_site(ctx, &target.company).await?;
    let summary = RecoveryService::new(ctx)
        .retry_failed_for(company.id, target.period, actor)
        .await?;
    if summary.retried == 0 {
        println!("ℹ️  {}", summary);
    } else {
        println!("✅ {}", summary);
    }
    Ok(())
}

/// Handle batch subcommands
pub async fn handle(ctx: &ServiceContext, action: BatchAction, actor: &str) -> Result<()> {
    let batches = BatchService::new(ctx);

    match action {
        BatchAction::Show {
            target,
            transactions,
        } => {
            let company = company_by_site(ctx, &target.company).await?;
            let summary = batches.batch_summary(company.id, target.period).await?;

            println!("📊 {} - {}", company.name, summary.batch);
            if let Some(reason) = &summary.batch.reversal_reason {
                println!("   Reversed: {}", reason);
            }
            println!();
            println!("{:<12} {:>8} {:>16}", "STATUS", "COUNT", "AMOUNT");
            println!("{}", "-".repeat(38));
            for status in TxnStatus::ALL {
                println!(
                    "{:<12} {:>8} {:>16.2}",
                    status.to_string(),
                    summary.count(status),
                    summary.amount(status)
                );
            }
            println!("{}", "-".repeat(38));
            println!(
                "{:<12} {:>8} {:>16.2}",
                "TOTAL",
                summary.total_count(),
                summary.total_amount()
            );

            if transactions {
                let (_, lines) = ReportingService::new(ctx)
                    .batch_lines(company.id, target.period)
                    .await?;
                println!();
                println!(
                    "{:<10} {:<22} {:>12} {:<10} {:<26}",
                    "EMP", "NAME", "AMOUNT", "STATUS", "NOTE"
                );
                println!("{}", "-".repeat(84));
                for line in &lines {
                    let note = match (&line.txn.hold_reason, &line.txn.failure_reason) {
                        (Some(hold), _) => hold.to_string(),
                        (None, Some(failure)) => failure.clone(),
                        (None, None) => or_dash(line.txn.utr.as_deref()).to_string(),
                    };
                    println!(
                        "{:<10} {:<22} {:>12.2} {:<10} {:<26}",
                        line.emp_code,
                        truncate(&line.employee_name, 22),
                        line.txn.amount,
                        line.txn.status.to_string(),
                        truncate(&note, 26)
                    );
                }
            }
        }
        BatchAction::List { company } => {
            let company = company_by_site(ctx, &company).await?;
            let list = batches.list_batches(company.id).await?;
            if list.is_empty() {
                println!("No batches found for {}.", company.site_code);
                return Ok(());
            }
            println!("{:<6} {:<9} {:<10} {:<20}", "ID", "PERIOD", "STATUS", "CREATED");
            println!("{}", "-".repeat(48));
            for batch in &list {
                println!(
                    "{:<6} {:<9} {:<10} {:<20}",
                    batch.id,
                    batch.period.to_string(),
                    batch.status.to_string(),
                    batch.created_at.format("%Y-%m-%d %H:%M").to_string()
                );
            }
        }
        BatchAction::Reevaluate { target } => {
            let company = company_by_site(ctx, &target.company).await?;
            let summary = HoldService::new(ctx)
                .reevaluate_batch(company.id, target.period, actor)
                .await?;
            println!(
                "✅ Holds re-evaluated - Released: {}, Still held: {}",
                summary.released, summary.still_held
            );
        }
        BatchAction::Exclude { target, emp } => {
            let company = company_by_site(ctx, &target.company).await?;
            let txn = batches
                .exclude_transaction(company.id, target.period, &emp, actor)
                .await?;
            println!("✅ Salary of {} ({:.2}) excluded from {}", emp, txn.amount, target.period);
        }
        BatchAction::Finalize { target } => {
            let company = company_by_site(ctx, &target.company).await?;
            let batch = batches.finalize(company.id, target.period, actor).await?;
            println!("✅ {} finalized", batch);
        }
        BatchAction::Export { target, output } => {
            let company = company_by_site(ctx, &target.company).await?;
            let mut sink = BankFileOnDisk::new(&output);
            let summary = batches
                .export(company.id, target.period, &mut sink, actor)
                .await?;
            println!("✅ {}", summary);
            println!("   File:   {:?}", sink.path());
            println!("   Status: {}", summary.status);
        }
        BatchAction::Reverse { target, reason } => {
            let company = company_by_site(ctx, &target.company).await?;
            let summary = RecoveryService::new(ctx)
                .reverse_for(company.id, target.period, &reason, actor)
                .await?;
            println!("✅ Batch #{} reversed", summary.batch_id);
            println!("   Reversal record: #{}", summary.reversal_id);
            println!("   Transactions cancelled: {}", summary.cancelled);
        }
    }

    Ok(())
}
