//! Bank account commands

use anyhow::{Context, Result};
use payroll_business::{BankLedger, EmployeeService, ServiceContext};
use payroll_core::mask_account_number;
use payroll_ingest::{read_bank_sheet, write_missing_bank_template};
use std::fs::File;
use std::io::{self, BufWriter, Write};

use super::{company_by_site, or_dash, print_row_errors, truncate};
use crate::BankAction;

/// Handle bank subcommands
pub async fn handle(ctx: &ServiceContext, action: BankAction, actor: &str) -> Result<()> {
    let ledger = BankLedger::new(ctx);

    match action {
        BankAction::Request {
            company,
            emp,
            bank,
            account,
            routing,
            effective,
        } => {
            let company = company_by_site(ctx, &company).await?;
            let request = ledger
                .submit_change_request(
                    company.id,
                    &emp,
                    &bank,
                    &account,
                    &routing,
                    effective,
                    actor,
                )
                .await?;
            println!("✅ Bank change request #{} submitted for {}", request.id, emp);
            println!("   Account:   {}", mask_account_number(&request.new_account_number));
            println!("   Effective: {}", request.effective_from);
            println!("   Open salaries of {} stay on hold until review", emp);
        }
        BankAction::Approve { request_id } => {
            let change = ledger.approve_request(request_id, actor).await?;
            println!("✅ Request #{} approved", request_id);
            println!(
                "   Active account: {} ({})",
                change.account.masked_number(),
                change.account.routing_code
            );
            println!(
                "   Holds released: {}, still held: {}",
                change.reevaluation.released, change.reevaluation.still_held
            );
        }
        BankAction::Reject { request_id, reason } => {
            let request = ledger
                .reject_request(request_id, actor, reason.as_deref())
                .await?;
            println!("✅ Request #{} rejected", request.id);
            if let Some(reason) = &request.rejection_reason {
                println!("   Reason: {}", reason);
            }
        }
        BankAction::Upload { company, file } => {
            let company = company_by_site(ctx, &company).await?;
            let reader = File::open(&file).with_context(|| format!("Failed to open {:?}", file))?;
            let rows = read_bank_sheet(reader)?;
            let summary = ledger.bulk_upload(company.id, &rows, actor).await?;
            println!("✅ {}", summary);
            if summary.released > 0 {
                println!("   Holds released: {}", summary.released);
            }
            print_row_errors(&summary.errors);
        }
        BankAction::Template { company, output } => {
            let company = company_by_site(ctx, &company).await?;
            let missing = ledger.employees_missing_bank(company.id).await?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {:?}", path))?;
                    write_missing_bank_template(BufWriter::new(file), &company, &missing)?;
                    println!(
                        "✅ Template with {} employee(s) written to {:?}",
                        missing.len(),
                        path
                    );
                }
                None => {
                    let stdout = io::stdout();
                    let mut lock = stdout.lock();
                    write_missing_bank_template(&mut lock, &company, &missing)?;
                    lock.flush()?;
                }
            }
        }
        BankAction::List { company, status } => {
            let company = company_by_site(ctx, &company).await?;
            let requests = ledger.list_requests(company.id, status).await?;
            if requests.is_empty() {
                println!("No bank change requests found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<10} {:<22} {:<14} {:<12} {:<9} {:<10}",
                "ID", "EMP", "NAME", "ACCOUNT", "ROUTING", "EFFECTIVE", "STATUS"
            );
            println!("{}", "-".repeat(88));
            for (request, emp_code, name) in &requests {
                println!(
                    "{:<6} {:<10} {:<22} {:<14} {:<12} {:<9} {:<10}",
                    request.id,
                    emp_code,
                    truncate(name, 22),
                    mask_account_number(&request.new_account_number),
                    request.new_routing_code,
                    request.effective_from.to_string(),
                    request.status.to_string()
                );
            }
            println!("\nTotal: {} requests", requests.len());
        }
        BankAction::Show { company, emp } => {
            let company = company_by_site(ctx, &company).await?;
            let employee = EmployeeService::new(ctx)
                .find_employee(company.id, &emp)
                .await?;
            let history = ledger.account_history(employee.id).await?;

            println!("🏦 Bank accounts of {}", employee);
            if history.is_empty() {
                println!("   No bank account on file");
                return Ok(());
            }
            for account in &history {
                println!(
                    "   {} {:<20} {:<14} {:<12} from {} approved by {}",
                    if account.is_active { "●" } else { "○" },
                    truncate(&account.bank_name, 20),
                    account.masked_number(),
                    account.routing_code,
                    account.effective_from,
                    or_dash(account.approved_by.as_deref())
                );
            }
        }
    }

    Ok(())
}
