//! Profile change commands

use anyhow::{anyhow, Result};
use payroll_business::{EmployeeService, ProfileService, ServiceContext};
use payroll_core::ProfileField;

use super::{company_by_site, or_dash};
use crate::ProfileAction;

/// Parse `--set field=value` and `--clear field` into requested values
fn requested_values(
    set: &[String],
    clear: &[String],
) -> Result<Vec<(ProfileField, Option<String>)>> {
    let mut values = Vec::with_capacity(set.len() + clear.len());
    for pair in set {
        let (field, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{}'", pair))?;
        values.push((field.parse::<ProfileField>()?, Some(value.to_string())));
    }
    for field in clear {
        values.push((field.parse::<ProfileField>()?, None));
    }
    Ok(values)
}

/// Handle profile subcommands
pub async fn handle(ctx: &ServiceContext, action: ProfileAction, actor: &str) -> Result<()> {
    let service = ProfileService::new(ctx);

    match action {
        ProfileAction::Request {
            company,
            emp,
            set,
            clear,
        } => {
            let company = company_by_site(ctx, &company).await?;
            let values = requested_values(&set, &clear)?;
            let request = service.submit(company.id, &emp, values, actor).await?;
            println!("✅ Profile change request #{} submitted for {}", request.id, emp);
            for change in &request.changes {
                println!(
                    "   {:<16} {} -> {}",
                    change.field,
                    or_dash(change.old.as_deref()),
                    or_dash(change.new.as_deref())
                );
            }
        }
        ProfileAction::Approve { request_id } => {
            let approval = service.approve(request_id, actor).await?;
            println!("✅ Request #{} approved for {}", request_id, approval.employee);
            println!(
                "   Holds released: {}, still held: {}",
                approval.reevaluation.released, approval.reevaluation.still_held
            );
        }
        ProfileAction::Reject { request_id, reason } => {
            let reevaluation = service
                .reject(request_id, actor, reason.as_deref())
                .await?;
            println!("✅ Request #{} rejected", request_id);
            println!(
                "   Holds released: {}, still held: {}",
                reevaluation.released, reevaluation.still_held
            );
        }
        ProfileAction::List { company } => {
            let company = company_by_site(ctx, &company).await?;
            let requests = service.list_pending(company.id).await?;
            if requests.is_empty() {
                println!("No pending profile changes.");
                return Ok(());
            }

            let employees = EmployeeService::new(ctx).list_employees(company.id).await?;
            for request in &requests {
                let emp_code = employees
                    .iter()
                    .find(|e| e.id == request.employee_id)
                    .map_or("?", |e| e.emp_code.as_str());
                println!(
                    "#{} {} requested by {} at {}",
                    request.id,
                    emp_code,
                    request.requested_by,
                    request.requested_at.format("%Y-%m-%d %H:%M")
                );
                for change in &request.changes {
                    println!(
                        "   {:<16} {} -> {}",
                        change.field,
                        or_dash(change.old.as_deref()),
                        or_dash(change.new.as_deref())
                    );
                }
            }
            println!("\nTotal: {} pending", requests.len());
        }
    }

    Ok(())
}
