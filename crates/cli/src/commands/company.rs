//! Company and employee commands

use anyhow::Result;
use payroll_business::{EmployeeRegistration, EmployeeService, ServiceContext};

use super::{company_by_site, or_dash, truncate};
use crate::{CompanyAction, EmployeeAction};

/// Handle company subcommands
pub async fn handle_company(ctx: &ServiceContext, action: CompanyAction, actor: &str) -> Result<()> {
    let service = EmployeeService::new(ctx);

    match action {
        CompanyAction::Add {
            name,
            site,
            organisation,
        } => {
            let company = service
                .register_company(organisation.as_deref(), &name, &site, actor)
                .await?;
            println!("✅ Company registered");
            println!("   ID:        {}", company.id);
            println!("   Name:      {}", company.name);
            println!("   Site code: {}", company.site_code);
        }
        CompanyAction::List => {
            let companies = service.list_companies().await?;
            if companies.is_empty() {
                println!("No companies found.");
                return Ok(());
            }

            println!("{:<6} {:<10} {:<28} {:<20} {:<8}", "ID", "SITE", "NAME", "ORGANISATION", "ACTIVE");
            println!("{}", "-".repeat(76));
            for company in &companies {
                println!(
                    "{:<6} {:<10} {:<28} {:<20} {:<8}",
                    company.id,
                    company.site_code,
                    truncate(&company.name, 28),
                    truncate(or_dash(company.organisation.as_deref()), 20),
                    if company.is_active { "yes" } else { "no" }
                );
            }
            println!("\nTotal: {} companies", companies.len());
        }
    }

    Ok(())
}

/// Handle employee subcommands
pub async fn handle_employee(
    ctx: &ServiceContext,
    action: EmployeeAction,
    actor: &str,
) -> Result<()> {
    let service = EmployeeService::new(ctx);

    match action {
        EmployeeAction::Add {
            company,
            code,
            name,
            joining,
            father_name,
            uan,
            esic,
            document,
            salary,
            exit,
        } => {
            let company = company_by_site(ctx, &company).await?;
            let mut registration = EmployeeRegistration::new(&code, &name, joining);
            registration.father_name = father_name;
            registration.uan_number = uan;
            registration.esic_number = esic;
            registration.document_number = document;
            registration.default_salary = salary;
            registration.exit_date = exit;

            let employee = service
                .register_employee(company.id, registration, actor)
                .await?;
            println!("✅ Employee registered: {}", employee);
            println!("   Company: {}", company.name);
            println!("   Joining: {}", employee.joining_date);
        }
        EmployeeAction::List { company } => {
            let company = company_by_site(ctx, &company).await?;
            let employees = service.list_employees(company.id).await?;
            if employees.is_empty() {
                println!("No employees found for {}.", company.site_code);
                return Ok(());
            }

            println!(
                "{:<10} {:<28} {:<12} {:<12} {:<14}",
                "CODE", "NAME", "JOINED", "EXITED", "UAN"
            );
            println!("{}", "-".repeat(80));
            for employee in &employees {
                println!(
                    "{:<10} {:<28} {:<12} {:<12} {:<14}",
                    employee.emp_code,
                    truncate(&employee.name, 28),
                    employee.joining_date.to_string(),
                    employee
                        .exit_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    or_dash(employee.uan_number.as_deref())
                );
            }
            println!("\nTotal: {} employees", employees.len());
        }
    }

    Ok(())
}
