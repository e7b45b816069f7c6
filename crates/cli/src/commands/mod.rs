//! Subcommand handlers

pub mod audit;
pub mod bank;
pub mod batch;
pub mod company;
pub mod profile;
pub mod report;

use anyhow::Result;
use payroll_business::{EmployeeService, RowError, ServiceContext};
use payroll_core::Company;

/// Look up a company by its site code
pub async fn company_by_site(ctx: &ServiceContext, site_code: &str) -> Result<Company> {
    Ok(EmployeeService::new(ctx).find_company(site_code).await?)
}

/// Print per-row problems of an upload or ingestion
pub fn print_row_errors(errors: &[RowError]) {
    if errors.is_empty() {
        return;
    }
    println!("⚠️  {} row(s) had problems:", errors.len());
    for error in errors.iter().take(20) {
        println!("   {}", error);
    }
    if errors.len() > 20 {
        println!("   ... and {} more", errors.len() - 20);
    }
}

/// Truncate string for display
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

pub fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
