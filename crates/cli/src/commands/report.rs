//! Report commands

use anyhow::{Context, Result};
use payroll_business::{ReportingService, ServiceContext};
use payroll_reports::{
    yearly_salary_report, BankChangeReport, BatchSalaryReport, CsvExporter, EmployeeLedgerReport,
    JsonExporter, MarkdownExporter, PayrollDashboard, ReportData, ReportExporter, Workbook,
};
use std::fs;
use std::path::PathBuf;

use super::company_by_site;
use crate::{ReportFormat, ReportKind};

/// Generate a report
pub async fn generate(
    ctx: &ServiceContext,
    kind: ReportKind,
    format: ReportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let reporting = ReportingService::new(ctx);

    let content = match kind {
        ReportKind::Batch { target } => {
            let company = company_by_site(ctx, &target.company).await?;
            let (batch, lines) = reporting.batch_lines(company.id, target.period).await?;
            export_workbook(&BatchSalaryReport::new(&company, &batch, lines).workbook(), format)
        }
        ReportKind::Yearly { company, year } => {
            let company = company_by_site(ctx, &company).await?;
            let lines = reporting.year_lines(company.id, year).await?;
            export_workbook(&yearly_salary_report(&company, year, lines), format)
        }
        ReportKind::BankChanges {
            company,
            status,
            effective,
        } => {
            let company = company_by_site(ctx, &company).await?;
            let lines = reporting.bank_changes(company.id, status, effective).await?;
            export_report(&BankChangeReport::new(&company, lines), format)
        }
        ReportKind::Dashboard { company, period } => {
            let company = company_by_site(ctx, &company).await?;
            let period = period.unwrap_or_else(|| ctx.current_period());
            let facts = reporting.dashboard(company.id, period).await?;
            export_report(&PayrollDashboard::new(facts), format)
        }
        ReportKind::Ledger { company, emp } => {
            let company = company_by_site(ctx, &company).await?;
            let (employee, lines) = reporting.employee_lines(company.id, &emp).await?;
            export_report(&EmployeeLedgerReport::new(&employee, lines), format)
        }
    };

    match output {
        Some(path) => {
            fs::write(&path, &content).context("Failed to write report file")?;
            println!("✅ Report generated: {:?}", path);
        }
        None => {
            println!("{}", content);
        }
    }

    Ok(())
}

fn exporter(format: ReportFormat) -> Box<dyn ReportExporter> {
    match format {
        ReportFormat::Csv => Box::new(CsvExporter::new()),
        ReportFormat::Json => Box::new(JsonExporter::new()),
        ReportFormat::Markdown => Box::new(MarkdownExporter::new().with_toc()),
    }
}

fn export_report(report: &dyn ReportData, format: ReportFormat) -> String {
    exporter(format).export(report)
}

fn export_workbook(workbook: &Workbook, format: ReportFormat) -> String {
    exporter(format).export_workbook(workbook)
}
