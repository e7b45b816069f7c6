//! # Payroll Reports
//!
//! Read-only report views over payroll data and their exporters.
//!
//! ## Exporters
//!
//! - [`CsvExporter`] - CSV format with proper escaping
//! - [`JsonExporter`] - JSON format (pretty or compact)
//! - [`MarkdownExporter`] - Markdown tables for documentation
//!
//! ## Reports
//!
//! - [`BatchSalaryReport`] - one batch in detail, plus a status summary with a TOTAL row
//! - [`yearly_salary_report`] - transactions, monthly summary and year summary as a [`Workbook`]
//! - [`EmployeeLedgerReport`] - salary history of one employee
//! - [`BankChangeReport`] - bank change requests
//! - [`PayrollDashboard`] - company figures for one period
//!
//! ## Example
//!
//! ```rust,ignore
//! use payroll_reports::{BatchSalaryReport, MarkdownExporter, ReportExporter};
//!
//! let (batch, lines) = ReportingService::new(&ctx).batch_lines(company.id, period).await?;
//! let workbook = BatchSalaryReport::new(&company, &batch, lines).workbook();
//! let md = MarkdownExporter::new().with_toc().export_workbook(&workbook);
//! ```

pub mod bank_change_report;
pub mod dashboard;
pub mod exporters;
pub mod salary_report;

pub use bank_change_report::BankChangeReport;
pub use dashboard::PayrollDashboard;
pub use exporters::{CsvExporter, JsonExporter, MarkdownExporter, ReportData, ReportExporter, Workbook};
pub use salary_report::{
    yearly_salary_report, BatchSalaryReport, BatchStatusSummary, EmployeeLedgerReport,
    MonthlySummary, YearSummary, YearTransactions,
};
