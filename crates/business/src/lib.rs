//! # Payroll Business
//!
//! Business logic layer - bank ledger, hold re-evaluation, salary batch
//! lifecycle, bank response reconciliation, retry and reversal.
//!
//! Every service borrows a [`ServiceContext`] and runs each operation in one
//! SQLite transaction; audit events are appended after the commit.
//!
//! ```rust,ignore
//! use payroll_business::{BatchService, PayrollConfig, ServiceContext};
//!
//! let ctx = ServiceContext::new(&db, PayrollConfig::default().payroll);
//! let summary = BatchService::new(&ctx)
//!     .upload_salaries(company_id, period, &rows, "admin")
//!     .await?;
//! ```

pub mod batch;
pub mod config;
pub mod employee;
pub mod error;
pub mod hold;
pub mod ledger;
pub mod profile;
pub mod reconcile;
pub mod recovery;
pub mod reporting;
pub mod rows;
pub mod services;

pub use batch::{BankFileLine, BankFileSink, BatchService};
pub use config::{ConfigError, PayrollConfig, PayrollSettings};
pub use employee::{EmployeeRegistration, EmployeeService};
pub use error::{BusinessError, BusinessResult, ErrorKind};
pub use hold::HoldService;
pub use ledger::{AccountChange, BankLedger};
pub use profile::{ProfileApproval, ProfileService};
pub use reconcile::ReconcileService;
pub use recovery::RecoveryService;
pub use reporting::{BankChangeLine, DashboardFacts, ReportingService, SalaryLine};
pub use rows::{BankResponseRow, BankUploadRow, SalaryRow};
pub use services::{
    AuditLog, BankUploadSummary, BatchSummary, ExportSummary, IngestSummary, ReevaluationSummary,
    RetrySummary, ReversalSummary, RowError, ServiceContext, StatusTotal, UploadSummary,
};
