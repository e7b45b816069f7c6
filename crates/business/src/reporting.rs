//! Read models for reports and the dashboard

use crate::batch::summarize;
use crate::error::BusinessResult;
use crate::hold::require_batch;
use crate::ledger::find_employee;
use crate::services::{BatchSummary, ServiceContext};
use payroll_core::{
    BankChangeRequest, Company, Employee, PayrollPeriod, RequestStatus, SalaryBatch,
    SalaryTransaction,
};
use payroll_persistence::{
    BankChangeRepo, BatchRepo, CompanyRepo, EmployeeRepo, ProfileChangeRepo, SalaryTxnRepo,
    TransactionDetailRow,
};

/// A salary transaction with its employee and period
#[derive(Debug, Clone)]
pub struct SalaryLine {
    pub emp_code: String,
    pub employee_name: String,
    pub period: PayrollPeriod,
    pub txn: SalaryTransaction,
}

impl TryFrom<TransactionDetailRow> for SalaryLine {
    type Error = crate::error::BusinessError;

    fn try_from(row: TransactionDetailRow) -> BusinessResult<Self> {
        let period = row.period()?;
        Ok(Self {
            emp_code: row.emp_code,
            employee_name: row.employee_name,
            period,
            txn: row.txn.try_into()?,
        })
    }
}

fn lines(rows: Vec<TransactionDetailRow>) -> BusinessResult<Vec<SalaryLine>> {
    rows.into_iter().map(SalaryLine::try_from).collect()
}

/// A bank change request with the employee it belongs to
#[derive(Debug, Clone)]
pub struct BankChangeLine {
    pub emp_code: String,
    pub employee_name: String,
    pub request: BankChangeRequest,
}

/// Company-level counters for one period
#[derive(Debug, Clone)]
pub struct DashboardFacts {
    pub company: Company,
    pub period: PayrollPeriod,
    pub total_employees: usize,
    pub active_employees: usize,
    pub missing_bank: usize,
    pub pending_bank_changes: usize,
    pub pending_profile_changes: usize,
    /// `None` when no batch exists for the period
    pub batch: Option<BatchSummary>,
}

/// Report queries
pub struct ReportingService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReportingService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Batch of the period with all its transactions, ordered by employee code
    pub async fn batch_lines(
        &self,
        company_id: i64,
        period: PayrollPeriod,
    ) -> BusinessResult<(SalaryBatch, Vec<SalaryLine>)> {
        let mut conn = self.ctx.pool().acquire().await?;
        let batch = require_batch(&mut conn, company_id, period).await?;
        let rows = SalaryTxnRepo::details_by_batch(&mut conn, batch.id).await?;
        Ok((batch, lines(rows)?))
    }

    /// Every transaction of the company's batches in `year`, by month
    pub async fn year_lines(&self, company_id: i64, year: i32) -> BusinessResult<Vec<SalaryLine>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let rows = SalaryTxnRepo::details_for_company_year(&mut conn, company_id, year).await?;
        lines(rows)
    }

    /// Salary history of one employee, newest period first
    pub async fn employee_lines(
        &self,
        company_id: i64,
        emp_code: &str,
    ) -> BusinessResult<(Employee, Vec<SalaryLine>)> {
        let mut conn = self.ctx.pool().acquire().await?;
        let employee = find_employee(&mut conn, company_id, emp_code).await?;
        let rows = SalaryTxnRepo::details_for_employee(&mut conn, employee.id).await?;
        Ok((employee, lines(rows)?))
    }

    /// Bank change requests, optionally narrowed to a status and an effective period
    pub async fn bank_changes(
        &self,
        company_id: i64,
        status: Option<RequestStatus>,
        effective_from: Option<PayrollPeriod>,
    ) -> BusinessResult<Vec<BankChangeLine>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let requests = BankChangeRepo::list_by_company(&mut conn, company_id, status).await?;
        Ok(requests
            .into_iter()
            .filter(|(request, _, _)| effective_from.map_or(true, |p| request.effective_from == p))
            .map(|(request, emp_code, employee_name)| BankChangeLine {
                emp_code,
                employee_name,
                request,
            })
            .collect())
    }

    pub async fn dashboard(
        &self,
        company_id: i64,
        period: PayrollPeriod,
    ) -> BusinessResult<DashboardFacts> {
        let mut conn = self.ctx.pool().acquire().await?;

        let company = CompanyRepo::get_by_id(&mut conn, company_id).await?;
        let employees = EmployeeRepo::list_by_company(&mut conn, company_id).await?;
        let missing_bank = EmployeeRepo::list_without_active_account(&mut conn, company_id)
            .await?
            .len();
        let pending_bank_changes =
            BankChangeRepo::list_by_company(&mut conn, company_id, Some(RequestStatus::Pending))
                .await?
                .len();
        let pending_profile_changes = ProfileChangeRepo::list_pending(&mut conn, company_id)
            .await?
            .len();

        let batch = match BatchRepo::find(&mut conn, company_id, period).await? {
            Some(batch) => {
                let transactions = SalaryTxnRepo::list_by_batch(&mut conn, batch.id).await?;
                Some(summarize(batch, &transactions))
            }
            None => None,
        };

        Ok(DashboardFacts {
            company,
            period,
            total_employees: employees.len(),
            active_employees: employees.iter().filter(|e| !e.has_exited()).count(),
            missing_bank,
            pending_bank_changes,
            pending_profile_changes,
            batch,
        })
    }
}
