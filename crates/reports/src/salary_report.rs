//! Salary reports - batch report, yearly report, employee ledger

use crate::exporters::{ReportData, Workbook};
use chrono::{DateTime, Utc};
use payroll_business::SalaryLine;
use payroll_core::{Company, Employee, PayrollPeriod, SalaryBatch, TxnStatus};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

pub(crate) fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn sum_where(lines: &[SalaryLine], status: TxnStatus) -> Decimal {
    lines
        .iter()
        .filter(|l| l.txn.status == status)
        .map(|l| l.txn.amount)
        .sum()
}

fn total(lines: &[SalaryLine]) -> Decimal {
    lines.iter().map(|l| l.txn.amount).sum()
}

// ============================================================================
// Batch Salary Report
// ============================================================================

/// Every transaction of one batch
#[derive(Debug, Clone)]
pub struct BatchSalaryReport {
    pub title: String,
    pub site_code: String,
    pub company: String,
    pub batch: SalaryBatch,
    pub lines: Vec<SalaryLine>,
    pub generated_at: DateTime<Utc>,
}

impl BatchSalaryReport {
    pub fn new(company: &Company, batch: &SalaryBatch, lines: Vec<SalaryLine>) -> Self {
        Self {
            title: format!("{} Salary Report {}", company.name, batch.period),
            site_code: company.site_code.clone(),
            company: company.name.clone(),
            batch: batch.clone(),
            lines,
            generated_at: Utc::now(),
        }
    }

    /// Detail and status summary as one workbook
    pub fn workbook(self) -> Workbook {
        let summary = BatchStatusSummary::from_lines(&self.lines);
        Workbook::new(&self.title)
            .with_section(self)
            .with_section(summary)
    }
}

impl ReportData for BatchSalaryReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        [
            "Site Code",
            "Company",
            "Emp Code",
            "Employee Name",
            "Salary",
            "Status",
            "Hold Reason",
            "Account Number",
            "Routing Code",
            "UTR",
            "Failure Reason",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.lines
            .iter()
            .map(|l| {
                let snapshot = l.txn.snapshot.as_ref();
                vec![
                    self.site_code.clone(),
                    self.company.clone(),
                    l.emp_code.clone(),
                    l.employee_name.clone(),
                    money(l.txn.amount),
                    l.txn.status.to_string(),
                    l.txn.hold_reason.map(|r| r.to_string()).unwrap_or_default(),
                    snapshot.map(|s| s.account_number.clone()).unwrap_or_default(),
                    snapshot.map(|s| s.routing_code.clone()).unwrap_or_default(),
                    l.txn.utr.clone().unwrap_or_default(),
                    l.txn.failure_reason.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            ("Period".to_string(), self.batch.period.to_string()),
            ("Batch Status".to_string(), self.batch.status.to_string()),
            ("Transactions".to_string(), self.lines.len().to_string()),
            ("Total Salary".to_string(), money(total(&self.lines))),
            ("Generated At".to_string(), self.generated_at.to_rfc3339()),
        ]
    }
}

/// Count and amount per status, closed by a TOTAL row
#[derive(Debug, Clone)]
pub struct BatchStatusSummary {
    pub totals: Vec<(TxnStatus, usize, Decimal)>,
}

impl BatchStatusSummary {
    pub fn from_lines(lines: &[SalaryLine]) -> Self {
        let totals = TxnStatus::ALL
            .iter()
            .filter_map(|&status| {
                let count = lines.iter().filter(|l| l.txn.status == status).count();
                (count > 0).then(|| (status, count, sum_where(lines, status)))
            })
            .collect();
        Self { totals }
    }
}

impl ReportData for BatchStatusSummary {
    fn title(&self) -> &str {
        "Summary"
    }

    fn headers(&self) -> Vec<String> {
        vec![
            "Status".to_string(),
            "Total Employees".to_string(),
            "Total Salary".to_string(),
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = self
            .totals
            .iter()
            .map(|(status, count, amount)| {
                vec![status.to_string(), count.to_string(), money(*amount)]
            })
            .collect();

        let count: usize = self.totals.iter().map(|t| t.1).sum();
        let amount: Decimal = self.totals.iter().map(|t| t.2).sum();
        rows.push(vec!["TOTAL".to_string(), count.to_string(), money(amount)]);
        rows
    }

    fn summary(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

// ============================================================================
// Yearly Salary Report
// ============================================================================

/// Sheet 1: every transaction of the year
#[derive(Debug, Clone)]
pub struct YearTransactions {
    pub lines: Vec<SalaryLine>,
}

impl ReportData for YearTransactions {
    fn title(&self) -> &str {
        "Transactions"
    }

    fn headers(&self) -> Vec<String> {
        ["Month", "Emp Code", "Employee Name", "Salary", "Status"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.lines
            .iter()
            .map(|l| {
                vec![
                    l.period.month().to_string(),
                    l.emp_code.clone(),
                    l.employee_name.clone(),
                    money(l.txn.amount),
                    l.txn.status.to_string(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Sheet 2: per month total plus the amount of each status seen in the year
#[derive(Debug, Clone)]
pub struct MonthlySummary {
    pub statuses: Vec<TxnStatus>,
    pub months: BTreeMap<u32, (Decimal, HashMap<TxnStatus, Decimal>)>,
}

impl MonthlySummary {
    pub fn from_lines(lines: &[SalaryLine]) -> Self {
        let statuses: Vec<TxnStatus> = TxnStatus::ALL
            .into_iter()
            .filter(|s| lines.iter().any(|l| l.txn.status == *s))
            .collect();

        let mut months: BTreeMap<u32, (Decimal, HashMap<TxnStatus, Decimal>)> = BTreeMap::new();
        for line in lines {
            let entry = months.entry(line.period.month()).or_default();
            entry.0 += line.txn.amount;
            *entry.1.entry(line.txn.status).or_default() += line.txn.amount;
        }

        Self { statuses, months }
    }
}

impl ReportData for MonthlySummary {
    fn title(&self) -> &str {
        "Monthly Summary"
    }

    fn headers(&self) -> Vec<String> {
        let mut headers = vec!["Month".to_string(), "Total Salary".to_string()];
        headers.extend(self.statuses.iter().map(|s| s.to_string()));
        headers
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.months
            .iter()
            .map(|(month, (month_total, by_status))| {
                let mut row = vec![month.to_string(), money(*month_total)];
                row.extend(self.statuses.iter().map(|s| {
                    money(by_status.get(s).copied().unwrap_or(Decimal::ZERO))
                }));
                row
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Sheet 3: totals for the whole year
#[derive(Debug, Clone)]
pub struct YearSummary {
    pub transactions: usize,
    pub total: Decimal,
    pub processed: Decimal,
    pub hold: Decimal,
    pub failed: Decimal,
}

impl YearSummary {
    pub fn from_lines(lines: &[SalaryLine]) -> Self {
        Self {
            transactions: lines.len(),
            total: total(lines),
            processed: sum_where(lines, TxnStatus::Processed),
            hold: sum_where(lines, TxnStatus::Hold),
            failed: sum_where(lines, TxnStatus::Failed),
        }
    }
}

impl ReportData for YearSummary {
    fn title(&self) -> &str {
        "Year Summary"
    }

    fn headers(&self) -> Vec<String> {
        [
            "Total Transactions",
            "Total Salary",
            "Processed Salary",
            "Hold Salary",
            "Failed Salary",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        vec![vec![
            self.transactions.to_string(),
            money(self.total),
            money(self.processed),
            money(self.hold),
            money(self.failed),
        ]]
    }

    fn summary(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Transactions, monthly summary and year summary of one company
pub fn yearly_salary_report(company: &Company, year: i32, lines: Vec<SalaryLine>) -> Workbook {
    let monthly = MonthlySummary::from_lines(&lines);
    let year_summary = YearSummary::from_lines(&lines);
    Workbook::new(&format!("{} Yearly Salary Report {}", company.name, year))
        .with_section(YearTransactions { lines })
        .with_section(monthly)
        .with_section(year_summary)
}

// ============================================================================
// Employee Salary Ledger
// ============================================================================

/// Salary history of one employee
#[derive(Debug, Clone)]
pub struct EmployeeLedgerReport {
    pub title: String,
    pub lines: Vec<SalaryLine>,
}

impl EmployeeLedgerReport {
    pub fn new(employee: &Employee, lines: Vec<SalaryLine>) -> Self {
        Self {
            title: format!("Salary Ledger {} {}", employee.emp_code, employee.name),
            lines,
        }
    }

    pub fn periods(&self) -> Vec<PayrollPeriod> {
        self.lines.iter().map(|l| l.period).collect()
    }
}

impl ReportData for EmployeeLedgerReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        ["Period", "Salary", "Status", "Hold Reason", "UTR", "Failure Reason"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.lines
            .iter()
            .map(|l| {
                vec![
                    l.period.to_string(),
                    money(l.txn.amount),
                    l.txn.status.to_string(),
                    l.txn.hold_reason.map(|r| r.to_string()).unwrap_or_default(),
                    l.txn.utr.clone().unwrap_or_default(),
                    l.txn.failure_reason.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            ("Total Amount".to_string(), money(total(&self.lines))),
            (
                "Processed Amount".to_string(),
                money(sum_where(&self.lines, TxnStatus::Processed)),
            ),
            (
                "Pending Amount".to_string(),
                money(sum_where(&self.lines, TxnStatus::Pending)),
            ),
            (
                "Hold Amount".to_string(),
                money(sum_where(&self.lines, TxnStatus::Hold)),
            ),
            (
                "Failed Amount".to_string(),
                money(sum_where(&self.lines, TxnStatus::Failed)),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporters::{CsvExporter, ReportExporter};
    use payroll_core::{BankSnapshot, BatchStatus, HoldReason, SalaryTransaction};
    use rust_decimal_macros::dec;

    fn company() -> Company {
        Company {
            id: 1,
            organisation: None,
            name: "Acme".to_string(),
            site_code: "ACM".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn line(id: i64, code: &str, month: u32, amount: Decimal, status: TxnStatus) -> SalaryLine {
        SalaryLine {
            emp_code: code.to_string(),
            employee_name: format!("Employee {}", code),
            period: PayrollPeriod::new(2026, month).unwrap(),
            txn: SalaryTransaction {
                id,
                batch_id: month as i64,
                employee_id: id,
                amount,
                snapshot: Some(BankSnapshot {
                    account_number: "111".to_string(),
                    routing_code: "HDFC0001234".to_string(),
                }),
                status,
                hold_reason: (status == TxnStatus::Hold).then_some(HoldReason::PendingBankChange),
                failure_reason: None,
                utr: None,
                bank_response_at: None,
                created_at: Utc::now(),
            },
        }
    }

    fn batch() -> SalaryBatch {
        SalaryBatch {
            id: 3,
            company_id: 1,
            period: PayrollPeriod::new(2026, 3).unwrap(),
            status: BatchStatus::Draft,
            reversal_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_summary_has_total_row() {
        let lines = vec![
            line(1, "E001", 3, dec!(5000), TxnStatus::Pending),
            line(2, "E002", 3, dec!(2500.5), TxnStatus::Pending),
            line(3, "E003", 3, dec!(1000), TxnStatus::Hold),
        ];
        let rows = BatchStatusSummary::from_lines(&lines).rows();
        assert_eq!(
            rows,
            vec![
                vec!["PENDING".to_string(), "2".to_string(), "7500.50".to_string()],
                vec!["HOLD".to_string(), "1".to_string(), "1000.00".to_string()],
                vec!["TOTAL".to_string(), "3".to_string(), "8500.50".to_string()],
            ]
        );
    }

    #[test]
    fn test_batch_report_rows() {
        let lines = vec![line(1, "E001", 3, dec!(5000), TxnStatus::Hold)];
        let report = BatchSalaryReport::new(&company(), &batch(), lines);
        let row = &report.rows()[0];
        assert_eq!(row[0], "ACM");
        assert_eq!(row[6], "Pending bank change");
        assert_eq!(report.title(), "Acme Salary Report 03/2026");

        let workbook = report.workbook();
        assert_eq!(workbook.sections().len(), 2);
        let csv = CsvExporter::new().export_workbook(&workbook);
        assert!(csv.contains("TOTAL,1,5000.00"));
    }

    #[test]
    fn test_yearly_report() {
        let lines = vec![
            line(1, "E001", 1, dec!(100), TxnStatus::Processed),
            line(2, "E002", 1, dec!(50), TxnStatus::Failed),
            line(3, "E001", 2, dec!(100), TxnStatus::Processed),
        ];

        let monthly = MonthlySummary::from_lines(&lines);
        assert_eq!(
            monthly.headers(),
            vec!["Month", "Total Salary", "PROCESSED", "FAILED"]
        );
        assert_eq!(monthly.rows()[0], vec!["1", "150.00", "100.00", "50.00"]);
        assert_eq!(monthly.rows()[1], vec!["2", "100.00", "100.00", "0.00"]);

        let summary = YearSummary::from_lines(&lines);
        assert_eq!(summary.total, dec!(250));
        assert_eq!(summary.failed, dec!(50));
        assert_eq!(summary.hold, Decimal::ZERO);

        let workbook = yearly_salary_report(&company(), 2026, lines);
        let titles: Vec<&str> = workbook.sections().iter().map(|s| s.title()).collect();
        assert_eq!(titles, vec!["Transactions", "Monthly Summary", "Year Summary"]);
    }

    #[test]
    fn test_employee_ledger_totals() {
        let employee_lines = vec![
            line(2, "E001", 2, dec!(100), TxnStatus::Pending),
            line(1, "E001", 1, dec!(100), TxnStatus::Processed),
        ];
        let employee = Employee {
            id: 1,
            company_id: 1,
            emp_code: "E001".to_string(),
            name: "Asha".to_string(),
            father_name: None,
            uan_number: None,
            esic_number: None,
            document_number: None,
            default_salary: None,
            joining_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            exit_date: None,
            created_at: Utc::now(),
        };
        let report = EmployeeLedgerReport::new(&employee, employee_lines);
        let summary = report.summary();
        assert_eq!(summary[0], ("Total Amount".to_string(), "200.00".to_string()));
        assert_eq!(summary[1].1, "100.00");
        assert_eq!(report.periods()[0].month(), 2);
    }
}
