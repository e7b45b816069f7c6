//! Payroll dashboard for one company and period

use crate::exporters::ReportData;
use crate::salary_report::money;
use payroll_business::DashboardFacts;
use payroll_core::TxnStatus;

/// Key figures shown on the operator dashboard
#[derive(Debug, Clone)]
pub struct PayrollDashboard {
    pub title: String,
    pub facts: DashboardFacts,
}

impl PayrollDashboard {
    pub fn new(facts: DashboardFacts) -> Self {
        Self {
            title: format!("{} Payroll Dashboard {}", facts.company.name, facts.period),
            facts,
        }
    }
}

impl ReportData for PayrollDashboard {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        vec!["Metric".to_string(), "Value".to_string()]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let f = &self.facts;
        let mut rows = vec![
            ("Employees", f.total_employees.to_string()),
            ("Active Employees", f.active_employees.to_string()),
            ("Missing Bank Account", f.missing_bank.to_string()),
            ("Pending Bank Changes", f.pending_bank_changes.to_string()),
            ("Pending Profile Changes", f.pending_profile_changes.to_string()),
        ];

        match &f.batch {
            Some(summary) => {
                rows.push(("Batch Status", summary.batch.status.to_string()));
                rows.push(("Total Salary", money(summary.total_amount())));
                rows.push((
                    "Processed Salary",
                    money(summary.amount(TxnStatus::Processed)),
                ));
                rows.push(("Pending", summary.count(TxnStatus::Pending).to_string()));
                rows.push(("On Hold", summary.count(TxnStatus::Hold).to_string()));
                rows.push(("Hold Salary", money(summary.amount(TxnStatus::Hold))));
                rows.push(("Failed", summary.count(TxnStatus::Failed).to_string()));
                rows.push(("Failed Salary", money(summary.amount(TxnStatus::Failed))));
            }
            None => rows.push(("Batch Status", "no batch".to_string())),
        }

        rows.into_iter()
            .map(|(metric, value)| vec![metric.to_string(), value])
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            ("Company".to_string(), self.facts.company.name.clone()),
            ("Site Code".to_string(), self.facts.company.site_code.clone()),
            ("Period".to_string(), self.facts.period.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use payroll_core::{Company, PayrollPeriod};

    #[test]
    fn test_dashboard_without_batch() {
        let dashboard = PayrollDashboard::new(DashboardFacts {
            company: Company {
                id: 1,
                organisation: None,
                name: "Acme".to_string(),
                site_code: "ACM".to_string(),
                is_active: true,
                created_at: Utc::now(),
            },
            period: PayrollPeriod::new(2026, 3).unwrap(),
            total_employees: 4,
            active_employees: 3,
            missing_bank: 1,
            pending_bank_changes: 0,
            pending_profile_changes: 2,
            batch: None,
        });

        assert_eq!(dashboard.title(), "Acme Payroll Dashboard 03/2026");
        let rows = dashboard.rows();
        assert_eq!(rows[1], vec!["Active Employees", "3"]);
        assert_eq!(rows.last().unwrap(), &vec!["Batch Status".to_string(), "no batch".to_string()]);
    }
}
