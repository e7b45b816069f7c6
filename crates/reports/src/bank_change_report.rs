//! Bank change request report

use crate::exporters::ReportData;
use payroll_business::BankChangeLine;
use payroll_core::{Company, RequestStatus};

/// Bank change requests of one company
#[derive(Debug, Clone)]
pub struct BankChangeReport {
    pub title: String,
    pub company: String,
    pub lines: Vec<BankChangeLine>,
}

impl BankChangeReport {
    pub fn new(company: &Company, lines: Vec<BankChangeLine>) -> Self {
        Self {
            title: format!("{} Bank Change Report", company.name),
            company: company.name.clone(),
            lines,
        }
    }

    fn count(&self, status: RequestStatus) -> usize {
        self.lines
            .iter()
            .filter(|l| l.request.status == status)
            .count()
    }
}

impl ReportData for BankChangeReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        [
            "Company",
            "Emp Code",
            "Employee Name",
            "New Bank",
            "New Account",
            "Routing Code",
            "Effective From",
            "Status",
            "Submitted By",
            "Approved By",
            "Rejection Reason",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.lines
            .iter()
            .map(|l| {
                let r = &l.request;
                vec![
                    self.company.clone(),
                    l.emp_code.clone(),
                    l.employee_name.clone(),
                    r.new_bank_name.clone(),
                    r.new_account_number.clone(),
                    r.new_routing_code.clone(),
                    r.effective_from.to_string(),
                    r.status.to_string(),
                    r.submitted_by.clone(),
                    r.approved_by.clone().unwrap_or_default(),
                    r.rejection_reason.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            ("Requests".to_string(), self.lines.len().to_string()),
            ("Pending".to_string(), self.count(RequestStatus::Pending).to_string()),
            ("Approved".to_string(), self.count(RequestStatus::Approved).to_string()),
            ("Rejected".to_string(), self.count(RequestStatus::Rejected).to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use payroll_core::{BankChangeRequest, PayrollPeriod};

    #[test]
    fn test_rows_and_counts() {
        let company = Company {
            id: 1,
            organisation: None,
            name: "Acme".to_string(),
            site_code: "ACM".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        let request = BankChangeRequest {
            id: 4,
            employee_id: 9,
            new_bank_name: "HDFC".to_string(),
            new_account_number: "50100012345".to_string(),
            new_routing_code: "HDFC0001234".to_string(),
            effective_from: PayrollPeriod::new(2026, 4).unwrap(),
            status: RequestStatus::Rejected,
            submitted_by: "hr".to_string(),
            approved_by: Some("admin".to_string()),
            submitted_at: Utc::now(),
            approved_at: Some(Utc::now()),
            rejection_reason: Some("Wrong account".to_string()),
        };
        let report = BankChangeReport::new(
            &company,
            vec![BankChangeLine {
                emp_code: "E001".to_string(),
                employee_name: "Asha".to_string(),
                request,
            }],
        );

        let row = &report.rows()[0];
        assert_eq!(row[6], "04/2026");
        assert_eq!(row[7], "REJECTED");
        assert_eq!(row[10], "Wrong account");
        assert_eq!(report.summary()[3], ("Rejected".to_string(), "1".to_string()));
    }
}
