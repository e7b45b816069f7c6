#![allow(dead_code)]

use chrono::NaiveDate;
use payroll_business::{
    BankLedger, EmployeeRegistration, EmployeeService, PayrollSettings, SalaryRow, ServiceContext,
};
use payroll_core::{BankAccountDetails, Employee, PayrollPeriod, RoutingCode, SalaryTransaction};
use payroll_persistence::{memory_pool, EventReader, EventStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

pub const ACTOR: &str = "admin";
pub const ROUTING: &str = "HDFC0001234";

pub struct Harness {
    pub ctx: ServiceContext,
    pub company_id: i64,
    events_dir: TempDir,
}

impl Harness {
    pub fn events(&self) -> EventReader {
        EventReader::new(self.events_dir.path())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn march() -> PayrollPeriod {
    PayrollPeriod::new(2026, 3).unwrap()
}

/// Fresh database with company "ACM"; today is 2026-03-15
pub async fn harness() -> Harness {
    let events_dir = TempDir::new().unwrap();
    let pool = memory_pool().await.unwrap();
    let store = Arc::new(EventStore::new(events_dir.path()).unwrap());
    let ctx = ServiceContext::from_parts(pool, store, PayrollSettings::default())
        .with_today(date(2026, 3, 15));

    let company = EmployeeService::new(&ctx)
        .register_company(Some("Acme Group"), "Acme", "ACM", ACTOR)
        .await
        .unwrap();

    Harness {
        ctx,
        company_id: company.id,
        events_dir,
    }
}

pub async fn employee(h: &Harness, code: &str) -> Employee {
    employee_joined(h, code, date(2025, 1, 1)).await
}

pub async fn employee_joined(h: &Harness, code: &str, joining: NaiveDate) -> Employee {
    EmployeeService::new(&h.ctx)
        .register_employee(
            h.company_id,
            EmployeeRegistration::new(code, &format!("Employee {}", code), joining),
            ACTOR,
        )
        .await
        .unwrap()
}

/// Give the employee an active account outside the request workflow
pub async fn with_account(h: &Harness, employee: &Employee, account: &str) {
    let details = BankAccountDetails::new(
        "HDFC",
        account,
        RoutingCode::parse(ROUTING).unwrap(),
        march(),
    )
    .unwrap();
    BankLedger::new(&h.ctx)
        .apply_change(employee.id, &details, ACTOR)
        .await
        .unwrap();
}

pub fn salary(row: usize, code: &str, amount: Decimal) -> SalaryRow {
    SalaryRow {
        row,
        emp_code: code.to_string(),
        name: format!("Employee {}", code),
        amount: Some(amount),
        site_code: None,
    }
}

/// Transactions of one employee in a batch, oldest first
pub fn rows_of(txns: &[SalaryTransaction], employee: &Employee) -> Vec<SalaryTransaction> {
    txns.iter()
        .filter(|t| t.employee_id == employee.id)
        .cloned()
        .collect()
}
