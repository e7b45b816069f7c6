//! Company and employee registration
//!
//! EmployeeService is the entry point used by onboarding; duplicate
//! identifiers come back as conflicts instead of database errors.

use crate::error::{BusinessError, BusinessResult};
use crate::ledger::find_employee;
use crate::services::{AuditLog, ServiceContext};
use chrono::NaiveDate;
use payroll_core::{AuditAction, Company, Employee};
use payroll_persistence::{CompanyRepo, EmployeeRepo, NewEmployee};
use rust_decimal::Decimal;

/// Input for registering an employee
#[derive(Debug, Clone)]
pub struct EmployeeRegistration {
    pub emp_code: String,
    pub name: String,
    pub father_name: Option<String>,
    pub uan_number: Option<String>,
    pub esic_number: Option<String>,
    pub document_number: Option<String>,
    pub default_salary: Option<Decimal>,
    pub joining_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
}

impl EmployeeRegistration {
    pub fn new(emp_code: &str, name: &str, joining_date: NaiveDate) -> Self {
        Self {
            emp_code: emp_code.to_string(),
            name: name.to_string(),
            father_name: None,
            uan_number: None,
            esic_number: None,
            document_number: None,
            default_salary: None,
            joining_date,
            exit_date: None,
        }
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Employee Service - company and employee records
pub struct EmployeeService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> EmployeeService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn register_company(
        &self,
        organisation: Option<&str>,
        name: &str,
        site_code: &str,
        actor: &str,
    ) -> BusinessResult<Company> {
        let name = name.trim();
        let site_code = site_code.trim().to_uppercase();
        if name.is_empty() || site_code.is_empty() {
            return Err(BusinessError::InvalidInput(
                "company name and site code are required".to_string(),
            ));
        }

        let mut tx = self.ctx.pool().begin().await?;
        let id = CompanyRepo::insert(&mut tx, organisation, name, &site_code)
            .await
            .map_err(|e| {
                BusinessError::conflict_on_unique(e, format!("site code {} already in use", site_code))
            })?;
        let company = CompanyRepo::get_by_id(&mut tx, id).await?;
        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::CompanyCreated)
                .with_company(company.id)
                .with_description(company.to_string()),
        );
        self.ctx.record(log);

        tracing::info!(company_id = company.id, site_code = %company.site_code, "company registered");
        Ok(company)
    }

    pub async fn register_employee(
        &self,
        company_id: i64,
        registration: EmployeeRegistration,
        actor: &str,
    ) -> BusinessResult<Employee> {
        let emp_code = registration.emp_code.trim().to_string();
        let name = registration.name.trim().to_string();
        if emp_code.is_empty() || name.is_empty() {
            return Err(BusinessError::InvalidInput(
                "employee code and name are required".to_string(),
            ));
        }
        if let Some(salary) = registration.default_salary {
            if salary.is_sign_negative() {
                return Err(BusinessError::InvalidInput(format!(
                    "default salary must not be negative: {}",
                    salary
                )));
            }
        }

        let new = NewEmployee {
            company_id,
            emp_code: emp_code.clone(),
            name,
            father_name: optional(registration.father_name),
            uan_number: optional(registration.uan_number),
            esic_number: optional(registration.esic_number),
            document_number: optional(registration.document_number),
            default_salary: registration.default_salary,
            joining_date: registration.joining_date,
            exit_date: registration.exit_date,
        };

        let mut tx = self.ctx.pool().begin().await?;
        CompanyRepo::get_by_id(&mut tx, company_id).await?;
        let id = EmployeeRepo::insert(&mut tx, &new).await.map_err(|e| {
            BusinessError::conflict_on_unique(
                e,
                format!("employee {} or one of its identifiers already exists", emp_code),
            )
        })?;
        let employee = EmployeeRepo::get_by_id(&mut tx, id).await?;
        tx.commit().await?;

        let mut log = AuditLog::new(actor);
        log.push(
            log.event(AuditAction::EmployeeRegistered)
                .with_company(company_id)
                .with_employee(&employee.emp_code),
        );
        self.ctx.record(log);

        tracing::info!(company_id, emp_code = %employee.emp_code, "employee registered");
        Ok(employee)
    }

    pub async fn get_company(&self, company_id: i64) -> BusinessResult<Company> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(CompanyRepo::get_by_id(&mut conn, company_id).await?)
    }

    /// Company by site code, case-insensitive
    pub async fn find_company(&self, site_code: &str) -> BusinessResult<Company> {
        let mut conn = self.ctx.pool().acquire().await?;
        CompanyRepo::find_by_site_code(&mut conn, site_code)
            .await?
            .ok_or_else(|| BusinessError::not_found("Company", site_code.trim()))
    }

    pub async fn list_companies(&self) -> BusinessResult<Vec<Company>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(CompanyRepo::list(&mut conn).await?)
    }

    pub async fn find_employee(&self, company_id: i64, emp_code: &str) -> BusinessResult<Employee> {
        let mut conn = self.ctx.pool().acquire().await?;
        find_employee(&mut conn, company_id, emp_code).await
    }

    pub async fn list_employees(&self, company_id: i64) -> BusinessResult<Vec<Employee>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(EmployeeRepo::list_by_company(&mut conn, company_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_trims_blank() {
        assert_eq!(optional(Some("  ".to_string())), None);
        assert_eq!(optional(Some(" UAN1 ".to_string())), Some("UAN1".to_string()));
        assert_eq!(optional(None), None);
    }
}
