//! # Employee Module
//!
//! Approved employee master data and typed profile change requests.
//!
//! Profile edits never touch an [`Employee`] directly: they are submitted as a
//! [`ProfileChangeRequest`] holding a list of [`FieldChange`]s over the closed
//! [`ProfileField`] set, and applied only on approval.

use crate::error::{CoreError, CoreResult};
use crate::request::RequestStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Approved employee record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub company_id: i64,
    /// Employee code, unique within the company
    pub emp_code: String,
    pub name: String,
    pub father_name: Option<String>,
    pub uan_number: Option<String>,
    pub esic_number: Option<String>,
    pub document_number: Option<String>,
    pub default_salary: Option<Decimal>,
    pub joining_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    /// Current value of a profile field, rendered as text
    pub fn field_value(&self, field: ProfileField) -> Option<String> {
        match field {
            ProfileField::Name => Some(self.name.clone()),
            ProfileField::FatherName => self.father_name.clone(),
            ProfileField::UanNumber => self.uan_number.clone(),
            ProfileField::EsicNumber => self.esic_number.clone(),
            ProfileField::DocumentNumber => self.document_number.clone(),
            ProfileField::DefaultSalary => self.default_salary.map(|d| d.to_string()),
            ProfileField::ExitDate => self.exit_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Apply one approved change. Values are validated per field.
    pub fn apply_change(&mut self, change: &FieldChange) -> CoreResult<()> {
        let new = change
            .new
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match change.field {
            ProfileField::Name => {
                let name = new.ok_or_else(|| invalid(change.field, ""))?;
                self.name = name.to_string();
            }
            ProfileField::FatherName => self.father_name = new.map(str::to_string),
            ProfileField::UanNumber => self.uan_number = new.map(str::to_string),
            ProfileField::EsicNumber => self.esic_number = new.map(str::to_string),
            ProfileField::DocumentNumber => self.document_number = new.map(str::to_string),
            ProfileField::DefaultSalary => {
                self.default_salary = match new {
                    None => None,
                    Some(v) => {
                        let amount = Decimal::from_str(v).map_err(|_| invalid(change.field, v))?;
                        if amount.is_sign_negative() {
                            return Err(invalid(change.field, v));
                        }
                        Some(amount)
                    }
                };
            }
            ProfileField::ExitDate => {
                self.exit_date = match new {
                    None => None,
                    Some(v) => Some(
                        NaiveDate::parse_from_str(v, "%Y-%m-%d")
                            .map_err(|_| invalid(change.field, v))?,
                    ),
                };
            }
        }
        Ok(())
    }

    /// Apply all changes of a request, stopping at the first invalid one
    pub fn apply_changes(&mut self, changes: &[FieldChange]) -> CoreResult<()> {
        for change in changes {
            self.apply_change(change)?;
        }
        Ok(())
    }

    pub fn has_exited(&self) -> bool {
        self.exit_date.is_some()
    }
}

fn invalid(field: ProfileField, value: &str) -> CoreError {
    CoreError::InvalidProfileValue {
        field: field.as_str().to_string(),
        value: value.to_string(),
    }
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.emp_code, self.name)
    }
}

/// Employee profile fields that may be changed through a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    FatherName,
    UanNumber,
    EsicNumber,
    DocumentNumber,
    DefaultSalary,
    ExitDate,
}

impl ProfileField {
    pub const ALL: [ProfileField; 7] = [
        ProfileField::Name,
        ProfileField::FatherName,
        ProfileField::UanNumber,
        ProfileField::EsicNumber,
        ProfileField::DocumentNumber,
        ProfileField::DefaultSalary,
        ProfileField::ExitDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::FatherName => "father_name",
            ProfileField::UanNumber => "uan_number",
            ProfileField::EsicNumber => "esic_number",
            ProfileField::DocumentNumber => "document_number",
            ProfileField::DefaultSalary => "default_salary",
            ProfileField::ExitDate => "exit_date",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        ProfileField::ALL
            .into_iter()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| CoreError::UnknownProfileField(s.to_string()))
    }
}

/// One `(field, old, new)` entry of a profile change request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: ProfileField,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl FieldChange {
    /// Build a change against the employee's current value
    pub fn against(employee: &Employee, field: ProfileField, new: Option<String>) -> Self {
        Self {
            field,
            old: employee.field_value(field),
            new,
        }
    }

    /// A change that would leave the value as it is
    pub fn is_noop(&self) -> bool {
        let norm = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        norm(&self.old) == norm(&self.new)
    }
}

/// Pending or reviewed profile change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileChangeRequest {
    pub id: i64,
    pub employee_id: i64,
    pub changes: Vec<FieldChange>,
    pub status: RequestStatus,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn employee() -> Employee {
        Employee {
            id: 1,
            company_id: 1,
            emp_code: "E001".to_string(),
            name: "Rahul".to_string(),
            father_name: Some("Suresh".to_string()),
            uan_number: None,
            esic_number: None,
            document_number: None,
            default_salary: Some(dec!(15000)),
            joining_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            exit_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_field_parse() {
        assert_eq!("father_name".parse::<ProfileField>().unwrap(), ProfileField::FatherName);
        assert_eq!(" EXIT_DATE ".parse::<ProfileField>().unwrap(), ProfileField::ExitDate);
        assert!("salary".parse::<ProfileField>().is_err());
    }

    #[test]
    fn test_apply_changes() {
        let mut emp = employee();
        let changes = vec![
            FieldChange::against(&emp, ProfileField::Name, Some("Rahul Kumar".to_string())),
            FieldChange::against(&emp, ProfileField::DefaultSalary, Some("18000.50".to_string())),
            FieldChange::against(&emp, ProfileField::ExitDate, Some("2026-03-31".to_string())),
        ];
        assert_eq!(changes[0].old.as_deref(), Some("Rahul"));

        emp.apply_changes(&changes).unwrap();
        assert_eq!(emp.name, "Rahul Kumar");
        assert_eq!(emp.default_salary, Some(dec!(18000.50)));
        assert!(emp.has_exited());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut emp = employee();
        let bad_date = FieldChange::against(&emp, ProfileField::ExitDate, Some("31/03/2026".to_string()));
        assert!(emp.apply_change(&bad_date).is_err());

        let empty_name = FieldChange::against(&emp, ProfileField::Name, Some(" ".to_string()));
        assert!(emp.apply_change(&empty_name).is_err());

        let negative = FieldChange::against(&emp, ProfileField::DefaultSalary, Some("-1".to_string()));
        assert!(emp.apply_change(&negative).is_err());
        assert_eq!(emp.name, "Rahul");
    }

    #[test]
    fn test_blank_clears_optional_field() {
        let mut emp = employee();
        let change = FieldChange::against(&emp, ProfileField::FatherName, Some(String::new()));
        emp.apply_change(&change).unwrap();
        assert_eq!(emp.father_name, None);
    }

    #[test]
    fn test_noop_detection() {
        let emp = employee();
        assert!(FieldChange::against(&emp, ProfileField::Name, Some("Rahul".to_string())).is_noop());
        assert!(FieldChange::against(&emp, ProfileField::UanNumber, Some("".to_string())).is_noop());
        assert!(!FieldChange::against(&emp, ProfileField::UanNumber, Some("1001".to_string())).is_noop());
    }
}
