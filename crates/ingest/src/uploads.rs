//! Upload sheets to typed rows
//!
//! Only structural problems (unreadable file, missing column) fail here.
//! Bad cell values are passed through for the services to report per row.

use crate::error::IngestResult;
use crate::sheet::{cell, optional_cell, Sheet};
use payroll_business::{BankResponseRow, BankUploadRow, SalaryRow};
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;

/// Salary sheet: `emp_code`, `name`, `salary`, optional `site_code`
pub fn read_salary_sheet<R: Read>(reader: R) -> IngestResult<Vec<SalaryRow>> {
    let sheet = Sheet::read(reader)?;
    let emp_code = sheet.require("emp_code", &[])?;
    let name = sheet.require("name", &[])?;
    let salary = sheet.require("salary", &["amount"])?;
    let site_code = sheet.column(&["site_code"]);

    let rows: Vec<SalaryRow> = sheet
        .rows()
        .map(|(row, record)| SalaryRow {
            row,
            emp_code: cell(record, Some(emp_code)).to_string(),
            name: cell(record, Some(name)).to_string(),
            amount: parse_amount(cell(record, Some(salary))),
            site_code: optional_cell(record, site_code),
        })
        .collect();

    tracing::debug!(rows = rows.len(), "salary sheet read");
    Ok(rows)
}

/// Bank account sheet: `emp_code`, `account_number`, `routing_code` (or `ifsc`)
pub fn read_bank_sheet<R: Read>(reader: R) -> IngestResult<Vec<BankUploadRow>> {
    let sheet = Sheet::read(reader)?;
    let emp_code = sheet.require("emp_code", &[])?;
    let account = sheet.require("account_number", &[])?;
    let routing = sheet.require("routing_code", &["ifsc", "ifsc_code"])?;

    Ok(sheet
        .rows()
        .map(|(row, record)| BankUploadRow {
            row,
            emp_code: cell(record, Some(emp_code)).to_string(),
            account_number: cell(record, Some(account)).to_string(),
            routing_code: cell(record, Some(routing)).to_string(),
        })
        .collect())
}

/// Bank response file: `emp_code`, `status`, optional `utr` and `reason`
pub fn read_bank_response<R: Read>(reader: R) -> IngestResult<Vec<BankResponseRow>> {
    let sheet = Sheet::read(reader)?;
    let emp_code = sheet.require("emp_code", &[])?;
    let status = sheet.require("status", &[])?;
    let utr = sheet.column(&["utr"]);
    let reason = sheet.column(&["reason", "failure_reason"]);

    Ok(sheet
        .rows()
        .map(|(row, record)| BankResponseRow {
            row,
            emp_code: cell(record, Some(emp_code)).to_string(),
            status: cell(record, Some(status)).to_string(),
            utr: optional_cell(record, utr),
            reason: optional_cell(record, reason),
        })
        .collect())
}

/// Spreadsheet exports often carry thousands separators
fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(cleaned.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_salary_sheet() {
        let input = "\
Emp Code,Name,Salary,Site Code
E001,Asha,\"5,000.50\",ACM
E002,Ravi,abc,
";
        let rows = read_salary_sheet(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, Some(dec!(5000.50)));
        assert_eq!(rows[0].site_code.as_deref(), Some("ACM"));
        assert_eq!(rows[1].row, 2);
        assert_eq!(rows[1].amount, None);
        assert_eq!(rows[1].site_code, None);
    }

    #[test]
    fn test_salary_sheet_missing_column() {
        let err = read_salary_sheet("emp_code,name\nE1,A\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn("salary")));
    }

    #[test]
    fn test_bank_sheet_ifsc_alias() {
        let input = "EMP_CODE,Account Number,IFSC\nE001,50100012345,HDFC0001234\n";
        let rows = read_bank_sheet(input.as_bytes()).unwrap();
        assert_eq!(rows[0].routing_code, "HDFC0001234");
        assert_eq!(rows[0].account_number, "50100012345");
    }

    #[test]
    fn test_response_optional_columns() {
        let rows = read_bank_response("emp_code,status\nE001,SUCCESS\n".as_bytes()).unwrap();
        assert_eq!(rows[0].utr, None);
        assert_eq!(rows[0].reason, None);

        let input = "emp_code,status,utr,reason\nE002,FAILED,,account closed\n";
        let rows = read_bank_response(input.as_bytes()).unwrap();
        assert_eq!(rows[0].utr, None);
        assert_eq!(rows[0].reason.as_deref(), Some("account closed"));
    }
}
