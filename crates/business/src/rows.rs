//! Typed upload rows
//!
//! Produced by the spreadsheet adapter; the services never see file formats.
//! `row` is the 1-based data row number, used in row error messages.

use rust_decimal::Decimal;

/// One line of a salary upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryRow {
    pub row: usize,
    pub emp_code: String,
    pub name: String,
    /// `None` when the cell was blank or not a number
    pub amount: Option<Decimal>,
    pub site_code: Option<String>,
}

/// One line of a bulk bank account upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankUploadRow {
    pub row: usize,
    pub emp_code: String,
    pub account_number: String,
    pub routing_code: String,
}

/// One line of a bank response file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankResponseRow {
    pub row: usize,
    pub emp_code: String,
    pub status: String,
    pub utr: Option<String>,
    pub reason: Option<String>,
}
