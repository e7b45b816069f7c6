//! # Payroll Ingest
//!
//! CSV adapter between spreadsheets and the payroll services.
//!
//! - [`read_salary_sheet`], [`read_bank_sheet`], [`read_bank_response`] turn
//!   uploads into typed rows
//! - [`CsvBankFile`] / [`BankFileOnDisk`] receive the bank file on export
//! - [`write_missing_bank_template`] produces the correction sheet

pub mod bank_file;
pub mod error;
pub mod sheet;
pub mod uploads;

pub use bank_file::{write_missing_bank_template, BankFileOnDisk, CsvBankFile};
pub use error::{IngestError, IngestResult};
pub use sheet::{normalize_header, Sheet};
pub use uploads::{read_bank_response, read_bank_sheet, read_salary_sheet};
