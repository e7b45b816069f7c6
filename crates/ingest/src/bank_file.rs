//! Outgoing CSV files: the bank transfer file and the missing-bank template

use crate::error::IngestResult;
use payroll_business::{BankFileLine, BankFileSink, BusinessError, BusinessResult};
use payroll_core::{Company, Employee, SalaryBatch};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct BankFileRecord<'a> {
    emp_code: &'a str,
    name: &'a str,
    account_number: &'a str,
    routing_code: &'a str,
    amount: String,
}

#[derive(Serialize)]
struct TemplateRecord<'a> {
    site_code: &'a str,
    emp_code: &'a str,
    name: &'a str,
    account_number: &'a str,
    routing_code: &'a str,
}

fn write_lines<W: Write>(out: W, lines: &[BankFileLine]) -> Result<(), csv::Error> {
    let mut wrt = csv::Writer::from_writer(out);
    if lines.is_empty() {
        wrt.write_record(["emp_code", "name", "account_number", "routing_code", "amount"])?;
    }
    for line in lines {
        wrt.serialize(BankFileRecord {
            emp_code: &line.emp_code,
            name: &line.name,
            account_number: &line.account_number,
            routing_code: &line.routing_code,
            amount: line.amount.round_dp(2).to_string(),
        })?;
    }
    wrt.flush()?;
    Ok(())
}

/// Bank file written to any `Write`
pub struct CsvBankFile<W: Write> {
    out: W,
}

impl<W: Write> CsvBankFile<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BankFileSink for CsvBankFile<W> {
    fn write(&mut self, batch: &SalaryBatch, lines: &[BankFileLine]) -> BusinessResult<()> {
        write_lines(&mut self.out, lines).map_err(|e| BusinessError::BankFile(e.to_string()))?;
        tracing::debug!(batch_id = batch.id, lines = lines.len(), "bank file written");
        Ok(())
    }
}

/// Bank file created on disk only once the export passed its checks
pub struct BankFileOnDisk {
    path: PathBuf,
}

impl BankFileOnDisk {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BankFileSink for BankFileOnDisk {
    fn write(&mut self, batch: &SalaryBatch, lines: &[BankFileLine]) -> BusinessResult<()> {
        let file = File::create(&self.path).map_err(|e| {
            BusinessError::BankFile(format!("{}: {}", self.path.display(), e))
        })?;
        write_lines(file, lines)
            .map_err(|e| BusinessError::BankFile(format!("{}: {}", self.path.display(), e)))?;
        tracing::info!(batch_id = batch.id, path = %self.path.display(), lines = lines.len(), "bank file written");
        Ok(())
    }
}

/// Correction template pre-filled with employees that have no active account
pub fn write_missing_bank_template<W: Write>(
    out: W,
    company: &Company,
    employees: &[Employee],
) -> IngestResult<()> {
    let mut wrt = csv::Writer::from_writer(out);
    if employees.is_empty() {
        wrt.write_record(["site_code", "emp_code", "name", "account_number", "routing_code"])?;
    }
    for employee in employees {
        wrt.serialize(TemplateRecord {
            site_code: &company.site_code,
            emp_code: &employee.emp_code,
            name: &employee.name,
            account_number: "",
            routing_code: "",
        })?;
    }
    wrt.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use payroll_core::{BatchStatus, PayrollPeriod};
    use rust_decimal_macros::dec;

    fn batch() -> SalaryBatch {
        SalaryBatch {
            id: 7,
            company_id: 1,
            period: PayrollPeriod::new(2026, 3).unwrap(),
            status: BatchStatus::Ready,
            reversal_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_bank_file_layout() {
        let lines = vec![BankFileLine {
            emp_code: "E001".into(),
            name: "Asha, K".into(),
            account_number: "50100012345".into(),
            routing_code: "HDFC0001234".into(),
            amount: dec!(5000),
        }];
        let mut sink = CsvBankFile::new(Vec::new());
        sink.write(&batch(), &lines).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "emp_code,name,account_number,routing_code,amount\n\
             E001,\"Asha, K\",50100012345,HDFC0001234,5000\n"
        );
    }

    #[test]
    fn test_empty_bank_file_has_header() {
        let mut sink = CsvBankFile::new(Vec::new());
        sink.write(&batch(), &[]).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "emp_code,name,account_number,routing_code,amount\n");
    }

    #[test]
    fn test_on_disk_file_created_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = BankFileOnDisk::new(dir.path().join("bank.csv"));
        assert!(!sink.path().exists());
        sink.write(&batch(), &[]).unwrap();
        assert!(sink.path().exists());
    }
}
