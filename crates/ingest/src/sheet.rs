//! Header-normalised CSV sheet
//!
//! Headers are trimmed, lower-cased and have inner spaces replaced by
//! underscores, so "Emp Code", "emp_code" and " EMP CODE " name one column.

use crate::error::{IngestError, IngestResult};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;

/// Normalise a header cell
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// A parsed sheet: normalised headers plus data records
#[derive(Debug)]
pub struct Sheet {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Sheet {
    pub fn read<R: Read>(reader: R) -> IngestResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(IngestError::EmptyFile);
        }

        let mut records = Vec::new();
        for record in rdr.records() {
            records.push(record?);
        }

        Ok(Self { headers, records })
    }

    /// Index of the first header matching one of `names`
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .find_map(|name| self.headers.iter().position(|h| h == name))
    }

    /// Like [`Sheet::column`], but a missing column makes the file invalid
    pub fn require(&self, name: &'static str, aliases: &[&str]) -> IngestResult<usize> {
        let mut names = vec![name];
        names.extend_from_slice(aliases);
        self.column(&names).ok_or(IngestError::MissingColumn(name))
    }

    /// Non-blank data records with their 1-based data row number
    pub fn rows(&self) -> impl Iterator<Item = (usize, &StringRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.iter().any(|cell| !cell.is_empty()))
            .map(|(i, record)| (i + 1, record))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

/// Trimmed cell text, empty when the column is absent or the row is short
pub fn cell(record: &StringRecord, column: Option<usize>) -> &str {
    column
        .and_then(|c| record.get(c))
        .map(str::trim)
        .unwrap_or("")
}

/// Cell text, `None` when blank
pub fn optional_cell(record: &StringRecord, column: Option<usize>) -> Option<String> {
    let value = cell(record, column);
    (!value.is_empty()).then(|| value.to_string())
}
