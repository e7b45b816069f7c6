//! Ingest errors

use payroll_business::BusinessError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("file has no header row")]
    EmptyFile,
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Any file that cannot be read as a whole is an invalid file
impl From<IngestError> for BusinessError {
    fn from(err: IngestError) -> Self {
        BusinessError::InvalidFile(err.to_string())
    }
}
