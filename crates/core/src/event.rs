//! # Event Module
//!
//! Audit events for every state-changing payroll operation.
//! Events are appended to JSONL files after the database transaction commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of operation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // === Master data ===
    CompanyCreated,
    EmployeeRegistered,

    // === Bank ledger ===
    BankChangeSubmitted,
    BankChangeApproved,
    BankChangeRejected,
    BankBulkUpload,

    // === Profile changes ===
    ProfileChangeSubmitted,
    ProfileChangeApproved,
    ProfileChangeRejected,

    // === Batch lifecycle ===
    SalaryUploaded,
    TransactionExcluded,
    HoldsReevaluated,
    BatchFinalized,
    BatchExported,
    BankResponseIngested,
    BatchCompleted,
    FailedRetried,
    BatchReversed,
}

impl AuditAction {
    pub const ALL: [AuditAction; 18] = [
        AuditAction::CompanyCreated,
        AuditAction::EmployeeRegistered,
        AuditAction::BankChangeSubmitted,
        AuditAction::BankChangeApproved,
        AuditAction::BankChangeRejected,
        AuditAction::BankBulkUpload,
        AuditAction::ProfileChangeSubmitted,
        AuditAction::ProfileChangeApproved,
        AuditAction::ProfileChangeRejected,
        AuditAction::SalaryUploaded,
        AuditAction::TransactionExcluded,
        AuditAction::HoldsReevaluated,
        AuditAction::BatchFinalized,
        AuditAction::BatchExported,
        AuditAction::BankResponseIngested,
        AuditAction::BatchCompleted,
        AuditAction::FailedRetried,
        AuditAction::BatchReversed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CompanyCreated => "company_created",
            AuditAction::EmployeeRegistered => "employee_registered",
            AuditAction::BankChangeSubmitted => "bank_change_submitted",
            AuditAction::BankChangeApproved => "bank_change_approved",
            AuditAction::BankChangeRejected => "bank_change_rejected",
            AuditAction::BankBulkUpload => "bank_bulk_upload",
            AuditAction::ProfileChangeSubmitted => "profile_change_submitted",
            AuditAction::ProfileChangeApproved => "profile_change_approved",
            AuditAction::ProfileChangeRejected => "profile_change_rejected",
            AuditAction::SalaryUploaded => "salary_uploaded",
            AuditAction::TransactionExcluded => "transaction_excluded",
            AuditAction::HoldsReevaluated => "holds_reevaluated",
            AuditAction::BatchFinalized => "batch_finalized",
            AuditAction::BatchExported => "batch_exported",
            AuditAction::BankResponseIngested => "bank_response_ingested",
            AuditAction::BatchCompleted => "batch_completed",
            AuditAction::FailedRetried => "failed_retried",
            AuditAction::BatchReversed => "batch_reversed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase();
        AuditAction::ALL.into_iter().find(|a| a.as_str() == key)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit event. Immutable, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// EVT_000001, EVT_000002, ...
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub actor: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Shared by all events written by one operation
    pub correlation_id: Uuid,
}

impl AuditEvent {
    /// New event. The id is assigned by the event store on append.
    pub fn new(action: AuditAction, actor: &str, correlation_id: Uuid) -> Self {
        Self {
            event_id: String::new(),
            timestamp: Utc::now(),
            action,
            actor: actor.to_string(),
            company_id: None,
            batch_id: None,
            employee_code: None,
            description: None,
            correlation_id,
        }
    }

    // === Builder methods ===

    pub fn with_company(mut self, company_id: i64) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_batch(mut self, batch_id: i64) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_employee(mut self, emp_code: &str) -> Self {
        self.employee_code = Some(emp_code.to_string());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Format a store counter as an event id
    pub fn generate_id(counter: u64) -> String {
        format!("EVT_{:06}", counter)
    }

    /// Serialize as one JSONL line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.action,
            self.actor
        )?;
        if let Some(batch_id) = self.batch_id {
            write!(f, " batch #{}", batch_id)?;
        }
        if let Some(code) = &self.employee_code {
            write!(f, " emp {}", code)?;
        }
        if let Some(desc) = &self.description {
            write!(f, ": {}", desc)?;
        }
        Ok(())
    }
}
