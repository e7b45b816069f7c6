//! Service context and operation results
//!
//! Every service borrows a [`ServiceContext`] holding the pool, the audit
//! store, the payroll settings and the clock.

use crate::config::PayrollSettings;
use chrono::{DateTime, NaiveDate, Utc};
use payroll_core::{AuditAction, AuditEvent, BatchStatus, PayrollPeriod, SalaryBatch, TxnStatus};
use payroll_persistence::{Database, EventStore};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Context for business operations
pub struct ServiceContext {
    pool: SqlitePool,
    events: Arc<EventStore>,
    settings: PayrollSettings,
    today: Option<NaiveDate>,
}

impl ServiceContext {
    pub fn new(db: &Database, settings: PayrollSettings) -> Self {
        Self::from_parts(db.pool().clone(), db.events_handle(), settings)
    }

    /// Create from pool and event store directly
    pub fn from_parts(pool: SqlitePool, events: Arc<EventStore>, settings: PayrollSettings) -> Self {
        Self {
            pool,
            events,
            settings,
            today: None,
        }
    }

    /// Pin "today" for the hold rules instead of reading the clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn settings(&self) -> &PayrollSettings {
        &self.settings
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Period containing today
    pub fn current_period(&self) -> PayrollPeriod {
        PayrollPeriod::containing(self.today())
    }

    /// Append the events of a committed operation.
    ///
    /// The database is the source of truth: a failed append is logged, not
    /// returned, since the state change has already been committed.
    pub fn record(&self, log: AuditLog) {
        for event in log.events {
            match self.events.append(event) {
                Ok(stored) => tracing::debug!(event_id = %stored.event_id, action = %stored.action, "audit event appended"),
                Err(err) => tracing::error!(error = %err, correlation_id = %log.correlation_id, "failed to append audit event"),
            }
        }
    }
}

/// Audit events collected during one operation, sharing a correlation id
#[derive(Debug)]
pub struct AuditLog {
    actor: String,
    correlation_id: Uuid,
    events: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new(actor: &str) -> Self {
        Self {
            actor: actor.to_string(),
            correlation_id: Uuid::new_v4(),
            events: Vec::new(),
        }
    }

    /// Start an event for this operation
    pub fn event(&self, action: AuditAction) -> AuditEvent {
        AuditEvent::new(action, &self.actor, self.correlation_id)
    }

    pub fn push(&mut self, event: AuditEvent) {
        self.events.push(event);
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Problem with one input row. The row was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub emp_code: Option<String>,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, emp_code: &str, message: impl Into<String>) -> Self {
        let emp_code = emp_code.trim();
        Self {
            row,
            emp_code: (!emp_code.is_empty()).then(|| emp_code.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.emp_code {
            Some(code) => write!(f, "row {} ({}): {}", self.row, code, self.message),
            None => write!(f, "row {}: {}", self.row, self.message),
        }
    }
}

/// Result of a salary upload
#[derive(Debug, Clone)]
pub struct UploadSummary {
    pub batch_id: i64,
    pub batch_created: bool,
    pub created: usize,
    pub updated: usize,
    pub held: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Upload complete - Created: {}, Updated: {}, On hold: {}, Skipped: {}",
            self.created, self.updated, self.held, self.skipped
        )
    }
}

/// Result of a bulk bank account upload
#[derive(Debug, Clone, Default)]
pub struct BankUploadSummary {
    pub created: usize,
    pub skipped: usize,
    pub released: usize,
    pub errors: Vec<RowError>,
}

impl fmt::Display for BankUploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Upload complete - Created: {}, Skipped: {}",
            self.created, self.skipped
        )
    }
}

/// Result of a hold re-evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReevaluationSummary {
    pub released: usize,
    pub still_held: usize,
}

impl ReevaluationSummary {
    pub fn merge(&mut self, other: ReevaluationSummary) {
        self.released += other.released;
        self.still_held += other.still_held;
    }
}

/// Result of a bank file export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub batch_id: i64,
    pub exported: usize,
    pub total_amount: Decimal,
    pub status: BatchStatus,
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bank export completed - {} salaries, total {}",
            self.exported, self.total_amount
        )
    }
}

/// Result of a bank response ingestion
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub batch_id: i64,
    pub updated: usize,
    pub skipped: usize,
    pub completed: bool,
    pub errors: Vec<RowError>,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bank response processed - Updated: {}, Skipped: {}",
            self.updated, self.skipped
        )?;
        if self.completed {
            write!(f, " (batch completed)")?;
        }
        Ok(())
    }
}

/// Result of a retry of failed transactions
#[derive(Debug, Clone, Copy)]
pub struct RetrySummary {
    pub batch_id: i64,
    pub retried: usize,
}

impl fmt::Display for RetrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.retried == 0 {
            write!(f, "No failed transactions found to retry")
        } else {
            write!(
                f,
                "{} failed transactions prepared for retry. Please export bank file again.",
                self.retried
            )
        }
    }
}

/// Result of a batch reversal
#[derive(Debug, Clone, Copy)]
pub struct ReversalSummary {
    pub batch_id: i64,
    pub reversal_id: i64,
    pub cancelled: u64,
}

/// Count and amount of one transaction status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTotal {
    pub status: TxnStatus,
    pub count: usize,
    pub amount: Decimal,
}

/// Per-status totals of a batch
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub batch: SalaryBatch,
    pub totals: Vec<StatusTotal>,
}

impl BatchSummary {
    pub fn count(&self, status: TxnStatus) -> usize {
        self.totals
            .iter()
            .find(|t| t.status == status)
            .map_or(0, |t| t.count)
    }

    pub fn amount(&self, status: TxnStatus) -> Decimal {
        self.totals
            .iter()
            .find(|t| t.status == status)
            .map_or(Decimal::ZERO, |t| t.amount)
    }

    pub fn total_count(&self) -> usize {
        self.totals.iter().map(|t| t.count).sum()
    }

    pub fn total_amount(&self) -> Decimal {
        self.totals.iter().map(|t| t.amount).sum()
    }
}
