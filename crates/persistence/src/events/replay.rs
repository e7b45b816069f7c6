//! Event Replay - read audit events back from JSONL files

use super::{day_file, day_files, DAY_FORMAT};
use crate::error::{PersistenceError, PersistenceResult};
use chrono::NaiveDate;
use payroll_core::{AuditAction, AuditEvent};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Reads audit events from a store directory
pub struct EventReader {
    base_path: PathBuf,
}

impl EventReader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn read_file(&self, file_path: &Path) -> PersistenceResult<Vec<AuditEvent>> {
        let reader = BufReader::new(File::open(file_path)?);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Events of one day (`YYYY-MM-DD`)
    pub fn read_date(&self, date: &str) -> PersistenceResult<Vec<AuditEvent>> {
        self.read_day(parse_day(date, "date")?)
    }

    fn read_day(&self, day: NaiveDate) -> PersistenceResult<Vec<AuditEvent>> {
        let file_path = day_file(&self.base_path, day);
        if file_path.exists() {
            self.read_file(&file_path)
        } else {
            Ok(Vec::new())
        }
    }

    /// Events between two days, inclusive
    pub fn read_range(&self, from: &str, to: &str) -> PersistenceResult<Vec<AuditEvent>> {
        let from = parse_day(from, "from date")?;
        let to = parse_day(to, "to date")?;

        let mut events = Vec::new();
        for day in from.iter_days().take_while(|d| *d <= to) {
            events.extend(self.read_day(day)?);
        }
        Ok(events)
    }

    pub fn read_all(&self) -> PersistenceResult<Vec<AuditEvent>> {
        let mut events = Vec::new();
        for file_path in day_files(&self.base_path)? {
            events.extend(self.read_file(&file_path)?);
        }
        Ok(events)
    }
}

fn parse_day(value: &str, what: &str) -> PersistenceResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DAY_FORMAT)
        .map_err(|e| PersistenceError::Other(format!("Invalid {} '{}': {}", what, value, e)))
}

/// Filter over audit events, built with chained setters
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub actor: Option<String>,
    pub actions: Option<Vec<AuditAction>>,
    pub company_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub employee_code: Option<String>,
    pub correlation_id: Option<Uuid>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    pub fn actions(mut self, actions: Vec<AuditAction>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn company(mut self, company_id: i64) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn batch(mut self, batch_id: i64) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn employee(mut self, emp_code: &str) -> Self {
        self.employee_code = Some(emp_code.to_string());
        self
    }

    pub fn correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(ref actor) = self.actor {
            if event.actor != *actor {
                return false;
            }
        }

        if let Some(ref actions) = self.actions {
            if !actions.contains(&event.action) {
                return false;
            }
        }

        if self.company_id.is_some() && event.company_id != self.company_id {
            return false;
        }

        if self.batch_id.is_some() && event.batch_id != self.batch_id {
            return false;
        }

        if let Some(ref code) = self.employee_code {
            if event.employee_code.as_deref() != Some(code.as_str()) {
                return false;
            }
        }

        if let Some(corr) = self.correlation_id {
            if event.correlation_id != corr {
                return false;
            }
        }

        true
    }

    pub fn apply(&self, events: Vec<AuditEvent>) -> Vec<AuditEvent> {
        events.into_iter().filter(|e| self.matches(e)).collect()
    }
}
