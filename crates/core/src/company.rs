//! # Company Module
//!
//! A company is the tenant every batch, employee and report is scoped to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Company (tenant) owning employees and salary batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    /// Organisation the company belongs to (free text)
    pub organisation: Option<String>,
    pub name: String,
    /// Unique short code printed on templates and upload files
    pub site_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Company {
    /// Whether an uploaded `site_code` cell refers to this company.
    /// Blank cells are accepted.
    pub fn matches_site(&self, site_code: Option<&str>) -> bool {
        match site_code.map(str::trim) {
            None | Some("") => true,
            Some(code) => code.eq_ignore_ascii_case(&self.site_code),
        }
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.site_code)
    }
}
