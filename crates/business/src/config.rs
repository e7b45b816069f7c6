//! Payroll configuration
//!
//! Loaded from an optional TOML file; every field has a default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayrollConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub payroll: PayrollSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory of the JSONL audit files
    #[serde(default = "default_events_dir")]
    pub events_dir: PathBuf,
}

/// Rules that tune the payroll engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollSettings {
    #[serde(default = "default_routing_code_length")]
    pub routing_code_length: usize,

    /// Used when a FAILED response row has no reason
    #[serde(default = "default_failure_reason")]
    pub default_failure_reason: String,

    /// Bank name recorded on accounts created by bulk upload
    #[serde(default = "default_bulk_bank_name")]
    pub bulk_upload_bank_name: String,

    /// Used when a bank change is rejected without a reason
    #[serde(default = "default_rejection_reason")]
    pub default_rejection_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/payroll.db")
}

fn default_events_dir() -> PathBuf {
    PathBuf::from("data/events")
}

fn default_routing_code_length() -> usize {
    payroll_core::ROUTING_CODE_LENGTH
}

fn default_failure_reason() -> String {
    "Bank processing failed".to_string()
}

fn default_bulk_bank_name() -> String {
    "Bulk Upload".to_string()
}

fn default_rejection_reason() -> String {
    "Rejected by admin".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            events_dir: default_events_dir(),
        }
    }
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self {
            routing_code_length: default_routing_code_length(),
            default_failure_reason: default_failure_reason(),
            bulk_upload_bank_name: default_bulk_bank_name(),
            default_rejection_reason: default_rejection_reason(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PayrollConfig {
    /// Load configuration from file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from string
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        let config: PayrollConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payroll.routing_code_length == 0 {
            return Err(ConfigError::Validation(
                "payroll.routing_code_length must be positive".to_string(),
            ));
        }
        if self.payroll.default_failure_reason.trim().is_empty() {
            return Err(ConfigError::Validation(
                "payroll.default_failure_reason must not be empty".to_string(),
            ));
        }
        if self.payroll.bulk_upload_bank_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "payroll.bulk_upload_bank_name must not be empty".to_string(),
            ));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("database.path must not be empty".to_string()));
        }
        Ok(())
    }

    /// SQLite URL for the configured path
    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.database.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PayrollConfig::load_str("").unwrap();
        assert_eq!(config, PayrollConfig::default());
        assert_eq!(config.payroll.routing_code_length, 11);
        assert_eq!(config.payroll.default_failure_reason, "Bank processing failed");
        assert_eq!(config.payroll.bulk_upload_bank_name, "Bulk Upload");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.database_url(), "sqlite:data/payroll.db");
    }

    #[test]
    fn test_load_string() {
        let config = PayrollConfig::load_str(
            r#"
[database]
path = "/tmp/p.db"

[payroll]
default_failure_reason = "Rejected by bank"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/p.db"));
        assert_eq!(config.payroll.default_failure_reason, "Rejected by bank");
        assert_eq!(config.payroll.routing_code_length, 11);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation() {
        let result = PayrollConfig::load_str("[payroll]\nrouting_code_length = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result = PayrollConfig::load_str("[payroll]\nrouting_code_length = \"eleven\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = PayrollConfig::load_file("/nonexistent/payroll.toml");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
        assert!(PayrollConfig::load_or_default(None).is_ok());
    }
}
