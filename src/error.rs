//! Error types for runsonctl
//!
//! This module defines the error handling strategy for runsonctl. There are two
//! error types: `RunsonError` (main error enum) and `ConfigError` (settings and
//! runner-file specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `RunsonError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling. The conversion
//! happens at the CLI boundary using `anyhow::Error::from` to preserve error chains.
//!
//! ## Job-Level Degradation
//!
//! Errors implement `DegradesToUnpriced` to indicate whether a failure while
//! pricing a single job should be downgraded to an "unpriced" marker on that
//! job instead of aborting the whole estimate. Only `UnknownRunner`,
//! `UnknownRunnerLabel` and `UnresolvedRunner` degrade.
//!
//! ## When to Use Which Error
//!
//! - `CatalogLoad` / `DuplicateInstance`: pricing dataset is missing, malformed
//!   or ambiguous. Fatal at startup.
//!
//! - `UnknownRunner` / `InvalidCriteria`: a runner name or requirement in the
//!   query or configuration is wrong. Fatal to the request.
//!
//! - `InvalidDuration`: a job's timestamps are inconsistent. Fatal to that
//!   job's record only.
//!
//! - `UnknownRunnerLabel` / `UnresolvedRunner`: a job label could not be
//!   priced. The job is reported as unpriced.

use thiserror::Error;

/// Main error type for runsonctl
#[derive(Error, Debug)]
pub enum RunsonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load instance catalog: {0}")]
    CatalogLoad(String),

    #[error("Duplicate instance in catalog: {api_name}")]
    DuplicateInstance { api_name: String },

    #[error("Unknown runner: {name}{}", available_hint(.available))]
    UnknownRunner { name: String, available: Vec<String> },

    #[error("Invalid criteria: {field} - {reason}")]
    InvalidCriteria { field: String, reason: String },

    #[error("Invalid duration for job '{job}': {reason}")]
    InvalidDuration { job: String, reason: String },

    #[error("Unknown runner label: {label} ({reason})")]
    UnknownRunnerLabel { label: String, reason: String },

    #[error("Unresolved runner for labels [{}]: {reason}", .labels.join(", "))]
    UnresolvedRunner { labels: Vec<String>, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings and runner-configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RunsonError>;

fn available_hint(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(" (available runners: {})", available.join(", "))
    }
}

/// Trait for determining whether a per-job failure is downgraded to an
/// unpriced job record.
///
/// Used by the cost estimator at the job boundary.
pub trait DegradesToUnpriced {
    fn degrades_to_unpriced(&self) -> bool;
}

impl DegradesToUnpriced for RunsonError {
    fn degrades_to_unpriced(&self) -> bool {
        matches!(
            self,
            RunsonError::UnknownRunner { .. }
                | RunsonError::UnknownRunnerLabel { .. }
                | RunsonError::UnresolvedRunner { .. }
        )
    }
}

impl RunsonError {
    pub(crate) fn invalid_criteria(field: &str, reason: impl Into<String>) -> Self {
        RunsonError::InvalidCriteria {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_runner_lists_available() {
        let err = RunsonError::UnknownRunner {
            name: "big".to_string(),
            available: vec!["small".to_string(), "medium".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("big"));
        assert!(msg.contains("small, medium"));
    }

    #[test]
    fn test_unknown_runner_without_available() {
        let err = RunsonError::UnknownRunner {
            name: "big".to_string(),
            available: vec![],
        };
        assert_eq!(err.to_string(), "Unknown runner: big");
    }

    #[test]
    fn test_degradation_classification() {
        assert!(RunsonError::UnresolvedRunner {
            labels: vec![],
            reason: "no labels".to_string()
        }
        .degrades_to_unpriced());
        assert!(RunsonError::UnknownRunnerLabel {
            label: "linux_x64_3core".to_string(),
            reason: "no rate".to_string()
        }
        .degrades_to_unpriced());
        assert!(!RunsonError::InvalidDuration {
            job: "build".to_string(),
            reason: "end before start".to_string()
        }
        .degrades_to_unpriced());
        assert!(!RunsonError::CatalogLoad("missing".to_string()).degrades_to_unpriced());
    }
}
