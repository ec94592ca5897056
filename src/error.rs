//! Error types for metricwatch
//!
//! Only configuration problems and the bounded wait can surface to callers.
//! Unmatched and duplicate notifications are absorbed silently by the tracker.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "Timed out after {}ms waiting for {} pattern(s): {}",
        .timeout.as_millis(),
        .unsettled.len(),
        .unsettled.join(", ")
    )]
    TimeoutExceeded {
        timeout: Duration,
        unsettled: Vec<String>,
    },

    #[error("Reporter '{reporter}' references unknown factory '{factory}'")]
    UnknownFactory { reporter: String, factory: String },

    #[error("Reporter {id} has been deactivated and cannot be activated again")]
    ReporterClosed { id: Uuid },

    #[error("Expected {expected} active reporter(s), found {actual}")]
    UnexpectedReporterCount { expected: usize, actual: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Patterns still pending when a bounded wait gave up
    ///
    /// Empty for every variant other than `TimeoutExceeded`.
    pub fn unsettled_patterns(&self) -> &[String] {
        match self {
            Self::TimeoutExceeded { unsettled, .. } => unsettled,
            _ => &[],
        }
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_timeout_error_lists_unsettled_patterns() {
        let err = AppError::TimeoutExceeded {
            timeout: Duration::from_millis(250),
            unsettled: vec![
                "jobmanager.System.Swap.Used".to_string(),
                "jobmanager.System.Network.*SendRate".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 250ms waiting for 2 pattern(s): \
             jobmanager.System.Swap.Used, jobmanager.System.Network.*SendRate"
        );
        assert_eq!(err.unsettled_patterns().len(), 2);
    }

    #[test]
    fn test_unsettled_patterns_empty_for_other_variants() {
        let err = AppError::Internal("unexpected state".to_string());
        assert!(err.unsettled_patterns().is_empty());
    }

    #[test]
    fn test_unexpected_reporter_count_message() {
        let err = AppError::UnexpectedReporterCount {
            expected: 1,
            actual: 0,
        };
        assert_eq!(err.to_string(), "Expected 1 active reporter(s), found 0");
    }

    #[test]
    fn test_invalid_pattern_preserves_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = AppError::InvalidPattern {
            pattern: "(".to_string(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("Invalid pattern '('"));
    }
}
