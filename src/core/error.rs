use thiserror::Error;

/// Boxed cause attached to collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("statistic method specified is not valid: {0}")]
    InvalidStatistic(String),

    #[error("Configuration error: metrics entry {index} is missing a namespace")]
    MissingNamespace { index: usize },

    #[error("{operation} failed for {target}: {message}")]
    Api {
        operation: &'static str,
        target: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Malformed label '{label}': expected 3 or 5 fields, got {fields}")]
    MalformedLabel { label: String, fields: usize },

    #[error("Invalid ARN: {0}")]
    InvalidArn(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

impl CollectorError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a collaborator failure without an underlying cause
    pub fn api<T: Into<String>, M: Into<String>>(
        operation: &'static str,
        target: T,
        message: M,
    ) -> Self {
        Self::Api {
            operation,
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a collaborator failure wrapping its cause
    pub fn api_with_source<T, E>(operation: &'static str, target: T, source: E) -> Self
    where
        T: Into<String>,
        E: Into<BoxError>,
    {
        let source = source.into();
        Self::Api {
            operation,
            target: target.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a new publish error
    pub fn publish<S: Into<String>>(msg: S) -> Self {
        Self::Publish(msg.into())
    }

    /// Returns true if collection can continue past this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::MalformedLabel { .. } | Self::InvalidArn(_))
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::InvalidStatistic(_) | Self::MissingNamespace { .. } => "config",
            Self::Api { .. } => "api",
            Self::MalformedLabel { .. } => "label",
            Self::InvalidArn(_) => "validation",
            Self::Publish(_) => "publish",
            Self::Io(_) => "io",
            Self::Json(_) | Self::Yaml(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_creation() {
        let err = CollectorError::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(CollectorError::api("ListMetrics", "AWS/EC2", "throttled").is_recoverable());
        assert!(!CollectorError::config("invalid config").is_recoverable());
        assert!(!CollectorError::InvalidStatistic("bogus".into()).is_recoverable());
    }

    #[test]
    fn test_api_error_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = CollectorError::api_with_source("GetMetricData", "us-east-1", cause);
        assert_eq!(err.to_string(), "GetMetricData failed for us-east-1: timed out");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_malformed_label_message() {
        let err = CollectorError::MalformedLabel {
            label: "a|b".to_string(),
            fields: 2,
        };
        assert_eq!(err.to_string(), "Malformed label 'a|b': expected 3 or 5 fields, got 2");
        assert_eq!(err.category(), "label");
    }
}
