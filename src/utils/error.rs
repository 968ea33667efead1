//! Error handling for the alert pipeline
//!
//! This module defines all error types used throughout the pipeline.

use thiserror::Error;

/// Result type alias for the pipeline
pub type Result<T> = std::result::Result<T, AlertflowError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum AlertflowError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Broker errors (topic missing, partition out of range, channel closed)
    #[error("Broker error: {0}")]
    Broker(String),

    /// Store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Data source adapter errors
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Query timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Notification channel errors
    #[error("Channel error: {0}")]
    Channel(String),

    /// Scheduling errors
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AlertflowError {
    /// Whether the error is worth retrying at the emit site
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AlertflowError::Broker(_) | AlertflowError::HttpClient(_) | AlertflowError::Timeout(_)
        )
    }
}
