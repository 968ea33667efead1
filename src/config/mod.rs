//! Configuration management for the alert pipeline
//!
//! This module handles loading, validation, and management of all pipeline
//! configuration.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{AlertflowError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the pipeline
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Pipeline configuration
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AlertflowError::Config(format!("Failed to read config file: {}", e)))?;

        let pipeline: PipelineConfig = serde_yaml::from_str(&content)
            .map_err(|e| AlertflowError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self { pipeline };
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Build configuration from defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut pipeline = PipelineConfig::default();

        if let Ok(url) = std::env::var("ALERTFLOW_LINK_BASE_URL") {
            pipeline.notify.link_base_url = url;
        }
        if let Ok(timeout) = std::env::var("ALERTFLOW_QUERY_TIMEOUT_SECS") {
            pipeline.executor.query_timeout_secs = timeout
                .parse()
                .map_err(|_| AlertflowError::Config(format!("bad query timeout {:?}", timeout)))?;
        }
        if let Ok(capacity) = std::env::var("ALERTFLOW_CHANNEL_CAPACITY") {
            pipeline.broker.channel_capacity = capacity.parse().map_err(|_| {
                AlertflowError::Config(format!("bad channel capacity {:?}", capacity))
            })?;
        }

        let config = Self { pipeline };
        config.validate()?;
        Ok(config)
    }

    /// Validate the whole configuration tree
    pub fn validate(&self) -> Result<()> {
        self.pipeline
            .validate()
            .map_err(AlertflowError::Config)
    }
}
