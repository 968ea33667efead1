//! Configuration model definitions

use serde::{Deserialize, Serialize};

/// Root pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Topic topology and channel sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Partitions on the triggers topic (one per data-source family, min 4)
    #[serde(default = "default_partitions")]
    pub trigger_partitions: usize,
    /// Partitions on the results topic (one per action family, min 4)
    #[serde(default = "default_partitions")]
    pub result_partitions: usize,
    /// Bounded capacity of each partition channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_partitions() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            trigger_partitions: default_partitions(),
            result_partitions: default_partitions(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Scheduler loop and emit-retry tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Attempts for one trigger emit before giving up for the cycle
    #[serde(default = "default_emit_max_attempts")]
    pub emit_max_attempts: u32,
    /// Base backoff between emit attempts, doubled per attempt with jitter
    #[serde(default = "default_emit_backoff_ms")]
    pub emit_backoff_ms: u64,
}

fn default_emit_max_attempts() -> u32 {
    3
}

fn default_emit_backoff_ms() -> u64 {
    500
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            emit_max_attempts: default_emit_max_attempts(),
            emit_backoff_ms: default_emit_backoff_ms(),
        }
    }
}

/// Query executor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Default per-query timeout when an adapter does not declare its own
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

/// Notification dispatch tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Base URL used to render alert/result links in templates
    #[serde(default = "default_link_base_url")]
    pub link_base_url: String,
    /// Per-channel HTTP request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Entries retained in the in-memory delivery log
    #[serde(default = "default_delivery_log_capacity")]
    pub delivery_log_capacity: usize,
}

fn default_link_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_delivery_log_capacity() -> usize {
    1000
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            link_base_url: default_link_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            delivery_log_capacity: default_delivery_log_capacity(),
        }
    }
}
