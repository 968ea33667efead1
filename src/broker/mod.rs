//! In-process message bus: named topics with ordered partitions and
//! consumer-group semantics
//!
//! Each partition is a bounded mpsc channel per consumer group, so publishing
//! awaits capacity (natural backpressure) and a slow partition never reorders
//! or blocks its siblings. Messages published before any group subscribes are
//! parked in a per-partition backlog and drained on first subscription.
//!
//! Delivery is at-least-once: the consuming worker retries a failed handler
//! once in-order before parking the message in the log. Replays must be
//! tolerated downstream, not deduplicated.

mod topic;

pub use topic::{PartitionConsumer, Topic};

use std::sync::Arc;

use crate::config::BrokerConfig;
use crate::model::{ResultMessage, ScheduleCommand, TriggerMessage};

/// Topic name for scheduler-emitted trigger messages
pub const TRIGGERS_TOPIC: &str = "triggers";
/// Topic name for executor-emitted result messages
pub const RESULTS_TOPIC: &str = "results";
/// Control-plane topic for schedule/unschedule commands
pub const SCHEDULES_TOPIC: &str = "schedules";

/// The three pipeline topics, built once at startup
#[derive(Clone)]
pub struct PipelineBus {
    pub triggers: Arc<Topic<TriggerMessage>>,
    pub results: Arc<Topic<ResultMessage>>,
    pub schedules: Arc<Topic<ScheduleCommand>>,
}

impl PipelineBus {
    /// Create the pipeline topics with the configured partition counts
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            triggers: Arc::new(Topic::new(
                TRIGGERS_TOPIC,
                config.trigger_partitions,
                config.channel_capacity,
            )),
            results: Arc::new(Topic::new(
                RESULTS_TOPIC,
                config.result_partitions,
                config.channel_capacity,
            )),
            schedules: Arc::new(Topic::new(SCHEDULES_TOPIC, 1, config.channel_capacity)),
        }
    }
}
