//! Wire messages exchanged between pipeline stages
//!
//! Every stage's output is a well-formed message, success or typed failure;
//! errors never cross stage boundaries as panics or exceptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::ActionType;

/// Backend family of a data source; fixed small enumeration used to route
/// trigger messages so queries against the same family serialize through the
/// same consumer shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceType {
    Relational,
    Columnar,
    Search,
    Other,
}

impl DataSourceType {
    /// Stable partition ordinal on the triggers topic
    pub fn partition(&self) -> usize {
        match self {
            DataSourceType::Relational => 0,
            DataSourceType::Columnar => 1,
            DataSourceType::Search => 2,
            DataSourceType::Other => 3,
        }
    }
}

/// Produced by the scheduler when an alert is due and not suppressed;
/// consumed by the query executor. Delivery is at-least-once, so the
/// consumer must tolerate replays of the same `(alert_id, fired_at)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerMessage {
    pub alert_id: Uuid,
    pub data_source_id: Uuid,
    pub query: String,
    pub action_type: ActionType,
    pub fired_at: DateTime<Utc>,
}

/// Outcome of one query execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "query_status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Success { rows: Vec<serde_json::Value> },
    Failed { detail: String },
    /// The trigger carried no query work (alert paused mid-cycle)
    Paused,
}

/// Produced by the query executor; consumed by the result processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub alert_id: Uuid,
    pub action_type: ActionType,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

/// Control-plane command from the management API to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleAction {
    Schedule,
    Unschedule,
}

/// Message on the `schedules` topic adding or removing an alert's timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCommand {
    pub alert_id: Uuid,
    pub action: ScheduleAction,
}

/// Persisted append-only history entry per alert, owned by the result
/// processor. Never mutated after creation except to append `actions_taken`
/// and `notes` sub-fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResultRecord {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub result_status: ResultStatus,
    pub row_count: usize,
    #[serde(default)]
    pub result_data: Vec<serde_json::Value>,
    #[serde(default)]
    pub actions_taken: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Terminal status of one query cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failure,
}

impl ActionResultRecord {
    /// New success record for a completed query cycle
    pub fn success(alert_id: Uuid, rows: Vec<serde_json::Value>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_id,
            timestamp: at,
            result_status: ResultStatus::Success,
            row_count: rows.len(),
            result_data: rows,
            actions_taken: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// New failure record carrying the error detail as a note
    pub fn failure(alert_id: Uuid, detail: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_id,
            timestamp: at,
            result_status: ResultStatus::Failure,
            row_count: 0,
            result_data: Vec::new(),
            actions_taken: Vec::new(),
            notes: vec![detail.to_string()],
        }
    }
}
