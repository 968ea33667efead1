//! Domain types: alerts, users, wire messages, and data source bindings

pub mod alert;
pub mod message;
pub mod user;

pub use alert::{
    Action, ActionSettings, ActionType, Alert, AlertStatus, Condition, ContactMethods,
    EmailSettings, FiringTime, HealthStatus, MaintenanceWindow, QueryExecStatus, RenderOptions,
    RunningStatus, Schedule, ScheduleKind, SlackSettings, StatusThresholds, Subscriber, Throttle,
    TriggerKind, TriggerSchedule, TriggerTimeframe, WebexSettings, WebhookSettings,
};
pub use message::{
    ActionResultRecord, DataSourceType, QueryOutcome, ResultMessage, ResultStatus, ScheduleAction,
    ScheduleCommand, TriggerMessage,
};
pub use user::{AvailabilityWindow, User};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered data source: its declared backend family plus opaque
/// connection details. Credential storage and encryption live outside the
/// pipeline; the executor only needs the type for adapter selection and the
/// details blob to hand to the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConnection {
    pub id: Uuid,
    pub name: String,
    pub source_type: DataSourceType,
    pub details: serde_json::Value,
}
