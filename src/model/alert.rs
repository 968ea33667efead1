//! Alert document model
//!
//! The alert is the unit of monitoring configuration: a query against a data
//! source, a schedule deciding when to run it, a condition deciding whether
//! the result warrants action, and an action describing who gets notified how.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an alert, owned by the external management API.
/// The pipeline only reads it, except for the expiry transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Created,
    Incomplete,
    Running,
    Paused,
    Expired,
}

/// Per-cycle execution state, owned by the pipeline.
///
/// `Pending -> Running` on a scheduler fire; back to `Pending` when the result
/// processor finishes a cycle, or `Failed` when the query failed. A value
/// stuck at `Running` means a lost message and is reset on the next fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryExecStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Paused,
}

/// A weekly firing instant for realtime schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringTime {
    /// Day of week, 0 = Sunday
    pub day_of_week: u8,
    /// Milliseconds since midnight
    pub ms_since_midnight: u32,
}

/// When an alert's query should run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Fire every `interval_ms`, starting when the alert is activated
    Periodic { interval_ms: u64 },
    /// Fire at fixed weekly instants
    Realtime { firing_times: Vec<FiringTime> },
}

/// Schedule plus optional expiry after which the alert stops firing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(flatten)]
    pub kind: ScheduleKind,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

/// What condition on the query result warrants an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    NumResults,
}

/// How many dispatches a triggering result produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSchedule {
    Once,
    EveryResult,
}

/// Minimum suppression interval between two triggers regardless of schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Throttle {
    pub enabled: bool,
    #[serde(default)]
    pub suppress_ms: u64,
}

/// Trigger condition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub trigger: TriggerKind,
    pub threshold: usize,
    pub trigger_schedule: TriggerSchedule,
    #[serde(default)]
    pub throttle: Throttle,
}

/// Notification channel family for an alert's action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Email,
    Slack,
    Webex,
    Webhook,
    /// Control message carrying no query work; short-circuited by the
    /// executor without touching any adapter
    Skip,
}

impl ActionType {
    /// Stable partition ordinal on the results topic
    pub fn partition(&self) -> usize {
        match self {
            ActionType::Email => 0,
            ActionType::Slack => 1,
            ActionType::Webex => 2,
            ActionType::Webhook => 3,
            ActionType::Skip => 0,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionType::Email => "email",
            ActionType::Slack => "slack",
            ActionType::Webex => "webex",
            ActionType::Webhook => "webhook",
            ActionType::Skip => "skip",
        };
        f.write_str(s)
    }
}

/// Email action settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSettings {
    pub to: String,
    #[serde(default = "default_email_subject")]
    pub subject: String,
}

fn default_email_subject() -> String {
    "Alert Notification".to_string()
}

/// Slack action settings (incoming-webhook style)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackSettings {
    pub webhook_url: String,
    #[serde(default)]
    pub channel: Option<String>,
}

/// Webex action settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebexSettings {
    pub room_id: String,
    pub token: String,
}

/// Generic webhook action settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSettings {
    pub url: String,
}

/// Channel-specific settings, validated at alert-creation time so a
/// malformed action never reaches the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum ActionSettings {
    Email(EmailSettings),
    Slack(SlackSettings),
    Webex(WebexSettings),
    Webhook(WebhookSettings),
}

impl ActionSettings {
    /// The channel family these settings configure
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionSettings::Email(_) => ActionType::Email,
            ActionSettings::Slack(_) => ActionType::Slack,
            ActionSettings::Webex(_) => ActionType::Webex,
            ActionSettings::Webhook(_) => ActionType::Webhook,
        }
    }
}

/// Which template variables get populated when rendering notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RenderOptions {
    #[serde(default)]
    pub link_to_alert: bool,
    #[serde(default)]
    pub link_to_results: bool,
    #[serde(default)]
    pub include_results: bool,
    #[serde(default)]
    pub include_result_count: bool,
    #[serde(default)]
    pub include_trigger_time: bool,
}

/// A weekly window during which triggers are suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    /// Day of week, 0 = Sunday
    pub day_of_week: u8,
    /// Window start, milliseconds since midnight
    pub start_ms: u32,
    /// Window end, milliseconds since midnight (inclusive)
    pub end_ms: u32,
}

/// Up/Warn/Down thresholds over the count of trigger events in a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusThresholds {
    pub up: u64,
    pub warn: u64,
    pub down: u64,
}

/// A rolling health window configured on the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerTimeframe {
    /// Trailing window length in milliseconds
    pub timeframe_ms: u64,
    pub thresholds: StatusThresholds,
}

/// Derived health label per timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Up,
    Warn,
    Down,
}

/// Current derived status for one `(alert, timeframe)` pair; monotonically
/// overwritten, never historically retained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningStatus {
    pub timeframe_ms: u64,
    pub status: HealthStatus,
}

/// What the alert does when its condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub settings: ActionSettings,
    #[serde(default)]
    pub options: RenderOptions,
    #[serde(default)]
    pub time_constraints: Vec<MaintenanceWindow>,
    #[serde(default)]
    pub trigger_timeframes: Vec<TriggerTimeframe>,
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        self.settings.action_type()
    }
}

/// Per-user contact methods a subscriber can be reached on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContactMethods {
    #[serde(default)]
    pub email: Option<EmailSettings>,
    #[serde(default)]
    pub slack: Option<SlackSettings>,
    #[serde(default)]
    pub webex: Option<WebexSettings>,
    #[serde(default)]
    pub webhook: Option<WebhookSettings>,
}

impl ContactMethods {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.slack.is_none()
            && self.webex.is_none()
            && self.webhook.is_none()
    }
}

/// A user subscribed to an alert's notifications, scoped to the
/// `(status, timeframe)` pair they care about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub user_id: Uuid,
    pub contact_methods: ContactMethods,
    /// Notify when the alert's running status for `timeframe_ms` matches
    pub alert_status: HealthStatus,
    pub timeframe_ms: u64,
}

/// The alert document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Data source this alert queries
    pub data_source_id: Uuid,
    pub query: String,
    pub schedule: Schedule,
    pub condition: Condition,
    pub action: Action,
    pub status: AlertStatus,
    pub query_exec_status: QueryExecStatus,
    #[serde(default)]
    pub last_check_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_check_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub running_statuses: Vec<RunningStatus>,
    #[serde(default)]
    pub subscribers: Vec<Subscriber>,
    /// Bumped on every store write; used to detect lost updates
    #[serde(default)]
    pub version: u64,
}

impl Alert {
    /// Whether the previous cycle completed (result or failure arrived)
    pub fn cycle_complete(&self) -> bool {
        matches!(
            self.query_exec_status,
            QueryExecStatus::Pending | QueryExecStatus::Completed
        )
    }
}
