//! Test data factories
//!
//! All factories create real domain objects with sensible defaults; tests
//! override the fields they care about.

use chrono::Utc;
use uuid::Uuid;

use alertflow::model::{
    Action, ActionSettings, Alert, AlertStatus, Condition, ContactMethods, DataSourceConnection,
    DataSourceType, EmailSettings, HealthStatus, QueryExecStatus, RenderOptions, Schedule,
    ScheduleKind, SlackSettings, StatusThresholds, Subscriber, Throttle, TriggerKind,
    TriggerSchedule, TriggerTimeframe, User, WebhookSettings,
};

/// Factory for alert documents
pub struct AlertFactory;

impl AlertFactory {
    /// A running periodic alert with a webhook action, threshold 3, and one
    /// hourly health timeframe
    pub fn periodic(interval_ms: u64) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            name: format!("alert-{}", &Uuid::new_v4().to_string()[..8]),
            description: "test alert".to_string(),
            data_source_id: Uuid::new_v4(),
            query: "status:error".to_string(),
            schedule: Schedule {
                kind: ScheduleKind::Periodic { interval_ms },
                expiry: None,
            },
            condition: Condition {
                trigger: TriggerKind::NumResults,
                threshold: 3,
                trigger_schedule: TriggerSchedule::Once,
                throttle: Throttle::default(),
            },
            action: Action {
                settings: ActionSettings::Webhook(WebhookSettings {
                    url: "https://ops.example.com/hook".to_string(),
                }),
                options: RenderOptions {
                    include_results: true,
                    include_result_count: true,
                    ..Default::default()
                },
                time_constraints: Vec::new(),
                trigger_timeframes: vec![TriggerTimeframe {
                    timeframe_ms: 3_600_000,
                    thresholds: StatusThresholds {
                        up: 5,
                        warn: 10,
                        down: 15,
                    },
                }],
            },
            status: AlertStatus::Running,
            query_exec_status: QueryExecStatus::Pending,
            last_check_time: None,
            next_check_time: None,
            running_statuses: Vec::new(),
            subscribers: Vec::new(),
            version: 0,
        }
    }

    /// Same alert bound to a data source
    pub fn periodic_for(connection: &DataSourceConnection, interval_ms: u64) -> Alert {
        let mut alert = Self::periodic(interval_ms);
        alert.data_source_id = connection.id;
        alert
    }

    /// An alert that has already expired
    pub fn expired(connection: &DataSourceConnection) -> Alert {
        let mut alert = Self::periodic_for(connection, 50);
        alert.schedule.expiry = Some(Utc::now() - chrono::Duration::minutes(1));
        alert
    }
}

/// Factory for users
pub struct UserFactory;

impl UserFactory {
    /// A user in UTC with no availability restrictions
    pub fn always_available() -> User {
        User {
            id: Uuid::new_v4(),
            name: format!("user_{}", &Uuid::new_v4().to_string()[..8]),
            email: format!("user-{}@example.com", &Uuid::new_v4().to_string()[..8]),
            timezone: "UTC".to_string(),
            availability: Vec::new(),
        }
    }
}

/// A subscriber on an alert, reachable over Slack
pub fn slack_subscriber(user: &User, status: HealthStatus) -> Subscriber {
    Subscriber {
        user_id: user.id,
        contact_methods: ContactMethods {
            slack: Some(SlackSettings {
                webhook_url: "https://hooks.slack.test/T0".to_string(),
                channel: None,
            }),
            ..Default::default()
        },
        alert_status: status,
        timeframe_ms: 3_600_000,
    }
}

/// A subscriber reachable over email
pub fn email_subscriber(user: &User, status: HealthStatus) -> Subscriber {
    Subscriber {
        user_id: user.id,
        contact_methods: ContactMethods {
            email: Some(EmailSettings {
                to: user.email.clone(),
                subject: "Alerts".to_string(),
            }),
            ..Default::default()
        },
        alert_status: status,
        timeframe_ms: 3_600_000,
    }
}

/// A search-backed data source connection
pub fn search_connection() -> DataSourceConnection {
    DataSourceConnection {
        id: Uuid::new_v4(),
        name: "search-primary".to_string(),
        source_type: DataSourceType::Search,
        details: serde_json::json!({ "endpoint": "http://127.0.0.1:9999" }),
    }
}

/// Rows shaped like a search query result
pub fn rows(n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| serde_json::json!({ "id": i, "status": "error" }))
        .collect()
}
