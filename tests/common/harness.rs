//! Assembled-pipeline harness for integration tests

use std::sync::Arc;
use std::time::Duration;

use alertflow::config::Config;
use alertflow::datasource::AdapterRegistry;
use alertflow::model::{
    ActionType, Alert, DataSourceConnection, ScheduleAction, ScheduleCommand, User,
};
use alertflow::notify::{Dispatcher, NotificationChannel, TemplateRegistry};
use alertflow::pipeline::{Pipeline, Stores};
use alertflow::storage::{
    ActionResultStore, AlertStore, ConnectionStore, MemoryActionResultStore, MemoryAlertStore,
    MemoryConnectionStore, MemoryUserStore, UserStore,
};

use super::doubles::{RecordingChannel, ScriptedAdapter};
use super::fixtures::search_connection;

/// A started pipeline with recording channels and a scripted adapter
pub struct PipelineHarness {
    pub pipeline: Pipeline,
    pub stores: Stores,
    pub connection: DataSourceConnection,
    pub adapter: Arc<ScriptedAdapter>,
    pub webhook: Arc<RecordingChannel>,
    pub slack: Arc<RecordingChannel>,
    pub email: Arc<RecordingChannel>,
}

impl PipelineHarness {
    /// Build and start a pipeline around the given adapter
    pub async fn start(adapter: Arc<ScriptedAdapter>) -> Self {
        let stores = Stores {
            alerts: Arc::new(MemoryAlertStore::new()),
            history: Arc::new(MemoryActionResultStore::new()),
            users: Arc::new(MemoryUserStore::new()),
            connections: Arc::new(MemoryConnectionStore::new()),
        };
        let connection = search_connection();
        stores.connections.insert(connection.clone()).await.unwrap();

        let mut registry = AdapterRegistry::new();
        registry.register(adapter.clone());

        let webhook = RecordingChannel::new(ActionType::Webhook);
        let slack = RecordingChannel::new(ActionType::Slack);
        let email = RecordingChannel::new(ActionType::Email);
        let channels: Vec<Arc<dyn NotificationChannel>> = vec![
            webhook.clone() as Arc<dyn NotificationChannel>,
            slack.clone() as Arc<dyn NotificationChannel>,
            email.clone() as Arc<dyn NotificationChannel>,
        ];
        let dispatcher = Arc::new(Dispatcher::new(
            channels,
            stores.users.clone(),
            TemplateRegistry::new(),
            Config::default().pipeline.notify,
        ));

        let config = Config::default();
        let mut pipeline = Pipeline::new(&config, stores.clone(), Arc::new(registry), dispatcher);
        pipeline.start().await.unwrap();

        Self {
            pipeline,
            stores,
            connection,
            adapter,
            webhook,
            slack,
            email,
        }
    }

    pub async fn insert_user(&self, user: &User) {
        self.stores.users.insert(user.clone()).await.unwrap();
    }

    /// Insert an alert and schedule it through the control topic
    pub async fn activate(&self, alert: &Alert) {
        self.stores.alerts.insert(alert.clone()).await.unwrap();
        self.pipeline
            .bus()
            .schedules
            .publish(
                0,
                ScheduleCommand {
                    alert_id: alert.id,
                    action: ScheduleAction::Schedule,
                },
            )
            .await
            .unwrap();
    }

    pub async fn deactivate(&self, alert: &Alert) {
        self.pipeline
            .bus()
            .schedules
            .publish(
                0,
                ScheduleCommand {
                    alert_id: alert.id,
                    action: ScheduleAction::Unschedule,
                },
            )
            .await
            .unwrap();
    }

    pub async fn record_count(&self, alert: &Alert) -> usize {
        self.stores.history.for_alert(alert.id).await.unwrap().len()
    }

    /// Poll until the alert's history holds at least `at_least` records or
    /// the timeout elapses; returns the final count
    pub async fn wait_for_records(&self, alert: &Alert, at_least: usize, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let count = self.record_count(alert).await;
            if count >= at_least || tokio::time::Instant::now() >= deadline {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn stored(&self, alert: &Alert) -> Alert {
        self.stores.alerts.get(alert.id).await.unwrap().unwrap()
    }

    pub async fn stop(mut self) {
        self.pipeline.stop().await;
    }
}
