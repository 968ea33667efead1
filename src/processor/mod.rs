//! Result processor: condition evaluation, rolling health statuses, and
//! notification fan-out
//!
//! Consumes result messages per action-type partition. Each successful cycle
//! appends one history record, recomputes the alert's running statuses over
//! its configured timeframes, evaluates the trigger condition, and hands the
//! resulting notifications to the dispatcher. Failures close the cycle as
//! `Failed` and notify subscribers exactly once.

mod status;

pub use status::derive_status;

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::broker::PartitionConsumer;
use crate::model::{
    ActionResultRecord, Alert, AlertStatus, QueryExecStatus, QueryOutcome, ResultMessage,
    RunningStatus, TriggerSchedule,
};
use crate::notify::{NotificationClass, NotificationDispatch, NotificationRequest};
use crate::storage::{ActionResultStore, AlertStore};
use crate::utils::error::Result;

/// Cycle summary wording for status notifications
const NOTE_ACTION_TAKEN: &str = "action taken";
const NOTE_NO_ACTION: &str = "checked, no action needed";

/// The result-processing stage of the pipeline
pub struct ResultProcessor {
    alerts: Arc<dyn AlertStore>,
    history: Arc<dyn ActionResultStore>,
    dispatcher: Arc<dyn NotificationDispatch>,
}

impl ResultProcessor {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        history: Arc<dyn ActionResultStore>,
        dispatcher: Arc<dyn NotificationDispatch>,
    ) -> Self {
        Self {
            alerts,
            history,
            dispatcher,
        }
    }

    /// Worker loop for one results partition, with a single in-order
    /// redelivery on failure
    pub async fn run(self: Arc<Self>, mut results: PartitionConsumer<ResultMessage>) {
        info!("Result processor started on partition {}", results.partition());
        while let Some(message) = results.recv().await {
            if let Err(e) = self.process(&message).await {
                warn!(
                    "Processing result for alert {} failed, redelivering: {}",
                    message.alert_id, e
                );
                if let Err(e) = self.process(&message).await {
                    error!(
                        "Dropping result for alert {} after redelivery: {}",
                        message.alert_id, e
                    );
                }
            }
        }
        debug!("Result processor on partition {} finished", results.partition());
    }

    async fn process(&self, message: &ResultMessage) -> Result<()> {
        let Some(alert) = self.alerts.get(message.alert_id).await? else {
            warn!("Result for unknown alert {}, discarding", message.alert_id);
            return Ok(());
        };

        match &message.outcome {
            QueryOutcome::Paused => {
                debug!("Alert {} cycle was paused mid-flight, closing it", alert.id);
                self.alerts
                    .set_query_exec_status(alert.id, QueryExecStatus::Pending)
                    .await
            }
            QueryOutcome::Failed { detail } => self.process_failure(&alert, detail).await,
            QueryOutcome::Success { rows } => self.process_success(&alert, rows).await,
        }
    }

    /// Failed cycle: record it, mark the alert failed, notify subscribers
    /// once. The next scheduler fire reclaims the failed state.
    async fn process_failure(&self, alert: &Alert, detail: &str) -> Result<()> {
        warn!("Alert {} query failed: {}", alert.id, detail);

        self.alerts
            .set_query_exec_status(alert.id, QueryExecStatus::Failed)
            .await?;
        self.history
            .append(ActionResultRecord::failure(alert.id, detail, Utc::now()))
            .await?;

        if let Err(e) = self
            .dispatcher
            .dispatch(
                alert,
                NotificationRequest {
                    class: NotificationClass::Error,
                    rows: Vec::new(),
                    note: Some(detail.to_string()),
                },
            )
            .await
        {
            warn!("Error notification for alert {} failed: {}", alert.id, e);
        }
        Ok(())
    }

    async fn process_success(&self, alert: &Alert, rows: &[serde_json::Value]) -> Result<()> {
        let now = Utc::now();
        let record = ActionResultRecord::success(alert.id, rows.to_vec(), now);
        let record_id = record.id;
        self.history.append(record).await?;

        if alert.status != AlertStatus::Running {
            // Stale result from before a pause or delete. The record stays in
            // the history; statuses and notifications are skipped, and the
            // cycle closes so a later resume starts clean.
            info!(
                "Alert {} is {:?}, persisting stale result without side effects",
                alert.id, alert.status
            );
            self.alerts
                .set_query_exec_status(alert.id, QueryExecStatus::Pending)
                .await?;
            return Ok(());
        }

        let statuses = self.recompute_statuses(alert, now).await?;
        self.alerts
            .set_running_statuses(alert.id, statuses.clone())
            .await?;

        let action_needed = rows.len() >= alert.condition.threshold;
        let trigger_count = if action_needed {
            match alert.condition.trigger_schedule {
                TriggerSchedule::Once => 1,
                TriggerSchedule::EveryResult => rows.len(),
            }
        } else {
            0
        };

        self.alerts
            .set_query_exec_status(alert.id, QueryExecStatus::Pending)
            .await?;

        // Status-scoped subscriptions must see the statuses just computed
        let mut refreshed = alert.clone();
        refreshed.running_statuses = statuses;

        if trigger_count > 0 {
            let dispatches = (0..trigger_count).map(|_| {
                self.dispatcher.dispatch(
                    &refreshed,
                    NotificationRequest {
                        class: NotificationClass::Trigger,
                        rows: rows.to_vec(),
                        note: None,
                    },
                )
            });
            for outcome in join_all(dispatches).await {
                if let Err(e) = outcome {
                    warn!("Trigger dispatch for alert {} failed: {}", alert.id, e);
                }
            }
            self.history
                .append_action_taken(
                    record_id,
                    format!("{} x{}", refreshed.action.action_type(), trigger_count),
                )
                .await?;
        }

        let note = if action_needed {
            NOTE_ACTION_TAKEN
        } else {
            NOTE_NO_ACTION
        };
        if let Err(e) = self
            .dispatcher
            .dispatch(
                &refreshed,
                NotificationRequest {
                    class: NotificationClass::Status,
                    rows: rows.to_vec(),
                    note: Some(note.to_string()),
                },
            )
            .await
        {
            warn!("Status notification for alert {} failed: {}", alert.id, e);
        }

        info!(
            "Alert {} cycle complete: {} row(s), {} trigger dispatch(es)",
            alert.id,
            rows.len(),
            trigger_count
        );
        Ok(())
    }

    /// One Up/Warn/Down status per configured timeframe, counting history
    /// records inside each trailing window
    async fn recompute_statuses(
        &self,
        alert: &Alert,
        now: chrono::DateTime<Utc>,
    ) -> Result<Vec<RunningStatus>> {
        let mut statuses = Vec::with_capacity(alert.action.trigger_timeframes.len());
        for timeframe in &alert.action.trigger_timeframes {
            let cutoff = now - Duration::milliseconds(timeframe.timeframe_ms as i64);
            let count = self.history.count_since(alert.id, cutoff).await?;
            statuses.push(RunningStatus {
                timeframe_ms: timeframe.timeframe_ms,
                status: derive_status(count, &timeframe.thresholds),
            });
        }
        Ok(statuses)
    }
}
