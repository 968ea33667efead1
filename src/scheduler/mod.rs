//! Alert scheduler: per-alert timers feeding the triggers topic
//!
//! One loop owns a priority queue of `(due_at, alert_id)` entries and sleeps
//! until the earliest is due. Fires run as spawned tasks so a slow store or a
//! backpressured topic never delays sibling alerts. Every fire re-reads the
//! alert document, so pauses, edits, and deletions made between ticks take
//! effect without any timer surgery.

mod timing;

pub use timing::{in_maintenance_window, is_throttled, next_fire};

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::{PartitionConsumer, Topic};
use crate::config::{SchedulerConfig, Validate};
use crate::model::{
    Alert, AlertStatus, QueryExecStatus, ScheduleAction, ScheduleCommand, TriggerMessage,
};
use crate::storage::{AlertStore, ConnectionStore};
use crate::utils::error::{AlertflowError, Result};

/// One pending timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    due_at: DateTime<Utc>,
    alert_id: Uuid,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due_at
            .cmp(&other.due_at)
            .then_with(|| self.alert_id.cmp(&other.alert_id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The scheduling stage of the pipeline
pub struct Scheduler {
    alerts: Arc<dyn AlertStore>,
    connections: Arc<dyn ConnectionStore>,
    triggers: Arc<Topic<TriggerMessage>>,
    config: SchedulerConfig,
    queue: Mutex<BinaryHeap<Reverse<QueueEntry>>>,
    notify: Notify,
    active: AtomicBool,
}

impl Scheduler {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        connections: Arc<dyn ConnectionStore>,
        triggers: Arc<Topic<TriggerMessage>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            alerts,
            connections,
            triggers,
            config,
            queue: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            active: AtomicBool::new(false),
        }
    }

    /// Validate and schedule an alert's first fire. Replaces any timer the
    /// alert already has; a malformed alert is refused and never enters the
    /// queue.
    pub async fn schedule(&self, alert_id: Uuid) -> Result<()> {
        let alert = self
            .alerts
            .get(alert_id)
            .await?
            .ok_or_else(|| AlertflowError::NotFound(format!("alert {}", alert_id)))?;

        if let Err(reason) = alert.validate() {
            return Err(AlertflowError::Validation(format!(
                "alert {} rejected: {}",
                alert_id, reason
            )));
        }

        self.remove_entries(alert_id);
        self.queue_next(alert_id, &alert, Utc::now()).await?;
        info!("Scheduled alert {} ({})", alert_id, alert.name);
        Ok(())
    }

    /// Cancel an alert's pending timer. Takes effect synchronously, so no
    /// fire for this alert starts after this returns.
    pub fn unschedule(&self, alert_id: Uuid) {
        self.remove_entries(alert_id);
        info!("Unscheduled alert {}", alert_id);
    }

    /// Re-arm timers for every running alert; called once at startup so
    /// schedules survive a process restart
    pub async fn restore(&self) -> Result<()> {
        let mut restored = 0usize;
        for alert in self.alerts.list().await? {
            if alert.status != AlertStatus::Running {
                continue;
            }
            if let Err(e) = self.schedule(alert.id).await {
                warn!("Skipping alert {} during restore: {}", alert.id, e);
                continue;
            }
            restored += 1;
        }
        info!("Restored {} alert schedules", restored);
        Ok(())
    }

    /// Number of pending timers
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Stop the run loop after its current iteration
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Timer loop: pop due entries, spawn their fires, sleep until the next
    /// deadline or until the queue changes
    pub async fn run(self: Arc<Self>) {
        self.active.store(true, Ordering::SeqCst);
        info!("Alert scheduler started");

        while self.active.load(Ordering::SeqCst) {
            let now = Utc::now();
            let (due, next_due) = {
                let mut queue = self.queue.lock();
                let mut due = Vec::new();
                while let Some(Reverse(entry)) = queue.peek().copied() {
                    if entry.due_at > now {
                        break;
                    }
                    queue.pop();
                    due.push(entry.alert_id);
                }
                (due, queue.peek().map(|Reverse(entry)| entry.due_at))
            };

            for alert_id in due {
                let scheduler = Arc::clone(&self);
                tokio::spawn(async move {
                    if let Err(e) = scheduler.fire_alert(alert_id).await {
                        error!("Alert {} fire failed: {}", alert_id, e);
                    }
                });
            }

            match next_due {
                Some(at) => {
                    let wait = (at - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.notify.notified() => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }

        info!("Alert scheduler stopped");
    }

    /// Control-plane consumer translating schedule commands into timer
    /// operations
    pub async fn run_control_loop(self: Arc<Self>, mut commands: PartitionConsumer<ScheduleCommand>) {
        info!("Schedule control consumer started");
        while let Some(command) = commands.recv().await {
            match command.action {
                ScheduleAction::Schedule => {
                    if let Err(e) = self.schedule(command.alert_id).await {
                        warn!("Refusing to schedule alert {}: {}", command.alert_id, e);
                    }
                }
                ScheduleAction::Unschedule => self.unschedule(command.alert_id),
            }
        }
        debug!("Schedule control consumer finished");
    }

    /// One fire: re-read the alert, apply the suppression ladder, emit the
    /// trigger, then handle expiry and rescheduling. A store failure anywhere
    /// in the ladder costs at most one cycle; the timer is re-armed regardless
    /// so the alert never silently drops off the schedule.
    async fn fire_alert(&self, alert_id: Uuid) -> Result<()> {
        let alert = match self.alerts.get(alert_id).await {
            Ok(Some(alert)) => alert,
            Ok(None) => {
                debug!("Alert {} vanished before its timer fired", alert_id);
                return Ok(());
            }
            Err(e) => {
                // A read failure must not drop the timer; retry after one
                // backoff interval
                let due_at = Utc::now()
                    + chrono::Duration::milliseconds(self.config.emit_backoff_ms as i64);
                self.queue.lock().push(Reverse(QueueEntry { due_at, alert_id }));
                self.notify.notify_one();
                return Err(e);
            }
        };

        // Paused or otherwise not running: drop without rescheduling. The
        // management API re-issues a schedule command on resume.
        if alert.status != AlertStatus::Running {
            debug!("Alert {} is {:?}, dropping fire", alert_id, alert.status);
            return Ok(());
        }

        let now = Utc::now();

        let fired = if !alert.cycle_complete() {
            // The previous trigger never produced a result. Reclaim the cycle
            // and skip this fire; the next one runs normally.
            warn!(
                "Alert {} cycle still open ({:?}), reclaiming and skipping this fire",
                alert_id, alert.query_exec_status
            );
            self.alerts
                .set_query_exec_status(alert_id, QueryExecStatus::Pending)
                .await
        } else if is_throttled(&alert.condition.throttle, alert.last_check_time, now) {
            debug!("Alert {} throttled, suppressing fire", alert_id);
            Ok(())
        } else if in_maintenance_window(&alert.action.time_constraints, now) {
            info!("Alert {} fire suppressed by maintenance window", alert_id);
            Ok(())
        } else {
            self.emit_trigger(&alert, now).await
        };

        if let Some(expiry) = alert.schedule.expiry {
            if expiry <= now {
                info!("Alert {} expired, removing from schedule", alert_id);
                let retired = self.alerts.set_status(alert_id, AlertStatus::Expired).await;
                if retired.is_err() {
                    // Keep the timer so expiry is retried on the next fire
                    let requeued = self.queue_next(alert_id, &alert, now).await;
                    return retired.and(requeued);
                }
                return fired;
            }
        }

        let requeued = self.queue_next(alert_id, &alert, now).await;
        fired.and(requeued)
    }

    async fn emit_trigger(&self, alert: &Alert, now: DateTime<Utc>) -> Result<()> {
        let Some(connection) = self.connections.get(alert.data_source_id).await? else {
            warn!(
                "Alert {} references unknown data source {}, skipping cycle",
                alert.id, alert.data_source_id
            );
            return Ok(());
        };

        self.alerts
            .set_query_exec_status(alert.id, QueryExecStatus::Running)
            .await?;
        self.alerts
            .touch_check_times(alert.id, Some(now), None)
            .await?;

        let message = TriggerMessage {
            alert_id: alert.id,
            data_source_id: alert.data_source_id,
            query: alert.query.clone(),
            action_type: alert.action.action_type(),
            fired_at: now,
        };
        let partition = connection.source_type.partition() % self.triggers.partition_count();
        self.publish_with_backoff(partition, message).await;
        Ok(())
    }

    /// Publish with capped exponential backoff. Giving up leaves the cycle
    /// open, which the next fire reclaims.
    async fn publish_with_backoff(&self, partition: usize, message: TriggerMessage) {
        let alert_id = message.alert_id;
        let mut backoff = self.config.emit_backoff_ms.max(1);

        for attempt in 1..=self.config.emit_max_attempts.max(1) {
            match self.triggers.publish(partition, message.clone()).await {
                Ok(()) => {
                    debug!(
                        "Emitted trigger for alert {} on partition {}",
                        alert_id, partition
                    );
                    return;
                }
                Err(e) if attempt < self.config.emit_max_attempts && e.is_retryable() => {
                    warn!(
                        "Trigger emit attempt {} for alert {} failed: {}",
                        attempt, alert_id, e
                    );
                    let jitter = rand::thread_rng().gen_range(0..=backoff / 2);
                    tokio::time::sleep(std::time::Duration::from_millis(backoff + jitter)).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => {
                    error!(
                        "Giving up on trigger for alert {} after {} attempts: {}",
                        alert_id, attempt, e
                    );
                }
            }
        }
    }

    async fn queue_next(&self, alert_id: Uuid, alert: &Alert, now: DateTime<Utc>) -> Result<()> {
        match next_fire(&alert.schedule.kind, now) {
            Some(due_at) => {
                // The entry goes in before the store write; a failed write
                // must not cost the alert its timer
                self.queue.lock().push(Reverse(QueueEntry { due_at, alert_id }));
                self.notify.notify_one();
                self.alerts
                    .touch_check_times(alert_id, None, Some(due_at))
                    .await
            }
            None => {
                warn!("Alert {} has no future fire time, leaving it unscheduled", alert_id);
                Ok(())
            }
        }
    }

    fn remove_entries(&self, alert_id: Uuid) {
        let mut queue = self.queue.lock();
        queue.retain(|Reverse(entry)| entry.alert_id != alert_id);
        drop(queue);
        self.notify.notify_one();
    }
}
