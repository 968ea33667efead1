//! Notification dispatcher: recipient resolution, rendering, and delivery
//!
//! One dispatch fans out to every resolved `(recipient, channel)` pair
//! concurrently. Deliveries are independent; a failing channel is logged and
//! recorded but never blocks the others and never fails the pipeline cycle.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::NotifyConfig;
use crate::model::{ActionType, Alert};
use crate::storage::UserStore;
use crate::utils::error::Result;

use super::channels::{ChannelTarget, NotificationChannel, RenderedNotification};
use super::template::{self, NotificationClass, TemplateRegistry};

/// One notification to fan out
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub class: NotificationClass,
    /// Result rows backing the `results` and `result_count` variables
    pub rows: Vec<serde_json::Value>,
    /// Cycle summary or failure detail; feeds the `result` variable
    pub note: Option<String>,
}

/// Dispatch seam the result processor depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn dispatch(&self, alert: &Alert, request: NotificationRequest) -> Result<()>;
}

/// Outcome of one delivery attempt, kept in a bounded in-memory log
#[derive(Debug, Clone)]
pub struct DeliveryRecord {
    pub alert_id: Uuid,
    /// `None` for the alert's own action target
    pub user_id: Option<Uuid>,
    pub channel: ActionType,
    pub class: NotificationClass,
    pub success: bool,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// The concrete dispatcher wiring channels, templates, and the user store
pub struct Dispatcher {
    channels: HashMap<ActionType, Arc<dyn NotificationChannel>>,
    users: Arc<dyn UserStore>,
    templates: TemplateRegistry,
    config: NotifyConfig,
    log: Mutex<VecDeque<DeliveryRecord>>,
}

impl Dispatcher {
    pub fn new(
        channels: Vec<Arc<dyn NotificationChannel>>,
        users: Arc<dyn UserStore>,
        templates: TemplateRegistry,
        config: NotifyConfig,
    ) -> Self {
        let channels = channels.into_iter().map(|c| (c.kind(), c)).collect();
        Self {
            channels,
            users,
            templates,
            config,
            log: Mutex::new(VecDeque::new()),
        }
    }

    /// Recent delivery attempts, newest last
    pub fn recent_deliveries(&self) -> Vec<DeliveryRecord> {
        self.log.lock().iter().cloned().collect()
    }

    /// Recipients for one dispatch: the alert's own action for triggers,
    /// subscribed users otherwise
    async fn resolve_targets(
        &self,
        alert: &Alert,
        class: NotificationClass,
        now: DateTime<Utc>,
    ) -> Vec<(Option<Uuid>, ChannelTarget)> {
        if class == NotificationClass::Trigger {
            return vec![(None, ChannelTarget::from_action(&alert.action.settings))];
        }

        let mut targets = Vec::new();
        for subscriber in &alert.subscribers {
            // Status notifications go to users watching the (status, timeframe)
            // pair the alert currently holds; failures go to everyone
            if class == NotificationClass::Status {
                let matches = alert.running_statuses.iter().any(|rs| {
                    rs.timeframe_ms == subscriber.timeframe_ms && rs.status == subscriber.alert_status
                });
                if !matches {
                    continue;
                }
            }

            let user = match self.users.get(subscriber.user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(
                        "Alert {} subscriber {} has no user record, skipping",
                        alert.id, subscriber.user_id
                    );
                    continue;
                }
                Err(e) => {
                    warn!("User lookup for {} failed: {}", subscriber.user_id, e);
                    continue;
                }
            };
            if !user.is_available(now) {
                debug!("User {} outside availability window, skipping", user.id);
                continue;
            }

            for target in ChannelTarget::from_contact_methods(&subscriber.contact_methods) {
                targets.push((Some(user.id), target));
            }
        }
        targets
    }

    async fn deliver_one(
        &self,
        alert: &Alert,
        class: NotificationClass,
        user_id: Option<Uuid>,
        target: ChannelTarget,
        vars: &template::TemplateVars,
        now: DateTime<Utc>,
    ) -> DeliveryRecord {
        let kind = target.kind();
        let body = template::render(self.templates.lookup(kind, class), vars);
        let message = RenderedNotification {
            subject: subject_for(alert, class),
            body,
        };

        let outcome = match self.channels.get(&kind) {
            Some(channel) => channel.send(&target, &message).await,
            None => Err(crate::utils::error::AlertflowError::Channel(format!(
                "no {} channel configured",
                kind
            ))),
        };

        match outcome {
            Ok(()) => DeliveryRecord {
                alert_id: alert.id,
                user_id,
                channel: kind,
                class,
                success: true,
                detail: None,
                timestamp: now,
            },
            Err(e) => {
                warn!(
                    "Delivery of {} notification for alert {} over {} failed: {}",
                    class, alert.id, kind, e
                );
                DeliveryRecord {
                    alert_id: alert.id,
                    user_id,
                    channel: kind,
                    class,
                    success: false,
                    detail: Some(e.to_string()),
                    timestamp: now,
                }
            }
        }
    }

    fn record(&self, records: Vec<DeliveryRecord>) {
        let mut log = self.log.lock();
        for record in records {
            if log.len() >= self.config.delivery_log_capacity.max(1) {
                log.pop_front();
            }
            log.push_back(record);
        }
    }
}

#[async_trait]
impl NotificationDispatch for Dispatcher {
    async fn dispatch(&self, alert: &Alert, request: NotificationRequest) -> Result<()> {
        let now = Utc::now();

        // Failure detail must always come through, whatever the alert's
        // render options say
        let vars = if request.class == NotificationClass::Error {
            let mut full = alert.clone();
            full.action.options = template::full_render_options();
            template::build_vars(
                &full,
                &request.rows,
                request.note.as_deref(),
                &self.config.link_base_url,
                now,
            )
        } else {
            template::build_vars(
                alert,
                &request.rows,
                request.note.as_deref(),
                &self.config.link_base_url,
                now,
            )
        };

        let targets = self.resolve_targets(alert, request.class, now).await;
        if targets.is_empty() {
            debug!(
                "No recipients for {} notification on alert {}",
                request.class, alert.id
            );
            return Ok(());
        }

        let deliveries = targets.into_iter().map(|(user_id, target)| {
            self.deliver_one(alert, request.class, user_id, target, &vars, now)
        });
        let records = join_all(deliveries).await;

        let failed = records.iter().filter(|r| !r.success).count();
        let total = records.len();
        self.record(records);

        if failed > 0 {
            warn!(
                "Alert {} {} notification: {}/{} deliveries failed",
                alert.id, request.class, failed, total
            );
        } else {
            info!(
                "Alert {} {} notification delivered to {} target(s)",
                alert.id, request.class, total
            );
        }
        Ok(())
    }
}

fn subject_for(alert: &Alert, class: NotificationClass) -> String {
    match class {
        NotificationClass::Trigger => format!("Alert triggered: {}", alert.name),
        NotificationClass::Status => format!("Alert status: {}", alert.name),
        NotificationClass::Error => format!("Alert failed: {}", alert.name),
    }
}
