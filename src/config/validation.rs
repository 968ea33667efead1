//! Validation for configuration and alert documents
//!
//! Alert validation runs when an alert is scheduled, not at dispatch time, so
//! a malformed action fails before it ever reaches the pipeline.

use crate::model::{ActionSettings, Alert, MaintenanceWindow, ScheduleKind, TriggerTimeframe};

use super::models::{BrokerConfig, ExecutorConfig, NotifyConfig, PipelineConfig, SchedulerConfig};

const MS_PER_DAY: u32 = 86_400_000;

/// Validation contract for config and documents entering the pipeline
pub trait Validate {
    /// Validate, returning a human-readable reason on failure
    fn validate(&self) -> Result<(), String>;
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        self.broker.validate()?;
        self.scheduler.validate()?;
        self.executor.validate()?;
        self.notify.validate()?;
        Ok(())
    }
}

impl Validate for BrokerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.trigger_partitions < 4 {
            return Err(format!(
                "broker.trigger_partitions must be at least 4, got {}",
                self.trigger_partitions
            ));
        }
        if self.result_partitions < 4 {
            return Err(format!(
                "broker.result_partitions must be at least 4, got {}",
                self.result_partitions
            ));
        }
        if self.channel_capacity == 0 {
            return Err("broker.channel_capacity must be positive".to_string());
        }
        Ok(())
    }
}

impl Validate for SchedulerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.emit_max_attempts == 0 {
            return Err("scheduler.emit_max_attempts must be positive".to_string());
        }
        Ok(())
    }
}

impl Validate for ExecutorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.query_timeout_secs == 0 {
            return Err("executor.query_timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

impl Validate for NotifyConfig {
    fn validate(&self) -> Result<(), String> {
        if self.link_base_url.is_empty() {
            return Err("notify.link_base_url must not be empty".to_string());
        }
        Ok(())
    }
}

impl Validate for Alert {
    fn validate(&self) -> Result<(), String> {
        match &self.schedule.kind {
            ScheduleKind::Periodic { interval_ms } => {
                if *interval_ms == 0 {
                    return Err("periodic schedule interval must be positive".to_string());
                }
            }
            ScheduleKind::Realtime { firing_times } => {
                if firing_times.is_empty() {
                    return Err("realtime schedule needs at least one firing time".to_string());
                }
                for ft in firing_times {
                    if ft.day_of_week > 6 {
                        return Err(format!("firing day_of_week {} out of range", ft.day_of_week));
                    }
                    if ft.ms_since_midnight >= MS_PER_DAY {
                        return Err(format!(
                            "firing time {}ms is past midnight",
                            ft.ms_since_midnight
                        ));
                    }
                }
            }
        }

        if self.condition.threshold == 0 {
            return Err("condition threshold must be positive".to_string());
        }
        if self.condition.throttle.enabled && self.condition.throttle.suppress_ms == 0 {
            return Err("enabled throttle needs a positive suppress_ms".to_string());
        }

        validate_settings(&self.action.settings)?;
        for window in &self.action.time_constraints {
            validate_window(window)?;
        }
        for timeframe in &self.action.trigger_timeframes {
            validate_timeframe(timeframe)?;
        }

        for subscriber in &self.subscribers {
            if subscriber.contact_methods.is_empty() {
                return Err(format!(
                    "subscriber {} has no contact methods",
                    subscriber.user_id
                ));
            }
        }

        Ok(())
    }
}

fn validate_settings(settings: &ActionSettings) -> Result<(), String> {
    match settings {
        ActionSettings::Email(email) => {
            if !email.to.contains('@') {
                return Err(format!("invalid email recipient {:?}", email.to));
            }
        }
        ActionSettings::Slack(slack) => {
            if !slack.webhook_url.starts_with("http") {
                return Err(format!("invalid slack webhook url {:?}", slack.webhook_url));
            }
        }
        ActionSettings::Webex(webex) => {
            if webex.room_id.is_empty() || webex.token.is_empty() {
                return Err("webex action needs room_id and token".to_string());
            }
        }
        ActionSettings::Webhook(webhook) => {
            if !webhook.url.starts_with("http") {
                return Err(format!("invalid webhook url {:?}", webhook.url));
            }
        }
    }
    Ok(())
}

fn validate_window(window: &MaintenanceWindow) -> Result<(), String> {
    if window.day_of_week > 6 {
        return Err(format!(
            "maintenance window day_of_week {} out of range",
            window.day_of_week
        ));
    }
    if window.start_ms >= window.end_ms {
        return Err("maintenance window start must precede end".to_string());
    }
    if window.end_ms >= MS_PER_DAY {
        return Err("maintenance window end is past midnight".to_string());
    }
    Ok(())
}

fn validate_timeframe(timeframe: &TriggerTimeframe) -> Result<(), String> {
    if timeframe.timeframe_ms == 0 {
        return Err("trigger timeframe must be positive".to_string());
    }
    let t = &timeframe.thresholds;
    if !(t.up < t.warn && t.warn < t.down) {
        return Err(format!(
            "timeframe thresholds must be strictly increasing (up {} < warn {} < down {})",
            t.up, t.warn, t.down
        ));
    }
    Ok(())
}
