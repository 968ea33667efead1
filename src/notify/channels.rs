//! Outbound notification channels
//!
//! One implementation per channel family behind a common trait. Channels are
//! dumb pipes: they receive an already-rendered message and a target, and
//! report success or a typed failure. Recipient resolution, rendering, and
//! failure isolation all live in the dispatcher.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::model::{
    ActionSettings, ActionType, ContactMethods, EmailSettings, SlackSettings, WebexSettings,
    WebhookSettings,
};
use crate::utils::error::{AlertflowError, Result};

/// Fully rendered message ready to leave the process
#[derive(Debug, Clone)]
pub struct RenderedNotification {
    pub subject: String,
    pub body: String,
}

/// Where one delivery goes
#[derive(Debug, Clone)]
pub enum ChannelTarget {
    Email(EmailSettings),
    Slack(SlackSettings),
    Webex(WebexSettings),
    Webhook(WebhookSettings),
}

impl ChannelTarget {
    pub fn kind(&self) -> ActionType {
        match self {
            ChannelTarget::Email(_) => ActionType::Email,
            ChannelTarget::Slack(_) => ActionType::Slack,
            ChannelTarget::Webex(_) => ActionType::Webex,
            ChannelTarget::Webhook(_) => ActionType::Webhook,
        }
    }

    /// Target for an alert's own configured action
    pub fn from_action(settings: &ActionSettings) -> Self {
        match settings {
            ActionSettings::Email(s) => ChannelTarget::Email(s.clone()),
            ActionSettings::Slack(s) => ChannelTarget::Slack(s.clone()),
            ActionSettings::Webex(s) => ChannelTarget::Webex(s.clone()),
            ActionSettings::Webhook(s) => ChannelTarget::Webhook(s.clone()),
        }
    }

    /// Every target a user's contact methods configure
    pub fn from_contact_methods(methods: &ContactMethods) -> Vec<Self> {
        let mut targets = Vec::new();
        if let Some(email) = &methods.email {
            targets.push(ChannelTarget::Email(email.clone()));
        }
        if let Some(slack) = &methods.slack {
            targets.push(ChannelTarget::Slack(slack.clone()));
        }
        if let Some(webex) = &methods.webex {
            targets.push(ChannelTarget::Webex(webex.clone()));
        }
        if let Some(webhook) = &methods.webhook {
            targets.push(ChannelTarget::Webhook(webhook.clone()));
        }
        targets
    }
}

/// A delivery pipe for one channel family
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ActionType;

    async fn send(&self, target: &ChannelTarget, message: &RenderedNotification) -> Result<()>;
}

fn target_mismatch(expected: ActionType, got: &ChannelTarget) -> AlertflowError {
    AlertflowError::Channel(format!(
        "{} channel handed a {} target",
        expected,
        got.kind()
    ))
}

/// Slack incoming-webhook channel
pub struct SlackChannel {
    client: reqwest::Client,
}

impl SlackChannel {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn kind(&self) -> ActionType {
        ActionType::Slack
    }

    async fn send(&self, target: &ChannelTarget, message: &RenderedNotification) -> Result<()> {
        let ChannelTarget::Slack(settings) = target else {
            return Err(target_mismatch(ActionType::Slack, target));
        };

        let mut payload = serde_json::json!({ "text": message.body });
        if let Some(channel) = &settings.channel {
            payload["channel"] = serde_json::Value::String(channel.clone());
        }

        let response = self
            .client
            .post(&settings.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AlertflowError::Channel(format!("slack webhook failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AlertflowError::Channel(format!(
                "slack webhook returned status {}",
                response.status()
            )));
        }
        debug!("Slack notification delivered");
        Ok(())
    }
}

/// Webex room-message channel
pub struct WebexChannel {
    client: reqwest::Client,
    api_base: String,
}

impl WebexChannel {
    pub const DEFAULT_API_BASE: &'static str = "https://webexapis.com/v1";

    pub fn new(client: reqwest::Client) -> Self {
        Self::with_api_base(client, Self::DEFAULT_API_BASE)
    }

    pub fn with_api_base(client: reqwest::Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for WebexChannel {
    fn kind(&self) -> ActionType {
        ActionType::Webex
    }

    async fn send(&self, target: &ChannelTarget, message: &RenderedNotification) -> Result<()> {
        let ChannelTarget::Webex(settings) = target else {
            return Err(target_mismatch(ActionType::Webex, target));
        };

        let response = self
            .client
            .post(format!("{}/messages", self.api_base))
            .bearer_auth(&settings.token)
            .json(&serde_json::json!({
                "roomId": settings.room_id,
                "text": message.body,
            }))
            .send()
            .await
            .map_err(|e| AlertflowError::Channel(format!("webex request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AlertflowError::Channel(format!(
                "webex returned status {}",
                response.status()
            )));
        }
        debug!("Webex notification delivered to room {}", settings.room_id);
        Ok(())
    }
}

/// Generic webhook channel posting the rendered message as JSON
pub struct WebhookChannel {
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ActionType {
        ActionType::Webhook
    }

    async fn send(&self, target: &ChannelTarget, message: &RenderedNotification) -> Result<()> {
        let ChannelTarget::Webhook(settings) = target else {
            return Err(target_mismatch(ActionType::Webhook, target));
        };

        let response = self
            .client
            .post(&settings.url)
            .json(&serde_json::json!({
                "subject": message.subject,
                "message": message.body,
            }))
            .send()
            .await
            .map_err(|e| AlertflowError::Channel(format!("webhook failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AlertflowError::Channel(format!(
                "webhook returned status {}",
                response.status()
            )));
        }
        debug!("Webhook notification delivered");
        Ok(())
    }
}

/// Mail submission seam so the email channel is testable without an MTA
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Transport that only logs; stands in where no MTA is wired up
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send_mail(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        info!("Mail to {} ({}) handed to log transport", to, subject);
        Ok(())
    }
}

/// Email channel delegating submission to a transport
pub struct EmailChannel {
    transport: std::sync::Arc<dyn MailTransport>,
}

impl EmailChannel {
    pub fn new(transport: std::sync::Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ActionType {
        ActionType::Email
    }

    async fn send(&self, target: &ChannelTarget, message: &RenderedNotification) -> Result<()> {
        let ChannelTarget::Email(settings) = target else {
            return Err(target_mismatch(ActionType::Email, target));
        };
        let subject = if message.subject.is_empty() {
            settings.subject.clone()
        } else {
            message.subject.clone()
        };
        self.transport
            .send_mail(&settings.to, &subject, &message.body)
            .await
    }
}
