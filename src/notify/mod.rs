//! Notification stack: templates, channels, and the dispatcher
//!
//! Rendering, recipient resolution, and delivery are separate layers. The
//! result processor only sees the [`NotificationDispatch`] trait; everything
//! below it (channel HTTP, template lookup, availability filtering) is an
//! implementation detail of this module.

mod channels;
mod dispatcher;
mod template;

pub use channels::{
    ChannelTarget, EmailChannel, LogMailTransport, MailTransport, NotificationChannel,
    RenderedNotification, SlackChannel, WebexChannel, WebhookChannel,
};
pub use dispatcher::{DeliveryRecord, Dispatcher, NotificationDispatch, NotificationRequest};
pub use template::{NotificationClass, TemplateRegistry, TemplateVars, render};

#[cfg(test)]
pub use dispatcher::MockNotificationDispatch;
