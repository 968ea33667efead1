//! User model: identity, timezone, and weekly availability
//!
//! Notifications are only delivered to users inside one of their availability
//! windows, evaluated in the user's own timezone.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// One weekly availability window, whole hours in the user's timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    /// Day of week, 0 = Sunday
    pub day_of_week: u8,
    /// Start hour, inclusive (0-23)
    pub start_hour: u8,
    /// End hour, exclusive (1-24)
    pub end_hour: u8,
}

/// A notifiable user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// IANA timezone name, e.g. "America/New_York"
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl User {
    /// Whether the user is inside one of their availability windows at `now`.
    ///
    /// An empty availability list means always available. An unparseable
    /// timezone falls back to UTC rather than silencing the user.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        if self.availability.is_empty() {
            return true;
        }

        let tz: Tz = match self.timezone.parse() {
            Ok(tz) => tz,
            Err(_) => {
                warn!("User {} has invalid timezone {:?}, assuming UTC", self.id, self.timezone);
                chrono_tz::UTC
            }
        };

        let local = now.with_timezone(&tz);
        let day = local.weekday().num_days_from_sunday() as u8;
        let hour = local.hour() as u8;

        self.availability
            .iter()
            .any(|w| w.day_of_week == day && hour >= w.start_hour && hour < w.end_hour)
    }
}
