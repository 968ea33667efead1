//! Health status derivation over rolling trigger counts

use crate::model::{HealthStatus, StatusThresholds};

/// Map a trailing-window event count onto Up/Warn/Down.
/// Threshold bounds are inclusive.
pub fn derive_status(count: u64, thresholds: &StatusThresholds) -> HealthStatus {
    if count <= thresholds.up {
        HealthStatus::Up
    } else if count <= thresholds.warn {
        HealthStatus::Warn
    } else {
        HealthStatus::Down
    }
}
