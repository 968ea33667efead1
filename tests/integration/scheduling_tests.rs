//! Scheduling behavior through the assembled pipeline

use std::time::Duration;

use chrono::{Datelike, Utc};

use alertflow::model::{AlertStatus, MaintenanceWindow, Throttle};

use crate::common::doubles::ScriptedAdapter;
use crate::common::fixtures::AlertFactory;
use crate::common::harness::PipelineHarness;

#[tokio::test]
async fn test_periodic_alert_cycles_repeatedly() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(0)).await;
    let alert = AlertFactory::periodic_for(&h.connection, 50);

    h.activate(&alert).await;
    let count = h.wait_for_records(&alert, 3, Duration::from_secs(3)).await;
    assert!(count >= 3, "expected at least 3 cycles, got {}", count);

    // One query per cycle, never more
    assert!(h.adapter.call_count() >= count);

    h.stop().await;
}

#[tokio::test]
async fn test_throttle_limits_cycle_rate() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(0)).await;
    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    alert.condition.throttle = Throttle {
        enabled: true,
        suppress_ms: 10_000,
    };

    h.activate(&alert).await;
    h.wait_for_records(&alert, 1, Duration::from_secs(3)).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    // The first fire ran; every subsequent 50ms fire fell inside the
    // suppression interval
    assert_eq!(h.record_count(&alert).await, 1);

    h.stop().await;
}

#[tokio::test]
async fn test_maintenance_window_suppresses_cycles() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(0)).await;
    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    // Cover today and tomorrow entirely so a midnight rollover mid-test
    // cannot leak a fire through
    let today = Utc::now().weekday().num_days_from_sunday() as u8;
    alert.action.time_constraints = vec![
        MaintenanceWindow {
            day_of_week: today,
            start_ms: 0,
            end_ms: 86_399_999,
        },
        MaintenanceWindow {
            day_of_week: (today + 1) % 7,
            start_ms: 0,
            end_ms: 86_399_999,
        },
    ];

    h.activate(&alert).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(h.record_count(&alert).await, 0);
    assert_eq!(h.adapter.call_count(), 0);
    // Timers keep ticking so the alert resumes when the window passes
    assert!(h.stored(&alert).await.next_check_time.is_some());

    h.stop().await;
}

#[tokio::test]
async fn test_paused_alert_never_fires() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(0)).await;
    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    alert.status = AlertStatus::Paused;

    h.activate(&alert).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(h.record_count(&alert).await, 0);
    assert_eq!(h.adapter.call_count(), 0);

    h.stop().await;
}

#[tokio::test]
async fn test_invalid_alert_is_refused_at_scheduling() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(0)).await;
    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    alert.condition.threshold = 0;

    h.activate(&alert).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Refused by validation: no timer, no cycles
    assert_eq!(h.record_count(&alert).await, 0);
    assert!(h.stored(&alert).await.next_check_time.is_none());

    h.stop().await;
}
