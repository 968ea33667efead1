//! End-to-end pipeline behavior: trigger, execute, process

use std::time::Duration;

use alertflow::model::{AlertStatus, HealthStatus, QueryExecStatus, ResultStatus};
use alertflow::storage::ActionResultStore;

use crate::common::doubles::ScriptedAdapter;
use crate::common::fixtures::{AlertFactory, UserFactory, slack_subscriber};
use crate::common::harness::PipelineHarness;

#[tokio::test]
async fn test_healthy_cycle_records_history_without_trigger() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(1)).await;
    let alert = AlertFactory::periodic_for(&h.connection, 50);

    h.activate(&alert).await;
    let count = h.wait_for_records(&alert, 2, Duration::from_secs(3)).await;
    assert!(count >= 2, "expected repeated cycles, got {}", count);

    // Below threshold 3: the action never fired
    assert_eq!(h.webhook.delivery_count(), 0);

    let stored = h.stored(&alert).await;
    assert_eq!(stored.running_statuses.len(), 1);
    assert_eq!(stored.running_statuses[0].status, HealthStatus::Up);
    assert!(stored.last_check_time.is_some());

    h.stop().await;
}

#[tokio::test]
async fn test_threshold_met_fires_action() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(3)).await;
    let alert = AlertFactory::periodic_for(&h.connection, 50);

    h.activate(&alert).await;
    h.wait_for_records(&alert, 1, Duration::from_secs(3)).await;

    // Give the dispatch a moment to land
    for _ in 0..100 {
        if h.webhook.delivery_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(h.webhook.delivery_count() >= 1);
    assert!(h.webhook.bodies()[0].contains("condition met"));

    let records = h.stores.history.for_alert(alert.id).await.unwrap();
    assert!(records.iter().any(|r| !r.actions_taken.is_empty()));

    h.stop().await;
}

#[tokio::test]
async fn test_query_failure_records_and_notifies() {
    let h = PipelineHarness::start(ScriptedAdapter::failing()).await;
    let user = UserFactory::always_available();
    h.insert_user(&user).await;

    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    alert.subscribers = vec![slack_subscriber(&user, HealthStatus::Up)];

    h.activate(&alert).await;
    h.wait_for_records(&alert, 1, Duration::from_secs(3)).await;

    let records = h.stores.history.for_alert(alert.id).await.unwrap();
    assert!(records.iter().any(|r| r.result_status == ResultStatus::Failure));

    for _ in 0..100 {
        if h.slack.delivery_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(h.slack.delivery_count() >= 1);
    assert!(h.slack.bodies()[0].contains("connection refused"));

    h.stop().await;
}

#[tokio::test]
async fn test_unschedule_stops_firing() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(0)).await;
    let alert = AlertFactory::periodic_for(&h.connection, 50);

    h.activate(&alert).await;
    h.wait_for_records(&alert, 1, Duration::from_secs(3)).await;

    h.deactivate(&alert).await;
    // Let any in-flight cycle drain, then confirm the count settles
    tokio::time::sleep(Duration::from_millis(200)).await;
    let settled = h.record_count(&alert).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.record_count(&alert).await, settled);

    h.stop().await;
}

#[tokio::test]
async fn test_expired_alert_is_retired() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(0)).await;
    let alert = AlertFactory::expired(&h.connection);

    h.activate(&alert).await;

    let mut status = AlertStatus::Running;
    for _ in 0..200 {
        status = h.stored(&alert).await.status;
        if status == AlertStatus::Expired {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, AlertStatus::Expired);

    // No further cycles once expired
    tokio::time::sleep(Duration::from_millis(200)).await;
    let settled = h.record_count(&alert).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.record_count(&alert).await, settled);

    h.stop().await;
}

#[tokio::test]
async fn test_cycle_closes_between_fires() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(1)).await;
    let alert = AlertFactory::periodic_for(&h.connection, 50);

    h.activate(&alert).await;
    h.wait_for_records(&alert, 3, Duration::from_secs(3)).await;

    // After several cycles the execution status keeps returning to a closed
    // state rather than sticking at Running or Failed
    let mut saw_closed = false;
    for _ in 0..100 {
        if h.stored(&alert).await.query_exec_status == QueryExecStatus::Pending {
            saw_closed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(saw_closed);

    h.stop().await;
}
