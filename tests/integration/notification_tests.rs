//! Notification fan-out through the assembled pipeline

use std::time::Duration;

use alertflow::model::HealthStatus;

use crate::common::doubles::ScriptedAdapter;
use crate::common::fixtures::{AlertFactory, UserFactory, email_subscriber, slack_subscriber};
use crate::common::harness::PipelineHarness;

async fn wait_for_delivery(channel: &crate::common::doubles::RecordingChannel) -> usize {
    for _ in 0..200 {
        let count = channel.delivery_count();
        if count > 0 {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    0
}

#[tokio::test]
async fn test_status_notification_reaches_matching_subscriber() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(1)).await;
    let watcher = UserFactory::always_available();
    h.insert_user(&watcher).await;

    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    // Low cycle counts keep the hourly status at Up, which this
    // subscription watches
    alert.subscribers = vec![slack_subscriber(&watcher, HealthStatus::Up)];

    h.activate(&alert).await;
    h.wait_for_records(&alert, 1, Duration::from_secs(3)).await;

    assert!(wait_for_delivery(&h.slack).await >= 1);
    assert!(
        h.slack
            .bodies()
            .iter()
            .any(|body| body.contains("checked, no action needed"))
    );

    h.stop().await;
}

#[tokio::test]
async fn test_non_matching_subscription_stays_quiet() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(1)).await;
    let watcher = UserFactory::always_available();
    h.insert_user(&watcher).await;

    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    // Watching Down while the alert sits at Up
    alert.subscribers = vec![slack_subscriber(&watcher, HealthStatus::Down)];

    h.activate(&alert).await;
    h.wait_for_records(&alert, 2, Duration::from_secs(3)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.slack.delivery_count(), 0);

    h.stop().await;
}

#[tokio::test]
async fn test_error_notification_carries_detail_to_email() {
    let h = PipelineHarness::start(ScriptedAdapter::failing()).await;
    let watcher = UserFactory::always_available();
    h.insert_user(&watcher).await;

    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    // Error notifications ignore the subscription's status scope
    alert.subscribers = vec![email_subscriber(&watcher, HealthStatus::Down)];

    h.activate(&alert).await;
    h.wait_for_records(&alert, 1, Duration::from_secs(3)).await;

    assert!(wait_for_delivery(&h.email).await >= 1);
    assert!(
        h.email
            .bodies()
            .iter()
            .any(|body| body.contains("connection refused"))
    );

    h.stop().await;
}

#[tokio::test]
async fn test_trigger_notification_renders_result_count() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(4)).await;
    let alert = AlertFactory::periodic_for(&h.connection, 50);

    h.activate(&alert).await;
    h.wait_for_records(&alert, 1, Duration::from_secs(3)).await;

    assert!(wait_for_delivery(&h.webhook).await >= 1);
    assert!(h.webhook.bodies().iter().any(|body| body.contains("4")));

    h.stop().await;
}

#[tokio::test]
async fn test_subscriber_on_multiple_channels_gets_both() {
    let h = PipelineHarness::start(ScriptedAdapter::returning(1)).await;
    let watcher = UserFactory::always_available();
    h.insert_user(&watcher).await;

    let mut subscriber = slack_subscriber(&watcher, HealthStatus::Up);
    subscriber.contact_methods.email = email_subscriber(&watcher, HealthStatus::Up)
        .contact_methods
        .email;

    let mut alert = AlertFactory::periodic_for(&h.connection, 50);
    alert.subscribers = vec![subscriber];

    h.activate(&alert).await;
    h.wait_for_records(&alert, 1, Duration::from_secs(3)).await;

    assert!(wait_for_delivery(&h.slack).await >= 1);
    assert!(wait_for_delivery(&h.email).await >= 1);

    h.stop().await;
}
