//! Store behavior tests: field-scoped updates, version bumps, and the
//! append-only history contract

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::*;
use crate::model::test_fixtures::{periodic_alert, result_rows};
use crate::model::{ActionResultRecord, HealthStatus};

#[tokio::test]
async fn test_field_scoped_update_preserves_other_fields() {
    let store = MemoryAlertStore::new();
    let alert = periodic_alert(60_000);
    let id = alert.id;
    let name = alert.name.clone();
    store.insert(alert).await.unwrap();

    store
        .set_query_exec_status(id, QueryExecStatus::Running)
        .await
        .unwrap();

    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.query_exec_status, QueryExecStatus::Running);
    assert_eq!(stored.name, name);
    assert_eq!(stored.status, AlertStatus::Running);
}

#[tokio::test]
async fn test_every_write_bumps_version() {
    let store = MemoryAlertStore::new();
    let alert = periodic_alert(60_000);
    let id = alert.id;
    store.insert(alert).await.unwrap();

    store
        .set_query_exec_status(id, QueryExecStatus::Running)
        .await
        .unwrap();
    store
        .touch_check_times(id, Some(Utc::now()), None)
        .await
        .unwrap();
    store
        .set_running_statuses(
            id,
            vec![RunningStatus {
                timeframe_ms: 3_600_000,
                status: HealthStatus::Warn,
            }],
        )
        .await
        .unwrap();

    assert_eq!(store.get(id).await.unwrap().unwrap().version, 3);
}

#[tokio::test]
async fn test_touch_check_times_none_leaves_field() {
    let store = MemoryAlertStore::new();
    let alert = periodic_alert(60_000);
    let id = alert.id;
    store.insert(alert).await.unwrap();

    let last = Utc::now();
    store.touch_check_times(id, Some(last), None).await.unwrap();
    store
        .touch_check_times(id, None, Some(last + Duration::minutes(1)))
        .await
        .unwrap();

    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.last_check_time, Some(last));
    assert_eq!(stored.next_check_time, Some(last + Duration::minutes(1)));
}

#[tokio::test]
async fn test_update_missing_alert_is_not_found() {
    let store = MemoryAlertStore::new();
    let err = store
        .set_query_exec_status(Uuid::new_v4(), QueryExecStatus::Failed)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::utils::error::AlertflowError::NotFound(_)));
}

#[tokio::test]
async fn test_count_since_respects_cutoff() {
    let store = MemoryActionResultStore::new();
    let alert_id = Uuid::new_v4();
    let now = Utc::now();

    for minutes_ago in [1, 5, 30, 90] {
        store
            .append(ActionResultRecord::success(
                alert_id,
                result_rows(1),
                now - Duration::minutes(minutes_ago),
            ))
            .await
            .unwrap();
    }

    let count = store
        .count_since(alert_id, now - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(count, 3);

    let count_all = store
        .count_since(alert_id, now - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(count_all, 4);
}

#[tokio::test]
async fn test_count_since_unknown_alert_is_zero() {
    let store = MemoryActionResultStore::new();
    let count = store
        .count_since(Uuid::new_v4(), Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_append_action_taken_annotates_record() {
    let store = MemoryActionResultStore::new();
    let alert_id = Uuid::new_v4();
    let record = ActionResultRecord::success(alert_id, result_rows(2), Utc::now());
    let record_id = record.id;
    store.append(record).await.unwrap();

    store
        .append_action_taken(record_id, "webhook dispatched".to_string())
        .await
        .unwrap();

    let history = store.for_alert(alert_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].actions_taken, vec!["webhook dispatched"]);
    // Result payload is untouched
    assert_eq!(history[0].row_count, 2);
}

#[tokio::test]
async fn test_concurrent_field_updates_are_not_lost() {
    use std::sync::Arc;

    let store = Arc::new(MemoryAlertStore::new());
    let alert = periodic_alert(60_000);
    let id = alert.id;
    store.insert(alert).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .set_query_exec_status(id, QueryExecStatus::Running)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Every one of the 16 writes landed
    assert_eq!(store.get(id).await.unwrap().unwrap().version, 16);
}
