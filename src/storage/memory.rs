//! In-memory store implementations
//!
//! Backed by `dashmap`; each alert update holds that document's shard lock
//! for the duration of the mutation, which gives the per-document locking the
//! concurrency model requires. The `version` counter is bumped on every write
//! so lost updates are detectable by readers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::model::{
    ActionResultRecord, Alert, AlertStatus, DataSourceConnection, QueryExecStatus, RunningStatus,
    User,
};
use crate::utils::error::{AlertflowError, Result};

use super::{ActionResultStore, AlertStore, ConnectionStore, UserStore};

/// In-memory alert store
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: DashMap<Uuid, Alert>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: Uuid, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Alert),
    {
        let mut entry = self
            .alerts
            .get_mut(&id)
            .ok_or_else(|| AlertflowError::NotFound(format!("alert {}", id)))?;
        mutate(entry.value_mut());
        entry.version += 1;
        Ok(())
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn get(&self, id: Uuid) -> Result<Option<Alert>> {
        Ok(self.alerts.get(&id).map(|a| a.clone()))
    }

    async fn insert(&self, alert: Alert) -> Result<()> {
        self.alerts.insert(alert.id, alert);
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.alerts.remove(&id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Alert>> {
        Ok(self.alerts.iter().map(|a| a.clone()).collect())
    }

    async fn set_status(&self, id: Uuid, status: AlertStatus) -> Result<()> {
        self.update(id, |alert| alert.status = status)
    }

    async fn set_query_exec_status(&self, id: Uuid, status: QueryExecStatus) -> Result<()> {
        self.update(id, |alert| alert.query_exec_status = status)
    }

    async fn touch_check_times(
        &self,
        id: Uuid,
        last: Option<DateTime<Utc>>,
        next: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.update(id, |alert| {
            if last.is_some() {
                alert.last_check_time = last;
            }
            if next.is_some() {
                alert.next_check_time = next;
            }
        })
    }

    async fn set_running_statuses(&self, id: Uuid, statuses: Vec<RunningStatus>) -> Result<()> {
        self.update(id, |alert| alert.running_statuses = statuses)
    }
}

/// In-memory append-only result history
#[derive(Default)]
pub struct MemoryActionResultStore {
    records: DashMap<Uuid, Vec<ActionResultRecord>>,
    /// record id -> owning alert, for annotation appends
    index: DashMap<Uuid, Uuid>,
}

impl MemoryActionResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionResultStore for MemoryActionResultStore {
    async fn append(&self, record: ActionResultRecord) -> Result<()> {
        self.index.insert(record.id, record.alert_id);
        self.records
            .entry(record.alert_id)
            .or_default()
            .push(record);
        Ok(())
    }

    async fn count_since(&self, alert_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .records
            .get(&alert_id)
            .map(|records| records.iter().filter(|r| r.timestamp >= cutoff).count() as u64)
            .unwrap_or(0))
    }

    async fn for_alert(&self, alert_id: Uuid) -> Result<Vec<ActionResultRecord>> {
        Ok(self
            .records
            .get(&alert_id)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn append_action_taken(&self, record_id: Uuid, action: String) -> Result<()> {
        let alert_id = self
            .index
            .get(&record_id)
            .map(|a| *a)
            .ok_or_else(|| AlertflowError::NotFound(format!("action result {}", record_id)))?;

        let mut records = self
            .records
            .get_mut(&alert_id)
            .ok_or_else(|| AlertflowError::NotFound(format!("alert {} history", alert_id)))?;
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| AlertflowError::NotFound(format!("action result {}", record_id)))?;
        record.actions_taken.push(action);
        Ok(())
    }
}

/// In-memory user store
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn insert(&self, user: User) -> Result<()> {
        self.users.insert(user.id, user);
        Ok(())
    }
}

/// In-memory data source registry
#[derive(Default)]
pub struct MemoryConnectionStore {
    connections: DashMap<Uuid, DataSourceConnection>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn get(&self, id: Uuid) -> Result<Option<DataSourceConnection>> {
        Ok(self.connections.get(&id).map(|c| c.clone()))
    }

    async fn insert(&self, connection: DataSourceConnection) -> Result<()> {
        self.connections.insert(connection.id, connection);
        Ok(())
    }
}
