//! Document stores shared by the pipeline and the external management API
//!
//! The alert and action-result stores are the only shared mutable state in
//! the system. Every pipeline write is a field-scoped partial update through
//! a dedicated method, never a whole-document overwrite, so a scheduler fire
//! and a result-processor write landing at nearly the same time cannot
//! clobber each other or a concurrent management-API edit.

mod memory;

pub use memory::{MemoryActionResultStore, MemoryAlertStore, MemoryConnectionStore, MemoryUserStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{
    ActionResultRecord, Alert, AlertStatus, DataSourceConnection, QueryExecStatus, RunningStatus,
    User,
};
use crate::utils::error::Result;

/// Alert document store
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Alert>>;
    async fn insert(&self, alert: Alert) -> Result<()>;
    async fn remove(&self, id: Uuid) -> Result<()>;
    async fn list(&self) -> Result<Vec<Alert>>;

    /// Set the lifecycle status (pipeline only uses this for expiry)
    async fn set_status(&self, id: Uuid, status: AlertStatus) -> Result<()>;

    /// Set the per-cycle execution status
    async fn set_query_exec_status(&self, id: Uuid, status: QueryExecStatus) -> Result<()>;

    /// Update check-time bookkeeping; `None` leaves a field untouched
    async fn touch_check_times(
        &self,
        id: Uuid,
        last: Option<DateTime<Utc>>,
        next: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Overwrite the derived running statuses
    async fn set_running_statuses(&self, id: Uuid, statuses: Vec<RunningStatus>) -> Result<()>;
}

/// Append-only per-alert result history
#[async_trait]
pub trait ActionResultStore: Send + Sync {
    async fn append(&self, record: ActionResultRecord) -> Result<()>;

    /// Count records for the alert with `timestamp >= cutoff`
    async fn count_since(&self, alert_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn for_alert(&self, alert_id: Uuid) -> Result<Vec<ActionResultRecord>>;

    /// Append an action annotation to an existing record; the only mutation
    /// records support after creation
    async fn append_action_taken(&self, record_id: Uuid, action: String) -> Result<()>;
}

/// Notifiable users
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
    async fn insert(&self, user: User) -> Result<()>;
}

/// Registered data sources (connection details stay opaque to the pipeline)
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<DataSourceConnection>>;
    async fn insert(&self, connection: DataSourceConnection) -> Result<()>;
}

#[cfg(test)]
mod tests;
