//! Test doubles plugged into the pipeline's seams

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use alertflow::datasource::DataSourceAdapter;
use alertflow::model::{ActionType, DataSourceType};
use alertflow::notify::{ChannelTarget, NotificationChannel, RenderedNotification};
use alertflow::{AlertflowError, Result};

/// Adapter returning a scripted row count, or failing after a scripted number
/// of successes
pub struct ScriptedAdapter {
    rows_per_query: usize,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn returning(rows_per_query: usize) -> Arc<Self> {
        Arc::new(Self {
            rows_per_query,
            fail_after: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            rows_per_query: 0,
            fail_after: Some(0),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSourceAdapter for ScriptedAdapter {
    async fn run_query(
        &self,
        _details: &serde_json::Value,
        _query: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(AlertflowError::DataSource("connection refused".to_string()));
        }
        Ok(super::fixtures::rows(self.rows_per_query))
    }

    fn source_type(&self) -> DataSourceType {
        DataSourceType::Search
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

/// Channel that records every delivery instead of leaving the process
pub struct RecordingChannel {
    kind: ActionType,
    deliveries: Mutex<Vec<(ChannelTarget, RenderedNotification)>>,
}

impl RecordingChannel {
    pub fn new(kind: ActionType) -> Arc<Self> {
        Arc::new(Self {
            kind,
            deliveries: Mutex::new(Vec::new()),
        })
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().len()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .iter()
            .map(|(_, message)| message.body.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ActionType {
        self.kind
    }

    async fn send(&self, target: &ChannelTarget, message: &RenderedNotification) -> Result<()> {
        self.deliveries
            .lock()
            .push((target.clone(), message.clone()));
        Ok(())
    }
}
