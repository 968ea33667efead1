//! Data source adapters: one uniform query-execution interface over
//! relational, columnar, and search backends
//!
//! Adapter selection is a pure function of the connection's declared type;
//! unsupported types fail fast before any query work happens. Adapters own
//! their timeouts, and every adapter failure is converted to a typed error by
//! the executor rather than propagating.

mod http_search;

pub use http_search::HttpSearchAdapter;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::DataSourceType;
use crate::utils::error::{AlertflowError, Result};

/// Uniform query-execution contract each backend family implements
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSourceAdapter: Send + Sync {
    /// Run a query against the backend described by `details`, returning
    /// result rows. Connection details are opaque per-type structs.
    async fn run_query(
        &self,
        details: &serde_json::Value,
        query: &str,
    ) -> Result<Vec<serde_json::Value>>;

    /// Backend family this adapter serves
    fn source_type(&self) -> DataSourceType;

    /// Per-query timeout; the executor enforces it around `run_query`
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// Registry mapping backend families to their adapters
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<DataSourceType, Arc<dyn DataSourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for its declared backend family, replacing any
    /// previous registration
    pub fn register(&mut self, adapter: Arc<dyn DataSourceAdapter>) {
        self.adapters.insert(adapter.source_type(), adapter);
    }

    /// Resolve the adapter for a backend family; unsupported types fail fast
    pub fn resolve(&self, source_type: DataSourceType) -> Result<Arc<dyn DataSourceAdapter>> {
        self.adapters.get(&source_type).cloned().ok_or_else(|| {
            AlertflowError::DataSource(format!("unsupported data source type {:?}", source_type))
        })
    }
}
