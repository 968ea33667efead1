//! Query executor: consumes trigger messages, runs queries through the
//! adapter registry, and emits result messages
//!
//! One worker per triggers partition keeps queries against the same backend
//! family serialized. Every trigger produces exactly one result message;
//! adapter failures, timeouts, and lookup misses all travel downstream as a
//! typed `Failed` outcome instead of dying here.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::broker::{PartitionConsumer, Topic};
use crate::datasource::AdapterRegistry;
use crate::model::{ActionType, QueryOutcome, ResultMessage, TriggerMessage};
use crate::storage::ConnectionStore;
use crate::utils::error::Result;

/// The query-execution stage of the pipeline
pub struct QueryExecutor {
    registry: Arc<AdapterRegistry>,
    connections: Arc<dyn ConnectionStore>,
    results: Arc<Topic<ResultMessage>>,
}

impl QueryExecutor {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        connections: Arc<dyn ConnectionStore>,
        results: Arc<Topic<ResultMessage>>,
    ) -> Self {
        Self {
            registry,
            connections,
            results,
        }
    }

    /// Worker loop for one triggers partition. A failed handoff is retried
    /// once in-order before the trigger is dropped; the scheduler's stuck-cycle
    /// reclaim covers the loss.
    pub async fn run(self: Arc<Self>, mut triggers: PartitionConsumer<TriggerMessage>) {
        info!("Query executor started on partition {}", triggers.partition());
        while let Some(message) = triggers.recv().await {
            if let Err(e) = self.handle(&message).await {
                warn!(
                    "Result handoff for alert {} failed, redelivering: {}",
                    message.alert_id, e
                );
                if let Err(e) = self.handle(&message).await {
                    error!(
                        "Dropping trigger for alert {} after redelivery: {}",
                        message.alert_id, e
                    );
                }
            }
        }
        debug!("Query executor on partition {} finished", triggers.partition());
    }

    async fn handle(&self, message: &TriggerMessage) -> Result<()> {
        let outcome = self.execute(message).await;
        let partition = message.action_type.partition() % self.results.partition_count();
        self.results
            .publish(
                partition,
                ResultMessage {
                    alert_id: message.alert_id,
                    action_type: message.action_type,
                    outcome,
                },
            )
            .await
    }

    /// Run one trigger's query. Infallible by construction: every failure
    /// mode becomes a `Failed` outcome for the result processor to record.
    async fn execute(&self, message: &TriggerMessage) -> QueryOutcome {
        // Control triggers carry no query work
        if message.action_type == ActionType::Skip {
            debug!("Skip trigger for alert {}, no query to run", message.alert_id);
            return QueryOutcome::Paused;
        }

        let connection = match self.connections.get(message.data_source_id).await {
            Ok(Some(connection)) => connection,
            Ok(None) => {
                return self.failed(
                    message,
                    format!("unknown data source {}", message.data_source_id),
                );
            }
            Err(e) => return self.failed(message, format!("data source lookup failed: {}", e)),
        };

        let adapter = match self.registry.resolve(connection.source_type) {
            Ok(adapter) => adapter,
            Err(e) => return self.failed(message, e.to_string()),
        };

        let budget = adapter.timeout();
        match timeout(budget, adapter.run_query(&connection.details, &message.query)).await {
            Ok(Ok(rows)) => {
                debug!(
                    "Query for alert {} returned {} row(s)",
                    message.alert_id,
                    rows.len()
                );
                QueryOutcome::Success { rows }
            }
            Ok(Err(e)) => self.failed(message, e.to_string()),
            Err(_) => self.failed(message, format!("query timed out after {:?}", budget)),
        }
    }

    fn failed(&self, message: &TriggerMessage, detail: String) -> QueryOutcome {
        warn!(
            "Query for alert {} failed: {}",
            message.alert_id,
            crate::utils::truncate_for_log(&detail, 200)
        );
        QueryOutcome::Failed { detail }
    }
}
