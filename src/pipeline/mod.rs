//! Pipeline assembly: wires the bus, the three stages, and their workers
//!
//! Ownership is one-directional: the pipeline owns the bus and the stage
//! objects, stages own their stores and seams, workers are plain spawned
//! tasks. Stopping the pipeline stops the scheduler loop and aborts the
//! workers; the stores outlive the pipeline.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::broker::PipelineBus;
use crate::config::Config;
use crate::datasource::AdapterRegistry;
use crate::executor::QueryExecutor;
use crate::notify::NotificationDispatch;
use crate::processor::ResultProcessor;
use crate::scheduler::Scheduler;
use crate::storage::{ActionResultStore, AlertStore, ConnectionStore, UserStore};
use crate::utils::error::{AlertflowError, Result};

const SCHEDULER_GROUP: &str = "scheduler";
const EXECUTOR_GROUP: &str = "query-executors";
const PROCESSOR_GROUP: &str = "result-processors";

/// The document stores the pipeline runs against
#[derive(Clone)]
pub struct Stores {
    pub alerts: Arc<dyn AlertStore>,
    pub history: Arc<dyn ActionResultStore>,
    pub users: Arc<dyn UserStore>,
    pub connections: Arc<dyn ConnectionStore>,
}

/// The assembled three-stage pipeline
pub struct Pipeline {
    bus: PipelineBus,
    scheduler: Arc<Scheduler>,
    executor: Arc<QueryExecutor>,
    processor: Arc<ResultProcessor>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        stores: Stores,
        registry: Arc<AdapterRegistry>,
        dispatcher: Arc<dyn NotificationDispatch>,
    ) -> Self {
        let bus = PipelineBus::new(&config.pipeline.broker);
        let scheduler = Arc::new(Scheduler::new(
            stores.alerts.clone(),
            stores.connections.clone(),
            bus.triggers.clone(),
            config.pipeline.scheduler.clone(),
        ));
        let executor = Arc::new(QueryExecutor::new(
            registry,
            stores.connections.clone(),
            bus.results.clone(),
        ));
        let processor = Arc::new(ResultProcessor::new(
            stores.alerts,
            stores.history,
            dispatcher,
        ));

        Self {
            bus,
            scheduler,
            executor,
            processor,
            tasks: Vec::new(),
        }
    }

    /// The bus, for publishing control commands and for tests
    pub fn bus(&self) -> &PipelineBus {
        &self.bus
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Restore persisted schedules and spawn every worker
    pub async fn start(&mut self) -> Result<()> {
        self.scheduler.restore().await?;

        let control = self
            .bus
            .schedules
            .subscribe(SCHEDULER_GROUP, &[0])
            .into_iter()
            .next()
            .ok_or_else(|| AlertflowError::Broker("schedules topic has no partition 0".to_string()))?;
        self.tasks
            .push(tokio::spawn(self.scheduler.clone().run_control_loop(control)));
        self.tasks.push(tokio::spawn(self.scheduler.clone().run()));

        for consumer in self.bus.triggers.subscribe_all(EXECUTOR_GROUP) {
            self.tasks.push(tokio::spawn(self.executor.clone().run(consumer)));
        }
        for consumer in self.bus.results.subscribe_all(PROCESSOR_GROUP) {
            self.tasks.push(tokio::spawn(self.processor.clone().run(consumer)));
        }

        info!(
            "Pipeline started: {} trigger partition(s), {} result partition(s), {} worker task(s)",
            self.bus.triggers.partition_count(),
            self.bus.results.partition_count(),
            self.tasks.len()
        );
        Ok(())
    }

    /// Stop the scheduler loop and tear down the workers
    pub async fn stop(&mut self) {
        self.scheduler.stop();
        // Detach the groups first so in-flight publishes park in the backlog
        // instead of landing in a channel whose worker is about to die
        self.bus.schedules.unsubscribe(SCHEDULER_GROUP);
        self.bus.triggers.unsubscribe(EXECUTOR_GROUP);
        self.bus.results.unsubscribe(PROCESSOR_GROUP);
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Pipeline stopped");
    }
}
