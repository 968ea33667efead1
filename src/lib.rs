//! # Alertflow
//!
//! A distributed alert-monitoring pipeline: alerts run queries against
//! registered data sources on their own schedules, evaluate the results
//! against trigger conditions, maintain rolling Up/Warn/Down health statuses,
//! and fan notifications out over email, Slack, Webex, and webhooks.
//!
//! The pipeline has three stages connected by partitioned in-process topics:
//!
//! - **Scheduler**: per-alert timers with throttling and maintenance windows,
//!   emitting trigger messages partitioned by data-source family
//! - **Query executor**: runs queries through pluggable adapters, emitting
//!   result messages partitioned by action family
//! - **Result processor**: evaluates conditions, updates health statuses, and
//!   drives the notification dispatcher
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use alertflow::config::Config;
//! use alertflow::datasource::{AdapterRegistry, HttpSearchAdapter};
//! use alertflow::notify::{Dispatcher, TemplateRegistry};
//! use alertflow::pipeline::{Pipeline, Stores};
//! use alertflow::storage::{
//!     MemoryActionResultStore, MemoryAlertStore, MemoryConnectionStore, MemoryUserStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let stores = Stores {
//!         alerts: Arc::new(MemoryAlertStore::new()),
//!         history: Arc::new(MemoryActionResultStore::new()),
//!         users: Arc::new(MemoryUserStore::new()),
//!         connections: Arc::new(MemoryConnectionStore::new()),
//!     };
//!
//!     let mut registry = AdapterRegistry::new();
//!     registry.register(Arc::new(HttpSearchAdapter::new(
//!         std::time::Duration::from_secs(config.pipeline.executor.query_timeout_secs),
//!     )));
//!
//!     let dispatcher = Arc::new(Dispatcher::new(
//!         Vec::new(),
//!         stores.users.clone(),
//!         TemplateRegistry::new(),
//!         config.pipeline.notify.clone(),
//!     ));
//!
//!     let mut pipeline = Pipeline::new(&config, stores, Arc::new(registry), dispatcher);
//!     pipeline.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     pipeline.stop().await;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod broker;
pub mod config;
pub mod datasource;
pub mod executor;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod processor;
pub mod scheduler;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use pipeline::{Pipeline, Stores};
pub use utils::error::{AlertflowError, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
