//! Alertflow daemon: assembles the stores, adapters, channels, and pipeline,
//! then runs until interrupted

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use alertflow::config::Config;
use alertflow::datasource::{AdapterRegistry, HttpSearchAdapter};
use alertflow::notify::{
    Dispatcher, EmailChannel, LogMailTransport, NotificationChannel, SlackChannel,
    TemplateRegistry, WebexChannel, WebhookChannel,
};
use alertflow::pipeline::{Pipeline, Stores};
use alertflow::storage::{
    MemoryActionResultStore, MemoryAlertStore, MemoryConnectionStore, MemoryUserStore,
};

#[derive(Parser, Debug)]
#[command(name = "alertflowd", version, about = "Alert monitoring pipeline daemon")]
struct Args {
    /// Path to a YAML configuration file; defaults and environment
    /// variables apply when omitted
    #[arg(short, long, env = "ALERTFLOW_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> alertflow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::from_env()?,
    };

    let stores = Stores {
        alerts: Arc::new(MemoryAlertStore::new()),
        history: Arc::new(MemoryActionResultStore::new()),
        users: Arc::new(MemoryUserStore::new()),
        connections: Arc::new(MemoryConnectionStore::new()),
    };

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(HttpSearchAdapter::new(Duration::from_secs(
        config.pipeline.executor.query_timeout_secs,
    ))));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.pipeline.notify.request_timeout_secs))
        .build()?;
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![
        Arc::new(EmailChannel::new(Arc::new(LogMailTransport))),
        Arc::new(SlackChannel::new(client.clone())),
        Arc::new(WebexChannel::new(client.clone())),
        Arc::new(WebhookChannel::new(client)),
    ];
    let dispatcher = Arc::new(Dispatcher::new(
        channels,
        stores.users.clone(),
        TemplateRegistry::new(),
        config.pipeline.notify.clone(),
    ));

    let mut pipeline = Pipeline::new(&config, stores, Arc::new(registry), dispatcher);
    pipeline.start().await?;
    info!("alertflowd {} running, press Ctrl-C to stop", alertflow::VERSION);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    pipeline.stop().await;
    Ok(())
}
