//! Outbox relay host: CRUD over HTTP plus the background publisher.
//!
//! Reads its config from the file named by `OUTBOX_RELAY_CONFIG` (defaults
//! otherwise) and logs through `RUST_LOG`.

use std::error::Error;
use std::sync::Arc;

use outbox_relay::config::OutboxConfig;
use outbox_relay::{
    http, logging, EmployeeService, InMemoryStore, LogBus, PublisherThread, SqliteStore, Store,
};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match OutboxConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load config");
            std::process::exit(2);
        }
    };

    let result = match &config.storage.database_path {
        Some(path) => match SqliteStore::open(path) {
            Ok(store) => run(store, &config).await,
            Err(err) => Err(err.into()),
        },
        None => {
            info!("no database_path configured, using in-memory store");
            run(InMemoryStore::new(), &config).await
        }
    };

    if let Err(err) = result {
        error!(error = %err, "outbox relay failed");
        std::process::exit(1);
    }
}

async fn run<S>(store: S, config: &OutboxConfig) -> Result<(), Box<dyn Error>>
where
    S: Store + Clone + 'static,
{
    let publisher = config.publisher.publisher(store.clone(), LogBus::new());
    let worker = PublisherThread::spawn(publisher, config.publisher.interval());

    let service = Arc::new(EmployeeService::new(store));
    let listener = TcpListener::bind(&config.http.bind).await?;
    let served = http::serve_until(service, listener, shutdown_signal()).await;

    let stats = worker.stop();
    info!(
        cycles = stats.cycles,
        published = stats.messages_published,
        failed = stats.messages_failed,
        skipped = stats.messages_skipped,
        cycle_errors = stats.cycle_errors,
        "publisher stopped"
    );

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
