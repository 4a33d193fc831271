use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vstudio_db::PgStore;
use vstudio_events::{EventBus, EventLogger};
use vstudio_jobs::{JobManager, Poller};
use vstudio_queue::{QueueApi, QueueClient, QueueMetadataExtractor};
use vstudio_worker::config::{LogFormat, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    init_tracing(config.log_format);

    tracing::info!(queue = %config.queue_base_url, "Worker starting");

    // --- Database ---
    let pool = vstudio_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    vstudio_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    vstudio_db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database ready");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));

    // --- Job manager ---
    if config.fal_key.is_none() {
        tracing::warn!("FAL_KEY is not set, queue requests will be unauthenticated");
    }
    let queue: Arc<dyn QueueClient> = Arc::new(QueueApi::new(
        config.queue_base_url.clone(),
        config.fal_key.clone(),
    ));
    let metadata = Arc::new(QueueMetadataExtractor::with_endpoint(
        Arc::clone(&queue),
        config.jobs.metadata_endpoint.clone(),
    ));
    let manager = JobManager::new(Poller::new(
        Arc::new(PgStore::new(pool.clone())),
        queue,
        metadata,
        Arc::clone(&event_bus),
        config.jobs.clone(),
    ));

    let resumed = manager
        .resume()
        .await
        .context("Failed to load in-flight media")?;
    tracing::info!(resumed, "Worker running");

    shutdown_signal().await;

    // --- Shutdown ---
    manager.shutdown().await;

    // Dropping the last bus handle closes the channel and stops the logger.
    drop(manager);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vstudio_worker=debug,vstudio_jobs=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
