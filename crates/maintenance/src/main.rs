use std::sync::Arc;

use anyhow::Result;
use domain::SystemClock;
use lms_maintenance::services::BunnyStreamClient;
use lms_maintenance::{app, config, logging, metrics};
use persistence::PgStoreProvider;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging
    logging::init_logging(&config.logging);

    info!("Starting LMS maintenance worker v{}", env!("CARGO_PKG_VERSION"));

    if config.metrics.enabled {
        let addr = config.metrics_addr()?;
        metrics::init_metrics(addr)?;
        info!("Metrics listening on {}", addr);
    }

    // Create database pool
    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    if config.database.run_migrations {
        info!("Running database migrations...");
        persistence::db::run_migrations(&pool).await?;
        info!("Migrations completed");
    }

    let stores = Arc::new(PgStoreProvider::new(pool.clone()));
    let host = Arc::new(BunnyStreamClient::new(&config.bunny)?);

    let mut scheduler = app::create_scheduler(&config, stores, host, Arc::new(SystemClock));
    scheduler.start();

    shutdown_signal().await;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(config.shutdown_timeout()).await;

    pool.close().await;
    info!("Maintenance worker stopped");

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
