mod bootstrap;
mod error;
mod health;
mod routes;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use campusmart_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use campusmart_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging has to be up before bootstrap emits its events.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = app.config.server.socket_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "campusmart-server listening"
    );

    let drain = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let server = axum::serve(listener, routes::app(app.db_pool.clone()))
        .with_graceful_shutdown(wait_for_shutdown())
        .into_future();

    // Ctrl-C starts the drain; connections still open after the grace period are dropped.
    tokio::select! {
        result = server => result?,
        () = drain_deadline(drain) => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                grace_secs = drain.as_secs(),
                "graceful shutdown window elapsed; closing remaining connections"
            );
        }
    }

    app.db_pool.close().await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "campusmart-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "shutdown signal received; draining connections"
    );
}

/// Resolves `grace` after the first Ctrl-C, never before it.
async fn drain_deadline(grace: Duration) {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}
