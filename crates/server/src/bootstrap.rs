use campusmart_core::config::AppConfig;
use campusmart_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("could not read migration history: {0}")]
    History(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

/// Connects the pool and applies pending migrations for an already loaded config.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    let outstanding = migrations::pending(&db_pool).await.map_err(BootstrapError::History)?;
    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        applied = outstanding.len(),
        "marketplace schema is current"
    );

    Ok(Application { config, db_pool })
}

#[cfg(test)]
mod tests {
    use campusmart_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use campusmart_db::migrations;

    use super::{bootstrap_with_config, BootstrapError};

    fn pointed_at(database_url: &str) -> AppConfig {
        let overrides =
            ConfigOverrides { database_url: Some(database_url.into()), ..Default::default() };
        AppConfig::load(LoadOptions { overrides, ..Default::default() }).expect("config loads")
    }

    #[tokio::test]
    async fn missing_directory_fails_at_connect() {
        let outcome =
            bootstrap_with_config(pointed_at("sqlite:///campusmart-missing-dir/never.db")).await;

        assert!(matches!(outcome, Err(BootstrapError::DatabaseConnect(_))));
    }

    #[tokio::test]
    async fn bootstrap_leaves_no_migration_outstanding() {
        let app = bootstrap_with_config(pointed_at("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name IN ('users', 'items', 'requests') ORDER BY name",
        )
        .fetch_all(&app.db_pool)
        .await
        .expect("list tables");

        assert_eq!(tables, ["items", "requests", "users"]);
        assert!(migrations::pending(&app.db_pool).await.expect("pending").is_empty());
        app.db_pool.close().await;
    }
}
