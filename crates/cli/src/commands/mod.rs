pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use std::fmt::Display;
use std::future::Future;

use campusmart_core::config::{AppConfig, LoadOptions};
use campusmart_db::{connect_with_config, DbPool};
use serde_json::json;

/// What a subcommand hands back to `main`: the process exit code and stdout text.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// A classified command failure. The class ends up in the JSON payload, the code in `$?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub class: &'static str,
    pub exit_code: u8,
    pub message: String,
}

impl Failure {
    pub fn new(class: &'static str, exit_code: u8, message: impl Display) -> Self {
        Self { class, exit_code, message: message.to_string() }
    }

    pub fn config(error: impl Display) -> Self {
        Self::new("config_validation", 2, format_args!("configuration issue: {error}"))
    }

    pub fn connectivity(error: impl Display) -> Self {
        Self::new("db_connectivity", 4, error)
    }

    pub fn migration(error: impl Display) -> Self {
        Self::new("migration", 5, error)
    }
}

impl CommandResult {
    pub fn failure(command: &str, failure: Failure) -> Self {
        finish(command, Err(failure))
    }
}

/// Renders the one-line JSON outcome every non-report command prints.
pub fn finish(command: &str, outcome: Result<String, Failure>) -> CommandResult {
    let (exit_code, payload) = match outcome {
        Ok(message) => (
            0,
            json!({
                "command": command,
                "status": "ok",
                "error_class": null,
                "message": message,
            }),
        ),
        Err(Failure { class, exit_code, message }) => (
            exit_code,
            json!({
                "command": command,
                "status": "error",
                "error_class": class,
                "message": message,
            }),
        ),
    };
    CommandResult { exit_code, output: payload.to_string() }
}

fn load_config() -> Result<AppConfig, Failure> {
    AppConfig::load(LoadOptions::default()).map_err(Failure::config)
}

/// Loads config, opens a pool on a fresh current-thread runtime, runs `work`, then closes the pool.
fn with_database<T, F, Fut>(work: F) -> Result<T, Failure>
where
    F: FnOnce(DbPool) -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    let config = load_config()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| Failure::new("runtime_init", 3, error))?;

    runtime.block_on(async move {
        let pool = connect_with_config(&config.database).await.map_err(Failure::connectivity)?;
        let outcome = work(pool.clone()).await;
        pool.close().await;
        outcome
    })
}
